//! # 任务管理器
//!
//! 把文件描述转换成带优先级的作业，提交到有界工作池，按完成顺序收集结果。
//!
//! ## 功能
//! - 基于 rayon 线程池的并行执行，结果经 crossbeam 通道回传
//! - 回调中的错误与 panic 都转换为失败结果，不会影响工作池
//! - 每个结果在编排线程上更新进度跟踪器与失败处理器
//! - 失败处理器要求停止时：设置取消标志、停止等待，不排空工作池
//!
//! ## 依赖关系
//! - 被 `batch/processor.rs` 调用
//! - 使用 `batch/progress.rs`、`batch/failure.rs`
//! - 使用 `rayon`、`crossbeam-channel`、`num_cpus`

use super::failure::ErrorHandler;
use super::job::{parallelization_efficiency, size_priority, Job, JobResult, PriorityFn};
use super::progress::{average_duration, ProgressTracker};
use super::scanner::FileDescriptor;
use crate::error::{DocbatchError, Result};
use crate::processors::{ErrorKind, JobError, Params, Processor};

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 默认工作线程数: 逻辑核数 − 2，至少为 1
pub fn default_workers() -> usize {
    num_cpus::get().saturating_sub(2).max(1)
}

/// 一次运行的输出
#[derive(Debug, Default)]
pub struct RunOutput {
    /// 按完成顺序排列
    pub results: Vec<JobResult>,
    /// 被失败处理器提前停止
    pub stopped: bool,
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub total_processing_time: Duration,
    pub total_size_mb: f64,
    pub avg_time_per_file: Duration,
    pub mb_per_second: f64,
    pub parallelization_efficiency: f64,
}

impl ProcessingStats {
    pub fn from_results(results: &[JobResult], workers: usize) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let total = results.len();
        let completed = results.iter().filter(|r| r.is_success()).count();
        let total_processing_time: Duration = results.iter().map(|r| r.processing_time).sum();
        let total_size_mb: f64 = results.iter().map(JobResult::size_mb).sum();
        let secs = total_processing_time.as_secs_f64();

        Self {
            total,
            completed,
            failed: total - completed,
            success_rate: completed as f64 / total as f64 * 100.0,
            total_processing_time,
            total_size_mb,
            avg_time_per_file: average_duration(total_processing_time, total),
            mb_per_second: if secs > 0.0 {
                total_size_mb / secs
            } else {
                0.0
            },
            parallelization_efficiency: parallelization_efficiency(results, workers),
        }
    }
}

/// 任务管理器
pub struct TaskManager {
    /// 并行作业数
    workers: usize,
    /// 优先级函数
    priority_fn: PriorityFn,
    /// 待提交的作业
    jobs: Vec<Job>,
    next_id: u64,
    last_stats: Option<ProcessingStats>,
}

impl TaskManager {
    /// 创建任务管理器（`workers == 0` 表示使用默认值）
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            default_workers()
        } else {
            workers
        };
        Self {
            workers,
            priority_fn: Arc::new(size_priority),
            jobs: Vec::new(),
            next_id: 0,
            last_stats: None,
        }
    }

    /// 替换优先级函数
    pub fn with_priority_fn<F>(mut self, priority_fn: F) -> Self
    where
        F: Fn(&FileDescriptor) -> i64 + Send + Sync + 'static,
    {
        self.priority_fn = Arc::new(priority_fn);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    /// 入队一个作业，优先级由优先级函数推导
    pub fn enqueue(&mut self, descriptor: FileDescriptor, params: Arc<Params>) -> u64 {
        let priority = (self.priority_fn)(&descriptor);
        self.enqueue_with_priority(descriptor, params, priority)
    }

    /// 以显式优先级入队
    pub fn enqueue_with_priority(
        &mut self,
        descriptor: FileDescriptor,
        params: Arc<Params>,
        priority: i64,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.push(Job {
            id,
            descriptor,
            params,
            priority,
        });
        id
    }

    /// 批量入队，所有作业共享同一组参数
    pub fn enqueue_batch<I>(&mut self, descriptors: I, params: Params) -> Vec<u64>
    where
        I: IntoIterator<Item = FileDescriptor>,
    {
        let params = Arc::new(params);
        descriptors
            .into_iter()
            .map(|d| self.enqueue(d, Arc::clone(&params)))
            .collect()
    }

    /// 执行所有已入队的作业
    pub fn run(
        &mut self,
        processor: Arc<dyn Processor>,
        tracker: &mut ProgressTracker,
        handler: &mut ErrorHandler,
    ) -> Result<RunOutput> {
        self.run_with(processor, tracker, handler, |_, _| {})
    }

    /// 执行所有已入队的作业，每个结果记录后调用 `on_complete`
    pub fn run_with<F>(
        &mut self,
        processor: Arc<dyn Processor>,
        tracker: &mut ProgressTracker,
        handler: &mut ErrorHandler,
        mut on_complete: F,
    ) -> Result<RunOutput>
    where
        F: FnMut(&JobResult, &ProgressTracker),
    {
        let mut jobs = std::mem::take(&mut self.jobs);
        if jobs.is_empty() {
            tracing::warn!("no tasks to process");
            self.last_stats = Some(ProcessingStats::default());
            return Ok(RunOutput::default());
        }

        // 稳定排序：同优先级保持入队顺序
        jobs.sort_by(|a, b| b.priority.cmp(&a.priority));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("docbatch-worker-{}", i))
            .build()
            .map_err(|e| DocbatchError::PoolBuildError(e.to_string()))?;

        tracing::info!(tasks = jobs.len(), workers = self.workers, "dispatching tasks");

        let (tx, rx) = crossbeam_channel::unbounded::<JobResult>();
        let cancelled = Arc::new(AtomicBool::new(false));

        for job in jobs {
            let tx = tx.clone();
            let processor = Arc::clone(&processor);
            let cancelled = Arc::clone(&cancelled);
            pool.spawn(move || {
                if cancelled.load(Ordering::Acquire) {
                    return;
                }
                let result = execute_job(&job, processor.as_ref());
                // 停止后接收端已关闭，结果直接丢弃
                let _ = tx.send(result);
            });
        }
        drop(tx);

        let mut output = RunOutput::default();
        for result in rx.iter() {
            tracker.complete_file(
                result.is_success(),
                result.processing_time,
                result.file_size,
            );

            let stop = match &result.outcome {
                Ok(_) => {
                    handler.reset_consecutive();
                    false
                }
                Err(err) => {
                    let mut context = BTreeMap::new();
                    context.insert("job_id".to_string(), result.job_id.to_string());
                    context.insert("file_size".to_string(), result.file_size.to_string());
                    let decision = handler.handle_with_context(&result.path, err, context);
                    tracing::debug!(
                        job_id = result.job_id,
                        hint = decision.recovery_hint,
                        "recovery hint"
                    );
                    !decision.should_continue
                }
            };

            on_complete(&result, tracker);
            output.results.push(result);

            if stop {
                cancelled.store(true, Ordering::Release);
                output.stopped = true;
                tracing::warn!(
                    completed = output.results.len(),
                    "stopping batch: error handler refused to continue"
                );
                break;
            }
        }
        drop(rx);
        // 不等待仍在执行的作业
        drop(pool);

        tracing::info!(results = output.results.len(), "parallel processing finished");
        self.last_stats = Some(ProcessingStats::from_results(&output.results, self.workers));
        Ok(output)
    }

    /// 最近一次运行的统计
    pub fn processing_stats(&self) -> Option<&ProcessingStats> {
        self.last_stats.as_ref()
    }
}

/// 在工作线程上执行单个作业，任何错误或 panic 都转换为失败结果
fn execute_job(job: &Job, processor: &dyn Processor) -> JobResult {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        processor.process(job.descriptor.path(), &job.params)
    }))
    .unwrap_or_else(|payload| {
        Err(JobError::new(
            ErrorKind::Runtime,
            format!("processor panicked: {}", panic_message(payload.as_ref())),
        ))
    });

    JobResult {
        job_id: job.id,
        path: job.descriptor.path().to_path_buf(),
        outcome,
        processing_time: started.elapsed(),
        file_size: job.descriptor.size(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
