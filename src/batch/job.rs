//! # 作业与作业结果
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs`、`batch/processor.rs` 与 `report/` 使用
//! - 使用 `batch/scanner.rs` 的 `FileDescriptor`

use super::scanner::FileDescriptor;
use crate::processors::{JobError, Params, Payload};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// 默认优先级基准
pub const BASE_PRIORITY: i64 = 100;

/// 可替换的优先级函数（数值越大越先提交）
pub type PriorityFn = Arc<dyn Fn(&FileDescriptor) -> i64 + Send + Sync>;

/// 默认优先级: `100 - 大小(MB)`，向零截断
///
/// 超过 100 MB 的文件会得到负值。
pub fn size_priority(descriptor: &FileDescriptor) -> i64 {
    (BASE_PRIORITY as f64 - descriptor.size_mb()).trunc() as i64
}

/// 一个待执行的作业
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub descriptor: FileDescriptor,
    pub params: Arc<Params>,
    pub priority: i64,
}

/// 单个作业的执行结果
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: u64,
    pub path: PathBuf,
    pub outcome: Result<Payload, JobError>,
    pub processing_time: Duration,
    /// 字节大小
    pub file_size: u64,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.outcome.as_ref().err()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_mb(&self) -> f64 {
        self.file_size as f64 / (1024.0 * 1024.0)
    }

    pub fn seconds(&self) -> f64 {
        self.processing_time.as_secs_f64()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// 并行效率估计: `(最长单作业耗时 × 工作线程数) / 总耗时 × 100`
///
/// 只是粗略指标，不是加速比的保证。
pub fn parallelization_efficiency(results: &[JobResult], workers: usize) -> f64 {
    let total: f64 = results.iter().map(JobResult::seconds).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let longest = results
        .iter()
        .map(JobResult::seconds)
        .fold(0.0_f64, f64::max);
    longest * workers as f64 / total * 100.0
}
