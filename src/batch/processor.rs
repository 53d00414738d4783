//! # 批处理编排器
//!
//! 一次完整运行：扫描 → 筛选 → 入队 → 并行执行 → 落盘产物 → 报告。
//!
//! ## 功能
//! - 每次运行生成唯一会话 ID
//! - 失败文件不影响其余文件；熔断或 CRITICAL 错误时提前结束并标记为 partial
//! - 成功结果写入 `{output}/processed/`，报告写入 `{output}/reports/`
//! - 任何未预期的错误都折叠为 `RunStatus::Error`，不向调用方抛出
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `batch/` 其余子模块与 `report/`
//! - 使用 `chrono`、`uuid`、`sha2`、`indicatif`

use super::failure::{ErrorHandler, DEFAULT_MAX_CONSECUTIVE_ERRORS};
use super::job::JobResult;
use super::progress::{format_duration, ProgressSnapshot, ProgressTracker};
use super::runner::{ProcessingStats, TaskManager};
use super::scanner::{normalize_extension, FileDescriptor, FileScanner, ScanOptions};
use crate::error::Result;
use crate::processors::{Params, Processor};
use crate::report::{
    self, BatchReport, ReportGenerator, ReportInput, ReportPaths, DEFAULT_PREVIEW_CHARS,
};
use crate::utils::progress;

use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 工作池类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolKind {
    /// 进程内线程
    #[default]
    Thread,
    /// 每个作业一个子进程
    Process,
}

impl PoolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKind::Thread => "thread",
            PoolKind::Process => "process",
        }
    }
}

/// 批处理配置
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// 0 表示使用默认值
    pub workers: usize,
    pub pool: PoolKind,
    pub max_consecutive_errors: usize,
    pub continue_on_error: bool,
    /// 报告中每个结果预览保留的字符数
    pub preview_chars: usize,
    pub output_dir: PathBuf,
    /// 产物文件名中的语言标签
    pub language: String,
    /// 为空时接受全部支持的类型
    pub extensions: Vec<String>,
    pub scan: ScanOptions,
    /// 关闭进度条与终端汇总
    pub quiet: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            pool: PoolKind::Thread,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            continue_on_error: true,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            output_dir: PathBuf::from("output/batch"),
            language: "ja".to_string(),
            extensions: Vec::new(),
            scan: ScanOptions::default(),
            quiet: false,
        }
    }
}

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// 被提前停止
    Partial,
    /// 目录中没有支持的文件
    NoFiles,
    /// 扩展名筛选后为空
    NoMatchingFiles,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Partial => "partial",
            RunStatus::NoFiles => "no_files",
            RunStatus::NoMatchingFiles => "no_matching_files",
            RunStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次运行的结果
#[derive(Debug)]
pub struct BatchOutcome {
    pub status: RunStatus,
    pub session_id: String,
    /// 筛选后待处理的文件数
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub processing_time: Duration,
    pub report: Option<BatchReport>,
    pub report_paths: Option<ReportPaths>,
    pub artifacts: Vec<PathBuf>,
    pub results: Vec<JobResult>,
    pub stats: Option<ProcessingStats>,
    pub error: Option<String>,
}

impl BatchOutcome {
    fn empty(status: RunStatus, session_id: String) -> Self {
        Self {
            status,
            session_id,
            total_files: 0,
            succeeded: 0,
            failed: 0,
            success_rate: 0.0,
            processing_time: Duration::ZERO,
            report: None,
            report_paths: None,
            artifacts: Vec::new(),
            results: Vec::new(),
            stats: None,
            error: None,
        }
    }
}

/// 批处理编排器
pub struct BatchProcessor {
    config: BatchConfig,
}

impl BatchProcessor {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    /// 处理目录中的全部文件
    pub fn process_directory(
        &self,
        dir: &Path,
        processor: Arc<dyn Processor>,
        params: Params,
    ) -> BatchOutcome {
        let started_at = Local::now();
        let session_id = new_session_id(&started_at);
        info!(
            session = %session_id,
            dir = %dir.display(),
            pool = self.config.pool.as_str(),
            "batch session started"
        );

        match self.execute(&session_id, started_at, dir, processor, params) {
            Ok(outcome) => {
                info!(session = %session_id, status = %outcome.status, "batch session finished");
                outcome
            }
            Err(err) => {
                error!(session = %session_id, %err, "batch session failed");
                let mut outcome = BatchOutcome::empty(RunStatus::Error, session_id);
                outcome.error = Some(err.to_string());
                outcome
            }
        }
    }

    fn execute(
        &self,
        session_id: &str,
        started_at: DateTime<Local>,
        dir: &Path,
        processor: Arc<dyn Processor>,
        mut params: Params,
    ) -> Result<BatchOutcome> {
        let config = &self.config;

        // Step 1: 扫描
        let spinner = (!config.quiet).then(|| progress::create_spinner("Scanning files..."));
        let scanned = FileScanner::with_options(dir, &config.scan)
            .and_then(|s| s.scan());
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        let scanned = scanned?;
        for issue in &scanned.issues {
            tracing::debug!(
                path = %issue.path.display(),
                reason = %issue.reason,
                "file not queued"
            );
        }
        if scanned.descriptors.is_empty() {
            warn!(dir = %dir.display(), "no supported files found");
            return Ok(BatchOutcome::empty(RunStatus::NoFiles, session_id.to_string()));
        }

        // Step 2: 扩展名筛选
        let files = filter_by_extension(scanned.descriptors, &config.extensions);
        if files.is_empty() {
            warn!(extensions = ?config.extensions, "no files match the requested extensions");
            return Ok(BatchOutcome::empty(
                RunStatus::NoMatchingFiles,
                session_id.to_string(),
            ));
        }
        let total_bytes: u64 = files.iter().map(FileDescriptor::size).sum();

        // Step 3: 入队
        let mut manager = TaskManager::new(config.workers);
        let mut tracker = ProgressTracker::new(files.len(), total_bytes);
        let mut handler =
            ErrorHandler::new(config.max_consecutive_errors, config.continue_on_error);
        params
            .entry("lang".to_string())
            .or_insert_with(|| config.language.clone());
        manager.enqueue_batch(files.iter().cloned(), params);

        // Step 4: 执行
        tracker.start_processing();
        let bar = (!config.quiet)
            .then(|| progress::create_progress_bar(files.len() as u64, "Processing"));
        let run = manager.run_with(processor, &mut tracker, &mut handler, |_, tracker| {
            if let Some(pb) = &bar {
                pb.inc(1);
                pb.set_message(progress_message(&tracker.snapshot()));
            }
        });
        if let Some(pb) = &bar {
            pb.finish_and_clear();
        }
        let run = run?;
        if run.stopped {
            for _ in run.results.len()..files.len() {
                tracker.skip_file("batch stopped before dispatch");
            }
        }
        tracker.finish_processing();

        // Step 5: 产物
        let artifacts = persist_artifacts(
            &run.results,
            &config.output_dir.join("processed"),
            &config.language,
        );

        // Step 6: 报告
        let finished_at = Local::now();
        let pool_label = config.pool.as_str();
        let generator = ReportGenerator::new().with_preview_chars(config.preview_chars);
        let report = generator.generate(ReportInput {
            session_id,
            start: started_at,
            end: finished_at,
            results: &run.results,
            error_summary: handler.summary(),
            descriptors: &files,
            workers: manager.workers(),
            pool: pool_label,
            partial: run.stopped,
        });
        let report_paths = match report::save_all(&report, &config.output_dir.join("reports")) {
            Ok(paths) => Some(paths),
            Err(err) => {
                error!(%err, "failed to write reports");
                None
            }
        };

        if !config.quiet {
            report::print_summary(&report);
            if report.failed_files > 0 {
                handler.print_report();
            }
        }

        let status = if run.stopped {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        };

        Ok(BatchOutcome {
            status,
            session_id: session_id.to_string(),
            total_files: files.len(),
            succeeded: report.succeeded_files,
            failed: report.failed_files,
            success_rate: report.success_rate,
            processing_time: tracker.elapsed(),
            report_paths,
            artifacts,
            stats: manager.processing_stats().cloned(),
            results: run.results,
            report: Some(report),
            error: None,
        })
    }
}

/// `batch_{YYYYmmdd_HHMMSS}_{8 位十六进制}`
pub fn new_session_id(now: &DateTime<Local>) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("batch_{}_{}", now.format("%Y%m%d_%H%M%S"), &random[..8])
}

fn filter_by_extension(files: Vec<FileDescriptor>, extensions: &[String]) -> Vec<FileDescriptor> {
    if extensions.is_empty() {
        return files;
    }
    let wanted: HashSet<String> = extensions.iter().map(|e| normalize_extension(e)).collect();
    files
        .into_iter()
        .filter(|f| wanted.contains(&f.extension()))
        .collect()
}

fn progress_message(snapshot: &ProgressSnapshot) -> String {
    let eta = snapshot
        .eta
        .map(format_duration)
        .unwrap_or_else(|| "--:--:--".to_string());
    let done = snapshot.done();
    let rate = if done > 0 {
        snapshot.completed as f64 / done as f64 * 100.0
    } else {
        0.0
    };
    format!(
        "ok {} | failed {} | {:.1}% | {:.1} files/min | eta {}",
        snapshot.completed, snapshot.failed, rate, snapshot.files_per_minute, eta
    )
}

/// 产物文件名: `{stem}_summary_{lang}.md`
///
/// 同名时，作业 ID 最小者保留原名，其余追加源路径 SHA-256 的前 8 位。
pub fn artifact_name(stem: &str, lang: &str, path: &Path, taken: &HashSet<String>) -> String {
    let name = format!("{}_summary_{}.md", stem, lang);
    if !taken.contains(&name) {
        return name;
    }
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let suffix: String = digest
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("{}_summary_{}_{}.md", stem, lang, suffix)
}

/// 写出成功结果；单个文件写入失败只记录日志
fn persist_artifacts(results: &[JobResult], dir: &Path, lang: &str) -> Vec<PathBuf> {
    let mut ordered: Vec<&JobResult> = results
        .iter()
        .filter(|r| r.payload().is_some_and(|p| !p.is_empty()))
        .collect();
    if ordered.is_empty() {
        return Vec::new();
    }
    ordered.sort_by_key(|r| r.job_id);

    if let Err(err) = fs::create_dir_all(dir) {
        error!(dir = %dir.display(), %err, "failed to create artifact directory");
        return Vec::new();
    }

    let mut taken = HashSet::new();
    let mut written = Vec::new();
    for result in ordered {
        let Some(payload) = result.payload() else {
            continue;
        };
        let stem = result
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("job_{}", result.job_id));
        let name = artifact_name(&stem, lang, result.path(), &taken);
        let target = dir.join(&name);
        match fs::write(&target, payload.to_text().as_bytes()) {
            Ok(()) => {
                taken.insert(name);
                written.push(target);
            }
            Err(err) => {
                error!(path = %target.display(), %err, "failed to write artifact");
            }
        }
    }
    info!(count = written.len(), dir = %dir.display(), "artifacts written");
    written
}
