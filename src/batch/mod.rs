//! # 批量处理模块
//!
//! 目录中的文档 → 带优先级的作业 → 并行执行 → 报告。
//!
//! ## 功能
//! - 扫描目录并筛选支持的文件（`scanner`）
//! - 作业调度与并行执行（`runner`）
//! - 错误分类与熔断（`failure`）
//! - 进度与吞吐量统计（`progress`）
//! - 端到端编排（`processor`）
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod failure;
pub mod job;
pub mod processor;
pub mod progress;
pub mod runner;
pub mod scanner;

pub use failure::{ErrorHandler, ErrorSummary, Severity};
pub use job::{Job, JobResult};
pub use processor::{BatchConfig, BatchOutcome, BatchProcessor, PoolKind, RunStatus};
pub use progress::ProgressTracker;
pub use runner::{ProcessingStats, TaskManager};
pub use scanner::{FileDescriptor, FileScanner, ScanOptions};
