//! # 失败处理器
//!
//! 每次批处理一个实例的小状态机：对失败分类（严重程度 × 类别），
//! 维护连续失败计数，并决定批次是否继续。
//!
//! ## 决策规则
//! 1. 严重程度为 CRITICAL → 立即停止
//! 2. 连续失败数 ≥ 上限 → 停止（熔断）
//! 3. 否则取决于 `continue_on_error`
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 在每个失败作业完成后调用
//! - 摘要被 `report/` 使用
//! - 使用 `tracing` 按严重程度记录日志

use crate::processors::{ErrorKind, JobError};
use crate::utils::output;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// 默认连续失败上限
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: usize = 5;

/// 摘要中保留的最近失败条数
const RECENT_ERRORS: usize = 5;

// ─────────────────────────────────────────────────────────────
// 分类
// ─────────────────────────────────────────────────────────────

/// 严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// 失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    FileAccess,
    FormatError,
    MemoryError,
    ExternalServiceError,
    SystemError,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FileAccess => "file_access",
            Category::FormatError => "format_error",
            Category::MemoryError => "memory_error",
            Category::ExternalServiceError => "external_service_error",
            Category::SystemError => "system_error",
            Category::Unknown => "unknown",
        }
    }
}

/// 严重程度查找表
pub fn severity_of(kind: ErrorKind) -> Severity {
    match kind {
        ErrorKind::Memory | ErrorKind::System | ErrorKind::Interrupted => Severity::Critical,
        ErrorKind::PermissionDenied | ErrorKind::Os => Severity::High,
        ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Llm => Severity::Medium,
        _ => Severity::Low,
    }
}

/// 类别查找表
pub fn category_of(kind: ErrorKind) -> Category {
    match kind {
        ErrorKind::FileNotFound | ErrorKind::PermissionDenied | ErrorKind::IsADirectory => {
            Category::FileAccess
        }
        ErrorKind::UnicodeDecode | ErrorKind::PdfSyntax | ErrorKind::Parse => Category::FormatError,
        ErrorKind::Memory | ErrorKind::OutOfMemory => Category::MemoryError,
        ErrorKind::Llm | ErrorKind::Timeout | ErrorKind::Connection => {
            Category::ExternalServiceError
        }
        ErrorKind::Os | ErrorKind::System | ErrorKind::Runtime => Category::SystemError,
        ErrorKind::Interrupted | ErrorKind::Other => Category::Unknown,
    }
}

/// 恢复提示（仅供记录，不会触发重试）
pub fn recovery_hint(kind: ErrorKind) -> &'static str {
    match category_of(kind) {
        Category::FileAccess => match kind {
            ErrorKind::PermissionDenied => "skip_permission",
            ErrorKind::FileNotFound => "skip_missing",
            _ => "skip",
        },
        Category::FormatError => "skip_format",
        Category::MemoryError => "skip_large",
        Category::ExternalServiceError => "retry_llm",
        Category::SystemError => "skip_system",
        Category::Unknown => "skip",
    }
}

// ─────────────────────────────────────────────────────────────
// 记录与摘要
// ─────────────────────────────────────────────────────────────

/// 单条失败记录
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
    pub severity: Severity,
    pub category: Category,
    pub timestamp: DateTime<Local>,
    pub context: BTreeMap<String, String>,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string());
        write!(f, "[{}] {}: {}", self.severity, name, self.message)
    }
}

/// 处理决策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub should_continue: bool,
    pub recovery_hint: &'static str,
}

/// 失败摘要（进入报告）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub total_errors: usize,
    pub consecutive_errors: usize,
    pub errors_by_type: BTreeMap<String, usize>,
    pub errors_by_severity: BTreeMap<String, usize>,
    pub most_recent_errors: Vec<String>,
}

// ─────────────────────────────────────────────────────────────
// 处理器
// ─────────────────────────────────────────────────────────────

/// 失败处理器（每次运行独立实例）
#[derive(Debug)]
pub struct ErrorHandler {
    max_consecutive_errors: usize,
    continue_on_error: bool,
    records: Vec<FailureRecord>,
    consecutive_errors: usize,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONSECUTIVE_ERRORS, true)
    }
}

impl ErrorHandler {
    pub fn new(max_consecutive_errors: usize, continue_on_error: bool) -> Self {
        Self {
            max_consecutive_errors,
            continue_on_error,
            records: Vec::new(),
            consecutive_errors: 0,
        }
    }

    /// 处理一次失败
    pub fn handle(&mut self, path: &Path, error: &JobError) -> Decision {
        self.handle_with_context(path, error, BTreeMap::new())
    }

    /// 处理一次失败（附带诊断上下文）
    pub fn handle_with_context(
        &mut self,
        path: &Path,
        error: &JobError,
        context: BTreeMap<String, String>,
    ) -> Decision {
        let record = FailureRecord {
            path: path.to_path_buf(),
            kind: error.kind,
            message: error.message.clone(),
            severity: severity_of(error.kind),
            category: category_of(error.kind),
            timestamp: Local::now(),
            context,
        };

        log_record(&record);

        self.consecutive_errors += 1;
        let should_continue = self.should_continue(record.severity);
        self.records.push(record);

        Decision {
            should_continue,
            recovery_hint: recovery_hint(error.kind),
        }
    }

    /// 成功后重置连续失败计数
    pub fn reset_consecutive(&mut self) {
        self.consecutive_errors = 0;
    }

    pub fn consecutive_errors(&self) -> usize {
        self.consecutive_errors
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    fn should_continue(&self, severity: Severity) -> bool {
        if severity == Severity::Critical {
            return false;
        }
        if self.consecutive_errors >= self.max_consecutive_errors {
            return false;
        }
        self.continue_on_error
    }

    /// 生成摘要
    pub fn summary(&self) -> ErrorSummary {
        let mut summary = ErrorSummary {
            total_errors: self.records.len(),
            consecutive_errors: self.consecutive_errors,
            ..Default::default()
        };

        for record in &self.records {
            *summary
                .errors_by_type
                .entry(record.kind.name().to_string())
                .or_insert(0) += 1;
            *summary
                .errors_by_severity
                .entry(record.severity.as_str().to_string())
                .or_insert(0) += 1;
        }

        let skip = self.records.len().saturating_sub(RECENT_ERRORS);
        summary.most_recent_errors = self.records[skip..].iter().map(|r| r.to_string()).collect();

        summary
    }

    /// 在终端打印失败报告
    pub fn print_report(&self) {
        if self.records.is_empty() {
            output::print_success("No errors encountered during processing");
            return;
        }

        let summary = self.summary();
        output::print_header("Error Report");
        output::print_info(&format!("Total errors: {}", summary.total_errors));
        output::print_info(&format!("Consecutive: {}", summary.consecutive_errors));

        output::print_counts("By type:", &summary.errors_by_type);
        output::print_counts("By severity:", &summary.errors_by_severity);
        println!("\nRecent:");
        for line in &summary.most_recent_errors {
            println!("  - {}", line);
        }
        output::print_separator();
    }
}

fn log_record(record: &FailureRecord) {
    let path = record.path.display();
    match record.severity {
        Severity::Low => tracing::warn!(
            path = %path,
            kind = %record.kind,
            category = record.category.as_str(),
            severity = record.severity.as_str(),
            "{}",
            record.message
        ),
        _ => tracing::error!(
            path = %path,
            kind = %record.kind,
            category = record.category.as_str(),
            severity = record.severity.as_str(),
            "{}",
            record.message
        ),
    }
}
