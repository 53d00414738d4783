//! # 报告模块
//!
//! 从一次运行的全部作业结果聚合出不可变的 `BatchReport`，
//! 再由四个渲染器（JSON / CSV / HTML / Markdown）序列化。
//!
//! 渲染器不做任何计算：数值字段统一经 `metric_rows` 与格式化函数输出，
//! 因此各格式中的数值总是一致。
//!
//! ## 子模块
//! - `json`: 机器可读格式（可反序列化）
//! - `csv`: 表格格式
//! - `html`: 带样式的文档
//! - `markdown`: 纯文本文档
//!
//! ## 依赖关系
//! - 被 `batch/processor.rs` 调用
//! - 使用 `batch/job.rs`、`batch/failure.rs`
//! - 使用 `serde`、`chrono`、`tabled`

pub mod csv;
pub mod html;
pub mod json;
pub mod markdown;

use crate::batch::failure::ErrorSummary;
use crate::batch::job::{parallelization_efficiency, JobResult};
use crate::batch::scanner::FileDescriptor;
use crate::error::{DocbatchError, Result};
use crate::utils::output;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 结果预览的默认字符数
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

// ─────────────────────────────────────────────────────────────
// 报告数据
// ─────────────────────────────────────────────────────────────

/// 成功文件条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SucceededFile {
    pub filename: String,
    pub size_mb: f64,
    pub processing_time: f64,
    pub result_summary: String,
}

/// 失败文件条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFile {
    pub filename: String,
    pub size_mb: f64,
    pub processing_time: f64,
    pub error_message: String,
    pub error_kind: String,
}

/// 批处理报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    // 会话
    pub session_id: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub duration_seconds: f64,

    // 文件统计
    pub total_files: usize,
    pub succeeded_files: usize,
    pub failed_files: usize,
    /// 因提前停止而未执行的文件
    pub skipped_files: usize,
    pub success_rate: f64,

    // 大小统计
    pub total_size_mb: f64,
    pub processed_size_mb: f64,
    pub avg_file_size_mb: f64,

    // 性能指标
    pub avg_processing_time: f64,
    pub files_per_minute: f64,
    pub mb_per_minute: f64,
    pub parallelization_efficiency: f64,
    pub workers: usize,
    pub pool: String,

    /// 被熔断或 CRITICAL 错误提前终止
    pub partial: bool,

    pub succeeded: Vec<SucceededFile>,
    pub failed: Vec<FailedFile>,
    pub error_summary: ErrorSummary,
}

/// 生成报告所需的输入
pub struct ReportInput<'a> {
    pub session_id: &'a str,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub results: &'a [JobResult],
    pub error_summary: ErrorSummary,
    pub descriptors: &'a [FileDescriptor],
    pub workers: usize,
    pub pool: &'a str,
    pub partial: bool,
}

// ─────────────────────────────────────────────────────────────
// 生成器
// ─────────────────────────────────────────────────────────────

/// 报告生成器
pub struct ReportGenerator {
    preview_chars: usize,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// 纯聚合，不做 I/O
    pub fn generate(&self, input: ReportInput<'_>) -> BatchReport {
        let mut ordered: Vec<&JobResult> = input.results.iter().collect();
        ordered.sort_by_key(|r| r.job_id);

        let total_files = ordered.len();
        let succeeded_files = ordered.iter().filter(|r| r.is_success()).count();
        let failed_files = total_files - succeeded_files;
        let success_rate = ratio(succeeded_files as f64, total_files as f64) * 100.0;

        let total_size_mb: f64 = ordered.iter().map(|r| r.size_mb()).sum();
        let processed_size_mb: f64 = ordered
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.size_mb())
            .sum();
        let total_processing: f64 = ordered.iter().map(|r| r.seconds()).sum();

        let elapsed_ms = (input.end - input.start).num_milliseconds().max(0);
        let duration_seconds = elapsed_ms as f64 / 1000.0;
        let minutes = duration_seconds / 60.0;

        let succeeded = ordered
            .iter()
            .filter_map(|r| {
                r.payload().map(|payload| SucceededFile {
                    filename: r.file_name(),
                    size_mb: r.size_mb(),
                    processing_time: r.seconds(),
                    result_summary: preview(&payload.to_text(), self.preview_chars),
                })
            })
            .collect();

        let failed = ordered
            .iter()
            .filter_map(|r| {
                r.error().map(|err| FailedFile {
                    filename: r.file_name(),
                    size_mb: r.size_mb(),
                    processing_time: r.seconds(),
                    error_message: err.message.clone(),
                    error_kind: err.kind.name().to_string(),
                })
            })
            .collect();

        BatchReport {
            session_id: input.session_id.to_string(),
            start_time: input.start,
            end_time: input.end,
            duration_seconds,
            total_files,
            succeeded_files,
            failed_files,
            skipped_files: input.descriptors.len().saturating_sub(total_files),
            success_rate,
            total_size_mb,
            processed_size_mb,
            avg_file_size_mb: ratio(total_size_mb, total_files as f64),
            avg_processing_time: ratio(total_processing, total_files as f64),
            files_per_minute: ratio(succeeded_files as f64, minutes),
            mb_per_minute: ratio(processed_size_mb, minutes),
            parallelization_efficiency: parallelization_efficiency(input.results, input.workers),
            workers: input.workers,
            pool: input.pool.to_string(),
            partial: input.partial,
            succeeded,
            failed,
            error_summary: input.error_summary,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// 截断结果预览
fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

// ─────────────────────────────────────────────────────────────
// 共享格式化
// ─────────────────────────────────────────────────────────────

pub(crate) fn fmt_mb(value: f64) -> String {
    format!("{:.2}", value)
}

pub(crate) fn fmt_secs(value: f64) -> String {
    format!("{:.2}", value)
}

pub(crate) fn fmt_pct(value: f64) -> String {
    format!("{:.1}", value)
}

pub(crate) fn fmt_rate(value: f64) -> String {
    format!("{:.1}", value)
}

pub(crate) fn fmt_time(value: &DateTime<Local>) -> String {
    value.to_rfc3339()
}

/// 汇总指标行（所有文本格式共用）
pub fn metric_rows(report: &BatchReport) -> Vec<(&'static str, String)> {
    vec![
        ("Session ID", report.session_id.clone()),
        ("Start", fmt_time(&report.start_time)),
        ("End", fmt_time(&report.end_time)),
        ("Duration (s)", fmt_secs(report.duration_seconds)),
        ("Total Files", report.total_files.to_string()),
        ("Succeeded", report.succeeded_files.to_string()),
        ("Failed", report.failed_files.to_string()),
        ("Skipped", report.skipped_files.to_string()),
        ("Success Rate (%)", fmt_pct(report.success_rate)),
        ("Total Size (MB)", fmt_mb(report.total_size_mb)),
        ("Processed Size (MB)", fmt_mb(report.processed_size_mb)),
        ("Avg File Size (MB)", fmt_mb(report.avg_file_size_mb)),
        ("Avg Time/File (s)", fmt_secs(report.avg_processing_time)),
        ("Files/min", fmt_rate(report.files_per_minute)),
        ("MB/min", fmt_rate(report.mb_per_minute)),
        (
            "Parallel Efficiency (%)",
            fmt_pct(report.parallelization_efficiency),
        ),
        ("Workers", report.workers.to_string()),
        ("Pool", report.pool.clone()),
        ("Partial", report.partial.to_string()),
        ("Total Errors", report.error_summary.total_errors.to_string()),
        (
            "Consecutive Errors",
            report.error_summary.consecutive_errors.to_string(),
        ),
    ]
}

/// 错误摘要分节标题（所有文本格式共用）
pub(crate) const ERRORS_BY_TYPE: &str = "Errors by Type";
pub(crate) const ERRORS_BY_SEVERITY: &str = "Errors by Severity";
pub(crate) const RECENT_ERRORS: &str = "Most Recent Errors";

// ─────────────────────────────────────────────────────────────
// 落盘与终端输出
// ─────────────────────────────────────────────────────────────

/// 已写出的报告文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub html: PathBuf,
    pub markdown: PathBuf,
}

impl ReportPaths {
    pub fn entries(&self) -> [(&'static str, &Path); 4] {
        [
            ("JSON", self.json.as_path()),
            ("CSV", self.csv.as_path()),
            ("HTML", self.html.as_path()),
            ("Markdown", self.markdown.as_path()),
        ]
    }
}

/// 写出全部四种格式: `{session}.json|csv|html|md`
pub fn save_all(report: &BatchReport, dir: &Path) -> Result<ReportPaths> {
    fs::create_dir_all(dir).map_err(|e| DocbatchError::FileWriteError {
        path: dir.display().to_string(),
        source: e,
    })?;

    let paths = ReportPaths {
        json: dir.join(format!("{}.json", report.session_id)),
        csv: dir.join(format!("{}.csv", report.session_id)),
        html: dir.join(format!("{}.html", report.session_id)),
        markdown: dir.join(format!("{}.md", report.session_id)),
    };

    write_file(&paths.json, &json::to_json(report)?)?;
    write_file(&paths.csv, &csv::to_csv(report)?)?;
    write_file(&paths.html, &html::to_html(report)?)?;
    write_file(&paths.markdown, &markdown::to_markdown(report)?)?;

    tracing::info!(dir = %dir.display(), session = %report.session_id, "reports written");
    Ok(paths)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| DocbatchError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// 在终端打印汇总
pub fn print_summary(report: &BatchReport) {
    output::print_header("Batch Processing Summary");

    let rows: Vec<MetricRow> = metric_rows(report)
        .into_iter()
        .map(|(metric, value)| MetricRow { metric, value })
        .collect();
    println!("{}", Table::new(rows));

    if !report.failed.is_empty() {
        output::print_warning("Failed files:");
        for file in report.failed.iter().take(10) {
            output::print_file_failure(&file.filename, &file.error_kind, &file.error_message);
        }
        if report.failed.len() > 10 {
            output::print_warning(&format!("  ... and {} more", report.failed.len() - 10));
        }
    }

    if report.partial {
        output::print_warning("Run stopped early; this report is partial.");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::processors::{ErrorKind, JobError, Payload};
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::time::Duration;

    const MB: u64 = 1024 * 1024;

    pub(crate) fn sample_results() -> Vec<JobResult> {
        let ok = |id: u64, name: &str, mb: u64, secs: f64, text: &str| JobResult {
            job_id: id,
            path: PathBuf::from(format!("/docs/{}", name)),
            outcome: Ok(Payload::from(text)),
            processing_time: Duration::from_secs_f64(secs),
            file_size: mb * MB,
        };
        vec![
            ok(1, "b.txt", 2, 1.0, "Summary of b"),
            ok(0, "a.pdf", 1, 1.5, "Summary of a | with pipe"),
            JobResult {
                job_id: 2,
                path: PathBuf::from("/docs/c.html"),
                outcome: Err(JobError::new(ErrorKind::Parse, "broken <table>")),
                processing_time: Duration::from_secs_f64(2.0),
                file_size: 3 * MB,
            },
            ok(3, "d.md", 4, 0.5, "Summary of d"),
            ok(4, "e.txt", 5, 1.0, "Summary of e"),
        ]
    }

    pub(crate) fn sample_report() -> BatchReport {
        let results = sample_results();
        let start = Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let end = Local.with_ymd_and_hms(2024, 5, 1, 10, 2, 0).unwrap();
        let mut by_type = BTreeMap::new();
        by_type.insert("Parse".to_string(), 1);
        let mut by_severity = BTreeMap::new();
        by_severity.insert("low".to_string(), 1);
        let summary = ErrorSummary {
            total_errors: 1,
            consecutive_errors: 0,
            errors_by_type: by_type,
            errors_by_severity: by_severity,
            most_recent_errors: vec!["[LOW] c.html: broken <table>".to_string()],
        };

        ReportGenerator::new().generate(ReportInput {
            session_id: "batch_test",
            start,
            end,
            results: &results,
            error_summary: summary,
            descriptors: &[],
            workers: 2,
            pool: "thread",
            partial: false,
        })
    }

    #[test]
    fn test_generate_counts_and_rates() {
        let report = sample_report();
        assert_eq!(report.total_files, 5);
        assert_eq!(report.succeeded_files, 4);
        assert_eq!(report.failed_files, 1);
        assert!((report.success_rate - 80.0).abs() < 1e-9);
        assert!((report.total_size_mb - 15.0).abs() < 1e-9);
        assert!((report.processed_size_mb - 12.0).abs() < 1e-9);
        assert!((report.avg_file_size_mb - 3.0).abs() < 1e-9);
        assert!((report.avg_processing_time - 1.2).abs() < 1e-9);
        assert!((report.duration_seconds - 120.0).abs() < 1e-9);
        // 2 分钟内成功 4 个
        assert!((report.files_per_minute - 2.0).abs() < 1e-9);
        assert!((report.mb_per_minute - 6.0).abs() < 1e-9);
        // (2.0 × 2) / 6.0 × 100
        assert!((report.parallelization_efficiency - 66.666_666).abs() < 1e-3);
    }

    #[test]
    fn test_lists_follow_job_order() {
        let report = sample_report();
        let names: Vec<&str> = report
            .succeeded
            .iter()
            .map(|f| f.filename.as_str())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.txt", "d.md", "e.txt"]);
        assert_eq!(report.failed[0].filename, "c.html");
        assert_eq!(report.failed[0].error_kind, "Parse");
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdefghij", 4), "abcd...");
        assert_eq!(preview("日本語のテキスト", 3), "日本語...");
    }

    #[test]
    fn test_empty_run_has_zero_rates() {
        let now = Local::now();
        let report = ReportGenerator::new().generate(ReportInput {
            session_id: "empty",
            start: now,
            end: now,
            results: &[],
            error_summary: ErrorSummary::default(),
            descriptors: &[],
            workers: 1,
            pool: "thread",
            partial: false,
        });
        assert_eq!(report.success_rate, 0.0);
        assert_eq!(report.files_per_minute, 0.0);
        assert_eq!(report.parallelization_efficiency, 0.0);
    }

    #[test]
    fn test_skipped_counts_undispatched_descriptors() {
        let results = sample_results();
        let descriptors: Vec<FileDescriptor> = (0..7)
            .map(|i| {
                let path = format!("/docs/{}.txt", i);
                FileDescriptor::new(path, 10, "Text File", "text/plain")
            })
            .collect();
        let now = Local::now();
        let report = ReportGenerator::new().generate(ReportInput {
            session_id: "partial",
            start: now,
            end: now,
            results: &results,
            error_summary: ErrorSummary::default(),
            descriptors: &descriptors,
            workers: 1,
            pool: "thread",
            partial: true,
        });
        assert_eq!(report.skipped_files, 2);
        assert!(report.partial);
    }

    #[test]
    fn test_all_formats_agree_on_success_rate() {
        let report = sample_report();
        let rate = fmt_pct(report.success_rate);
        assert_eq!(rate, "80.0");

        let json_text = super::json::to_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json_text).unwrap();
        assert_eq!(fmt_pct(value["success_rate"].as_f64().unwrap()), rate);

        let csv_text = super::csv::to_csv(&report).unwrap();
        assert!(csv_text.contains(&format!("Success Rate (%),{}", rate)));

        let html_text = super::html::to_html(&report).unwrap();
        assert!(html_text.contains(&format!("<td>Success Rate (%)</td><td>{}</td>", rate)));

        let md_text = super::markdown::to_markdown(&report).unwrap();
        assert!(md_text.contains(&format!("| Success Rate (%) | {} |", rate)));
    }

    #[test]
    fn test_all_formats_carry_error_summary() {
        let report = sample_report();
        let recent = "[LOW] c.html: broken <table>";

        let json_text = super::json::to_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json_text).unwrap();
        assert_eq!(value["error_summary"]["total_errors"], 1);
        assert_eq!(value["error_summary"]["errors_by_type"]["Parse"], 1);
        assert_eq!(value["error_summary"]["errors_by_severity"]["low"], 1);
        assert_eq!(value["error_summary"]["most_recent_errors"][0], recent);

        let csv_text = super::csv::to_csv(&report).unwrap();
        assert!(csv_text.contains("Total Errors,1"));
        assert!(csv_text.contains("Consecutive Errors,0"));
        assert!(csv_text.contains("Parse,1"));
        assert!(csv_text.contains("low,1"));
        assert!(csv_text.contains(recent));

        let html_text = super::html::to_html(&report).unwrap();
        assert!(html_text.contains("<td>Total Errors</td><td>1</td>"));
        assert!(html_text.contains("<td>Parse</td><td>1</td>"));
        assert!(html_text.contains("<td>low</td><td>1</td>"));
        assert!(html_text.contains("[LOW] c.html: broken &lt;table&gt;"));
        assert!(!html_text.contains("Share"));

        let md_text = super::markdown::to_markdown(&report).unwrap();
        assert!(md_text.contains("| Total Errors | 1 |"));
        assert!(md_text.contains("| Parse | 1 |"));
        assert!(md_text.contains("| low | 1 |"));
        assert!(md_text.contains(recent));
    }

    #[test]
    fn test_save_all_writes_four_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let report = sample_report();
        let paths = save_all(&report, &dir.path().join("reports")).unwrap();
        for (_, path) in paths.entries() {
            assert!(path.exists(), "{} missing", path.display());
            assert!(path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("batch_test."));
        }
    }
}
