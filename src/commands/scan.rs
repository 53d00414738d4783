//! # scan 命令实现
//!
//! 只扫描目录，按类型汇总支持的文件，并列出被跳过的文件及原因。
//!
//! ## 依赖关系
//! - 使用 `cli/scan.rs` 定义的参数
//! - 使用 `batch/scanner.rs`, `utils/output.rs`
//! - 使用 `tabled` 输出表格

use crate::batch::scanner::{FileScanner, ScanOptions, SizeLimits};
use crate::cli::scan::ScanArgs;
use crate::error::Result;
use crate::utils::output;

use tabled::{Table, Tabled};

const MB: f64 = 1024.0 * 1024.0;

/// 由命令行开关构造扫描选项
pub(crate) fn scan_options(
    no_recursive: bool,
    include_hidden: bool,
    exclude: Vec<String>,
    no_size_limits: bool,
) -> ScanOptions {
    ScanOptions {
        recursive: !no_recursive,
        include_hidden,
        exclude,
        size_limits: if no_size_limits {
            None
        } else {
            Some(SizeLimits::default())
        },
    }
}

#[derive(Tabled)]
struct TypeRow {
    #[tabled(rename = "Type")]
    file_type: String,
    #[tabled(rename = "Files")]
    count: usize,
    #[tabled(rename = "Size (MB)")]
    size_mb: String,
}

#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "#")]
    order: usize,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "MIME")]
    mime: String,
    #[tabled(rename = "Size (MB)")]
    size_mb: String,
}

/// 执行 scan 命令
pub fn execute(args: ScanArgs) -> Result<i32> {
    output::print_header("Document Scan");

    let options = scan_options(
        args.no_recursive,
        args.include_hidden,
        args.exclude,
        args.no_size_limits,
    );
    let mut scanner = FileScanner::with_options(&args.input, &options)?;
    if !args.ext.is_empty() {
        scanner = scanner.with_extensions(&args.ext);
    }
    let outcome = scanner.scan()?;

    if outcome.descriptors.is_empty() {
        output::print_warning(&format!(
            "No supported files found in {}",
            args.input.display()
        ));
    } else {
        let rows: Vec<TypeRow> = outcome
            .by_type()
            .into_iter()
            .map(|(file_type, stats)| TypeRow {
                file_type,
                count: stats.count,
                size_mb: format!("{:.2}", stats.bytes as f64 / MB),
            })
            .collect();
        println!("{}", Table::new(rows));
        output::print_success(&format!(
            "{} files, {:.2} MB total",
            outcome.descriptors.len(),
            outcome.total_bytes() as f64 / MB
        ));
    }

    if args.verbose && !outcome.descriptors.is_empty() {
        output::print_separator();
        output::print_info("Processing order (smallest first):");
        let rows: Vec<QueueRow> = outcome
            .processing_queue()
            .iter()
            .enumerate()
            .map(|(i, d)| QueueRow {
                order: i + 1,
                file: d.path().display().to_string(),
                mime: d.mime_type().to_string(),
                size_mb: format!("{:.2}", d.size_mb()),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    if !outcome.issues.is_empty() {
        output::print_separator();
        for issue in &outcome.issues {
            output::print_issue(&issue.path, &issue.reason);
        }
    }

    Ok(0)
}
