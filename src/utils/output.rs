//! # 终端输出
//!
//! 面向用户的结果行统一为 `[TAG] 消息` 格式；日志走 `tracing`（stderr），
//! 不经过这里。
//!
//! ## 功能
//! - 通用状态行: OK / ERR / WARN / SKIP / DONE
//! - 批处理专用: 失败文件、扫描问题、计数分组、已写出的报告
//!
//! ## 依赖关系
//! - 被 `commands/`、`batch/failure.rs`、`report/` 使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};
use std::collections::BTreeMap;
use std::path::Path;

const RULE_WIDTH: usize = 60;

fn tagged(tag: ColoredString, msg: &str) -> String {
    format!("{} {}", tag, msg)
}

pub fn print_success(msg: &str) {
    println!("{}", tagged("[OK]".green().bold(), msg));
}

/// 错误写到 stderr
pub fn print_error(msg: &str) {
    eprintln!("{}", tagged("[ERR]".red().bold(), msg));
}

pub fn print_warning(msg: &str) {
    println!("{}", tagged("[WARN]".yellow().bold(), msg));
}

pub fn print_info(msg: &str) {
    println!("{}", tagged("[*]".blue().bold(), msg));
}

pub fn print_done(msg: &str) {
    println!("{}", tagged("[DONE]".green().bold(), msg));
}

/// `[FAIL] 文件名 (类型): 消息`
pub fn file_failure_line(filename: &str, kind: &str, message: &str) -> String {
    tagged(
        "[FAIL]".red().bold(),
        &format!("{} ({}): {}", filename, kind.yellow(), message),
    )
}

pub fn print_file_failure(filename: &str, kind: &str, message: &str) {
    println!("{}", file_failure_line(filename, kind, message));
}

/// 扫描时被跳过的路径及原因
pub fn issue_line(path: &Path, reason: &str) -> String {
    tagged(
        "[SKIP]".dimmed(),
        &format!("{}: {}", path.display(), reason),
    )
}

pub fn print_issue(path: &Path, reason: &str) {
    println!("{}", issue_line(path, reason));
}

/// 分组计数，例如错误按类型、按严重程度
pub fn print_counts(title: &str, counts: &BTreeMap<String, usize>) {
    println!("\n{}", title.bold());
    for (key, count) in counts {
        println!("  - {}: {}", key, count);
    }
}

/// 已写出的文件: `[OK] JSON      -> path`
pub fn print_saved(label: &str, path: &Path) {
    println!(
        "{} {:<9} {} {}",
        "[OK]".green().bold(),
        label.dimmed(),
        "->".cyan(),
        path.display()
    );
}

pub fn print_header(title: &str) {
    let rule = "─".repeat(RULE_WIDTH);
    println!("\n{}", rule.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", rule.dimmed());
}

pub fn print_separator() {
    println!("{}", "─".repeat(RULE_WIDTH).dimmed());
}
