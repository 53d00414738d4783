//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//! 大多数选项都可以由 `DOCBATCH_*` 环境变量提供默认值。
//!
//! ## 命令结构
//! - `run`: 批量处理目录中的文档
//! - `scan`: 只扫描，不处理
//! - `worker`: 处理单个文件（进程池内部使用，隐藏）
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: run, scan, worker

pub mod run;
pub mod scan;
pub mod worker;

use crate::processors::subprocess::is_portable_param_key;

use clap::{Parser, Subcommand};

/// docbatch - 容错的文档批处理引擎
#[derive(Parser)]
#[command(name = "docbatch")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Resilient parallel batch processing for local documents", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log filter (e.g. 'info', 'docbatch=debug'); RUST_LOG takes precedence
    #[arg(long, global = true, env = "DOCBATCH_LOG", default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "DOCBATCH_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Process every supported document under a directory
    Run(run::RunArgs),

    /// List the supported documents under a directory without processing them
    Scan(scan::ScanArgs),

    /// Process a single file and print a JSON reply (used by the process pool)
    #[command(hide = true)]
    Worker(worker::WorkerArgs),
}

/// 解析 `key=value` 形式的参数
///
/// 键限定为 `[a-z0-9_]+`：进程池经环境变量传参，其他字符无法原样还原。
pub fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    if !is_portable_param_key(key) {
        return Err(format!(
            "key '{}' may only contain lowercase letters, digits and '_'",
            key
        ));
    }
    Ok((key.to_string(), value.to_string()))
}
