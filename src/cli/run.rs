//! # run 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/run.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 工作池类型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PoolMode {
    /// In-process worker threads
    Thread,
    /// One child process per file
    Process,
}

/// run 子命令参数
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory containing the documents
    pub input: PathBuf,

    /// Number of parallel workers (default: logical cores - 2, at least 1)
    #[arg(short = 'j', long, env = "DOCBATCH_WORKERS")]
    pub workers: Option<usize>,

    /// Worker pool type
    #[arg(long, value_enum, env = "DOCBATCH_POOL", default_value = "thread")]
    pub pool: PoolMode,

    /// Only process these extensions (comma-separated, e.g. 'pdf,txt')
    #[arg(short, long, value_delimiter = ',')]
    pub ext: Vec<String>,

    /// Output directory for artifacts and reports
    #[arg(short, long, env = "DOCBATCH_OUTPUT", default_value = "output/batch")]
    pub output: PathBuf,

    /// Language tag for artifacts and the summarizer
    #[arg(long, env = "DOCBATCH_LANG", default_value = "ja")]
    pub lang: String,

    /// Stop after this many consecutive failures
    #[arg(long, env = "DOCBATCH_MAX_CONSECUTIVE_ERRORS", default_value_t = 5)]
    pub max_consecutive_errors: usize,

    /// Stop at the first non-critical failure
    #[arg(long, default_value_t = false)]
    pub stop_on_error: bool,

    /// Characters of each result kept in the report preview
    #[arg(long, env = "DOCBATCH_PREVIEW_CHARS", default_value_t = 100)]
    pub preview_chars: usize,

    // ─────────────────────────────────────────────────────────────
    // Scan options
    // ─────────────────────────────────────────────────────────────
    /// Only scan the top-level directory
    #[arg(long, default_value_t = false)]
    pub no_recursive: bool,

    /// Include hidden files and directories
    #[arg(long, default_value_t = false)]
    pub include_hidden: bool,

    /// Exclude paths matching a glob (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Accept files of any size
    #[arg(long, default_value_t = false)]
    pub no_size_limits: bool,

    // ─────────────────────────────────────────────────────────────
    // Processor options
    // ─────────────────────────────────────────────────────────────
    /// Extra processor parameter as key=value (repeatable)
    #[arg(long = "param", value_parser = super::parse_param)]
    pub params: Vec<(String, String)>,

    /// External program run once per file instead of the built-in summarizer
    #[arg(long)]
    pub command: Option<PathBuf>,

    /// Hide the progress bar and summary table
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}
