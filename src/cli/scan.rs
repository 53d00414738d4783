//! # scan 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/scan.rs`

use clap::Args;
use std::path::PathBuf;

/// scan 子命令参数
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan
    pub input: PathBuf,

    /// Only list these extensions (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub ext: Vec<String>,

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

    /// Also list every file in processing order
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
