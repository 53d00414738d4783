//! # worker 子命令 CLI 定义
//!
//! 由进程池以 `docbatch worker <FILE>` 的形式调用，参数经
//! `DOCBATCH_PARAM_*` 环境变量传入。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/worker.rs`

use clap::Args;
use std::path::PathBuf;

/// worker 子命令参数
#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// File to process
    pub file: PathBuf,

    /// Processor parameter as key=value; overrides the environment
    #[arg(long = "param", value_parser = super::parse_param)]
    pub params: Vec<(String, String)>,
}
