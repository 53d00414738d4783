//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。每个命令返回进程退出码。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `processors/`, `utils/`
//! - 子模块: run, scan, worker

pub mod run;
pub mod scan;
pub mod worker;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<i32> {
    match cmd {
        Commands::Run(args) => run::execute(args),
        Commands::Scan(args) => scan::execute(args),
        Commands::Worker(args) => worker::execute(args),
    }
}
