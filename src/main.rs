//! # docbatch 命令行入口
//!
//! ## 子命令
//! - `run`  - 批量处理目录中的文档并生成报告
//! - `scan` - 只扫描，按类型汇总
//! - `worker` - 进程池内部使用（隐藏）

use clap::Parser;
use docbatch::cli::Cli;
use docbatch::{commands, utils};

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    utils::logging::init_logging(&cli.log_level, cli.log_json);

    match commands::run(cli.command) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            utils::output::print_error(&format!("{}", e));
            std::process::exit(1);
        }
    }
}
