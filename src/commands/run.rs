//! # run 命令实现
//!
//! 组装处理器与配置，交给 `BatchProcessor` 执行，并把运行状态映射为退出码。
//!
//! ## 功能
//! - `--pool thread`: 进程内的内置摘要处理器
//! - `--pool process`: 每个文件重新执行本程序的 `worker` 子命令
//! - `--command <prog>`: 每个文件执行外部程序（任何池类型）
//!
//! ## 退出码
//! - 0: 完成（包括没有可处理的文件）
//! - 2: 被提前停止，结果不完整
//! - 1: 运行出错
//!
//! ## 依赖关系
//! - 使用 `cli/run.rs` 定义的参数
//! - 使用 `batch/processor.rs`, `processors/`, `utils/output.rs`

use super::scan::scan_options;
use crate::batch::{BatchConfig, BatchOutcome, BatchProcessor, PoolKind, RunStatus};
use crate::cli::run::{PoolMode, RunArgs};
use crate::error::{DocbatchError, Result};
use crate::processors::{DigestProcessor, Params, Processor, SubprocessProcessor};
use crate::utils::output;

use std::path::Path;
use std::sync::Arc;

/// 执行 run 命令
pub fn execute(args: RunArgs) -> Result<i32> {
    if !args.quiet {
        output::print_header("Batch Document Processing");
    }

    validate_language(&args.lang)?;

    let pool = match args.pool {
        PoolMode::Thread => PoolKind::Thread,
        PoolMode::Process => PoolKind::Process,
    };
    let processor = build_processor(pool, args.command.as_deref())?;

    let config = BatchConfig {
        workers: args.workers.unwrap_or(0),
        pool,
        max_consecutive_errors: args.max_consecutive_errors,
        continue_on_error: !args.stop_on_error,
        preview_chars: args.preview_chars,
        output_dir: args.output,
        language: args.lang,
        extensions: args.ext,
        scan: scan_options(
            args.no_recursive,
            args.include_hidden,
            args.exclude,
            args.no_size_limits,
        ),
        quiet: args.quiet,
    };
    let params: Params = args.params.into_iter().collect();

    let outcome = BatchProcessor::new(config).process_directory(&args.input, processor, params);
    print_outcome(&outcome, &args.input);
    Ok(exit_code(outcome.status))
}

fn build_processor(pool: PoolKind, command: Option<&Path>) -> Result<Arc<dyn Processor>> {
    if let Some(program) = command {
        tracing::info!(program = %program.display(), "using external command per file");
        return Ok(Arc::new(SubprocessProcessor::new(program)));
    }
    match pool {
        PoolKind::Thread => Ok(Arc::new(DigestProcessor::new()?)),
        PoolKind::Process => {
            let worker = SubprocessProcessor::current_exe_worker().map_err(|e| {
                DocbatchError::Other(format!("Cannot locate the current executable: {}", e))
            })?;
            tracing::info!(
                program = %worker.program().display(),
                "using worker subprocess per file"
            );
            Ok(Arc::new(worker))
        }
    }
}

/// 语言标签会出现在产物文件名中
fn validate_language(lang: &str) -> Result<()> {
    let valid = !lang.is_empty()
        && lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DocbatchError::InvalidArgument(format!(
            "language tag '{}' may only contain letters, digits, '-' and '_'",
            lang
        )))
    }
}

/// 运行状态 → 进程退出码
pub fn exit_code(status: RunStatus) -> i32 {
    match status {
        RunStatus::Completed | RunStatus::NoFiles | RunStatus::NoMatchingFiles => 0,
        RunStatus::Partial => 2,
        RunStatus::Error => 1,
    }
}

fn print_outcome(outcome: &BatchOutcome, input: &Path) {
    match outcome.status {
        RunStatus::Completed => output::print_done(&format!(
            "Processed {} files: {} succeeded, {} failed ({:.1}%) in {:.1}s",
            outcome.total_files,
            outcome.succeeded,
            outcome.failed,
            outcome.success_rate,
            outcome.processing_time.as_secs_f64()
        )),
        RunStatus::Partial => output::print_warning(&format!(
            "Stopped early after {} of {} files: {} succeeded, {} failed",
            outcome.results.len(),
            outcome.total_files,
            outcome.succeeded,
            outcome.failed
        )),
        RunStatus::NoFiles => output::print_warning(&format!(
            "No supported files found in {}",
            input.display()
        )),
        RunStatus::NoMatchingFiles => {
            output::print_warning("No files match the requested extensions")
        }
        RunStatus::Error => output::print_error(&format!(
            "Batch failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        )),
    }

    if !outcome.artifacts.is_empty() {
        output::print_info(&format!("{} summaries written", outcome.artifacts.len()));
    }
    if let Some(paths) = &outcome.report_paths {
        for (label, path) in paths.entries() {
            output::print_saved(label, path);
        }
    }
    output::print_info(&format!("Session: {}", outcome.session_id));
}
