//! # 日志初始化
//!
//! 基于 `tracing-subscriber` 的 fmt 层，输出到 stderr，
//! 避免与 stdout 上的结果行（以及 worker 的 JSON 回复）混在一起。
//!
//! 过滤优先级: `RUST_LOG` 环境变量 > `--log-level`。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `tracing-subscriber` crate

use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 重复调用（例如测试中）会被忽略。
pub fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    if let Err(err) = result {
        tracing::debug!(%err, "logging already initialized");
    }
}
