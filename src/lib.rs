//! # docbatch - 容错的文档批处理引擎
//!
//! 扫描目录中的文档，在有界工作池中并行执行处理回调，
//! 单个文件失败不影响其余文件，最后生成多格式报告。
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── batch/       (扫描、调度、失败处理、进度、编排)
//!   ├── processors/  (处理回调: 内置摘要 / 子进程)
//!   ├── report/      (报告聚合与渲染)
//!   ├── cli/         (命令行参数定义)
//!   ├── commands/    (命令执行逻辑)
//!   ├── utils/       (输出、进度条、日志)
//!   └── error.rs     (错误处理)
//! ```

pub mod batch;
pub mod cli;
pub mod commands;
pub mod error;
pub mod processors;
pub mod report;
pub mod utils;

pub use batch::{BatchConfig, BatchOutcome, BatchProcessor, RunStatus};
pub use error::{DocbatchError, Result};
pub use processors::{ErrorKind, JobError, Params, Payload, Processor};
