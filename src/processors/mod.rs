//! # 处理器模块
//!
//! 定义批处理引擎与外部处理逻辑之间的边界：
//! `Processor` 接收文件路径与参数，返回不透明的结果或一个带类型的 `JobError`。
//!
//! ## 子模块
//! - `digest`: 内置文本摘要处理器
//! - `subprocess`: 在子进程中执行作业（进程隔离）
//!
//! ## 依赖关系
//! - 被 `batch/` 与 `commands/` 使用
//! - 使用 `serde` 在 worker 协议中传递错误类型

pub mod digest;
pub mod subprocess;

pub use digest::DigestProcessor;
pub use subprocess::{SubprocessProcessor, WorkerReply};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// 作业参数（有序，便于复现）
pub type Params = BTreeMap<String, String>;

// ─────────────────────────────────────────────────────────────
// 错误类型
// ─────────────────────────────────────────────────────────────

/// 作业失败的封闭类型集合
///
/// 处理器必须从中选择一个；严重程度与类别完全由它决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    FileNotFound,
    PermissionDenied,
    IsADirectory,
    UnicodeDecode,
    PdfSyntax,
    Parse,
    Memory,
    OutOfMemory,
    Llm,
    Timeout,
    Connection,
    Os,
    System,
    Runtime,
    Interrupted,
    Other,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 16] = [
        ErrorKind::FileNotFound,
        ErrorKind::PermissionDenied,
        ErrorKind::IsADirectory,
        ErrorKind::UnicodeDecode,
        ErrorKind::PdfSyntax,
        ErrorKind::Parse,
        ErrorKind::Memory,
        ErrorKind::OutOfMemory,
        ErrorKind::Llm,
        ErrorKind::Timeout,
        ErrorKind::Connection,
        ErrorKind::Os,
        ErrorKind::System,
        ErrorKind::Runtime,
        ErrorKind::Interrupted,
        ErrorKind::Other,
    ];

    /// 报告中使用的类型名
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IsADirectory => "IsADirectory",
            ErrorKind::UnicodeDecode => "UnicodeDecode",
            ErrorKind::PdfSyntax => "PdfSyntax",
            ErrorKind::Parse => "Parse",
            ErrorKind::Memory => "Memory",
            ErrorKind::OutOfMemory => "OutOfMemory",
            ErrorKind::Llm => "Llm",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Connection => "Connection",
            ErrorKind::Os => "Os",
            ErrorKind::System => "System",
            ErrorKind::Runtime => "Runtime",
            ErrorKind::Interrupted => "Interrupted",
            ErrorKind::Other => "Other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单个作业的失败
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let kind = match err.kind() {
            Io::NotFound => ErrorKind::FileNotFound,
            Io::PermissionDenied => ErrorKind::PermissionDenied,
            Io::OutOfMemory => ErrorKind::OutOfMemory,
            Io::TimedOut => ErrorKind::Timeout,
            Io::ConnectionRefused
            | Io::ConnectionReset
            | Io::ConnectionAborted
            | Io::NotConnected => ErrorKind::Connection,
            Io::InvalidData => ErrorKind::Parse,
            _ => ErrorKind::Os,
        };
        JobError::new(kind, err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────
// 结果载荷
// ─────────────────────────────────────────────────────────────

/// 处理器返回的不透明结果
///
/// 引擎从不解析其结构，只在落盘和报告预览时按 UTF-8 宽松解码。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 宽松解码为文本（非法字节替换为 U+FFFD）
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload(bytes)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload(text.into_bytes())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload(text.as_bytes().to_vec())
    }
}

// ─────────────────────────────────────────────────────────────
// 处理器接口
// ─────────────────────────────────────────────────────────────

/// 单文件处理回调
///
/// 实现必须可跨线程共享；panic 由任务管理器捕获并记为失败。
pub trait Processor: Send + Sync {
    fn process(&self, path: &Path, params: &Params) -> Result<Payload, JobError>;
}

impl<F> Processor for F
where
    F: Fn(&Path, &Params) -> Result<Payload, JobError> + Send + Sync,
{
    fn process(&self, path: &Path, params: &Params) -> Result<Payload, JobError> {
        self(path, params)
    }
}
