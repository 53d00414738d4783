//! # 子进程处理器
//!
//! 每个作业在独立的操作系统进程中执行，用于不受信任或 CPU 密集的处理逻辑：
//! 子进程崩溃只会让该作业失败，不会拖垮工作池。
//!
//! ## 协议
//! - 调用方式: `program args... <file>`，参数以 `DOCBATCH_PARAM_<KEY>` 环境变量传入
//! - 键必须是 `[a-z0-9_]+`（CLI 在解析 `--param` 时校验），这样往返映射不丢信息
//! - 成功退出时 stdout 优先按 `WorkerReply` JSON 解析，否则整体作为结果
//! - 非零退出或被信号终止记为 `Runtime` 错误
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 使用（`--pool process` 与 `--command`）
//! - `commands/worker.rs` 负责协议的另一端

use super::{ErrorKind, JobError, Params, Payload, Processor};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// 参数环境变量前缀
pub const PARAM_ENV_PREFIX: &str = "DOCBATCH_PARAM_";

/// worker 子命令写到 stdout 的应答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkerReply {
    pub fn from_result(result: &Result<Payload, JobError>) -> Self {
        match result {
            Ok(payload) => WorkerReply {
                ok: true,
                output: Some(payload.to_text().into_owned()),
                kind: None,
                message: None,
            },
            Err(err) => WorkerReply {
                ok: false,
                output: None,
                kind: Some(err.kind),
                message: Some(err.message.clone()),
            },
        }
    }

    pub fn into_result(self) -> Result<Payload, JobError> {
        if self.ok {
            Ok(Payload::from(self.output.unwrap_or_default()))
        } else {
            Err(JobError::new(
                self.kind.unwrap_or(ErrorKind::Other),
                self.message
                    .unwrap_or_else(|| "worker reported failure".to_string()),
            ))
        }
    }
}

/// 在子进程中执行作业的处理器
#[derive(Debug, Clone)]
pub struct SubprocessProcessor {
    program: PathBuf,
    args: Vec<String>,
}

impl SubprocessProcessor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// 追加固定参数（位于文件路径之前）
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// 重新执行当前程序的 `worker` 子命令
    pub fn current_exe_worker() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        Ok(Self::new(exe).with_args(["worker"]))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Processor for SubprocessProcessor {
    fn process(&self, path: &Path, params: &Params) -> Result<Payload, JobError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in params {
            command.env(param_env_name(key), value);
        }

        let output = command.output().map_err(|e| {
            let mut err = JobError::from(e);
            err.message = format!(
                "failed to spawn '{}': {}",
                self.program.display(),
                err.message
            );
            err
        })?;

        if output.status.success() {
            return match serde_json::from_slice::<WorkerReply>(&output.stdout) {
                Ok(reply) => reply.into_result(),
                Err(_) => Ok(Payload::from(output.stdout)),
            };
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(JobError::new(
            ErrorKind::Runtime,
            format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            ),
        ))
    }
}

/// 参数键对应的环境变量名
///
/// 字母转大写，其他字符一律变成 `_`；worker 端再整体转小写。
/// 因此只有 `[a-z0-9_]` 组成的键能原样还原，`max-words` 会变成 `max_words`。
pub fn param_env_name(key: &str) -> String {
    let key: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}{}", PARAM_ENV_PREFIX, key)
}

/// 参数键是否能经环境变量原样往返
pub fn is_portable_param_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// 从环境变量还原参数（worker 端使用）
pub fn params_from_env<I>(vars: I) -> Params
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            name.strip_prefix(PARAM_ENV_PREFIX)
                .map(|key| (key.to_lowercase(), value))
        })
        .collect()
}
