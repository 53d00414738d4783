//! # worker 命令实现
//!
//! 进程池的子进程端：用内置摘要处理器处理一个文件，
//! 把 `WorkerReply` 以单行 JSON 写到 stdout。处理失败也通过应答返回，
//! 退出码保持为 0；只有应答本身无法产生时才以非零退出。
//!
//! ## 依赖关系
//! - 使用 `cli/worker.rs` 定义的参数
//! - 使用 `processors/digest.rs`, `processors/subprocess.rs`

use crate::cli::worker::WorkerArgs;
use crate::error::Result;
use crate::processors::subprocess::params_from_env;
use crate::processors::{DigestProcessor, Params, Processor, WorkerReply};

use std::path::Path;

/// 执行 worker 命令
pub fn execute(args: WorkerArgs) -> Result<i32> {
    let params = collect_params(env_vars(), args.params);
    let processor = DigestProcessor::new()?;
    let reply = reply_for(&processor, &args.file, &params);
    println!("{}", serde_json::to_string(&reply)?);
    Ok(0)
}

/// 环境变量中的参数打底，`--param` 覆盖同名键
fn collect_params<I>(vars: I, overrides: Vec<(String, String)>) -> Params
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut params = params_from_env(vars);
    params.extend(overrides);
    params
}

fn reply_for(processor: &dyn Processor, file: &Path, params: &Params) -> WorkerReply {
    let result = processor.process(file, params);
    if let Err(err) = &result {
        tracing::debug!(file = %file.display(), kind = %err.kind, "worker job failed");
    }
    WorkerReply::from_result(&result)
}

/// 忽略非 UTF-8 的环境变量
fn env_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::ErrorKind;
    use tempfile::TempDir;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn test_cli_params_override_environment() {
        let vars = vec![
            pair("DOCBATCH_PARAM_LANG", "ja"),
            pair("DOCBATCH_PARAM_SENTENCES", "2"),
            pair("HOME", "/root"),
        ];
        let params = collect_params(vars, vec![pair("lang", "en")]);
        assert_eq!(params.len(), 2);
        assert_eq!(params["lang"], "en");
        assert_eq!(params["sentences"], "2");
    }

    #[test]
    fn test_reply_carries_digest() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "First sentence here. Second sentence here.").unwrap();

        let processor = DigestProcessor::new().unwrap();
        let reply = reply_for(&processor, &file, &Params::new());
        assert!(reply.ok);
        assert!(reply.kind.is_none());
        assert!(reply.output.unwrap().starts_with("# notes"));
    }

    #[test]
    fn test_missing_file_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let processor = DigestProcessor::new().unwrap();
        let reply = reply_for(&processor, &dir.path().join("gone.txt"), &Params::new());
        assert!(!reply.ok);
        assert_eq!(reply.kind, Some(ErrorKind::FileNotFound));

        let json = serde_json::to_string(&reply).unwrap();
        let back: WorkerReply = serde_json::from_str(&json).unwrap();
        let err = back.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFound);
    }
}
