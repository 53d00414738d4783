//! # 内置摘要处理器
//!
//! 在没有外部摘要服务时使用：抽取文本、规整空白，
//! 输出包含统计信息和前几句内容的 Markdown 摘要。
//!
//! ## 功能
//! - HTML 去标签（含 script/style 块）
//! - RTF 去控制字
//! - 中日文句末标点也作为句子边界
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 与 `commands/worker.rs` 使用
//! - 使用 `regex` 进行文本清洗

use super::{ErrorKind, JobError, Params, Payload, Processor};
use crate::error::{DocbatchError, Result};

use regex::Regex;
use std::fs;
use std::path::Path;

/// 默认摘要句数
pub const DEFAULT_SENTENCES: usize = 3;

/// 默认输出语言标记
pub const DEFAULT_LANG: &str = "ja";

/// 内置摘要处理器
pub struct DigestProcessor {
    markup_blocks: Regex,
    tags: Regex,
    rtf_controls: Regex,
    whitespace: Regex,
    sentences: Regex,
}

impl DigestProcessor {
    /// 创建处理器（预编译所有正则）
    pub fn new() -> Result<Self> {
        Ok(Self {
            markup_blocks: compile(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>")?,
            tags: compile(r"(?s)<[^>]*>")?,
            rtf_controls: compile(r"\\[a-zA-Z]+-?\d* ?|[{}]")?,
            whitespace: compile(r"\s+")?,
            sentences: compile(r"[^.!?。！？]+[.!?。！？]*")?,
        })
    }

    /// 按扩展名抽取纯文本
    fn extract_text(&self, path: &Path, bytes: Vec<u8>) -> std::result::Result<String, JobError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let raw = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                let (kind, what) = match ext.as_str() {
                    "pdf" => (ErrorKind::PdfSyntax, "PDF has no extractable text layer"),
                    "docx" => (ErrorKind::Parse, "Word container is not plain text"),
                    _ => (ErrorKind::UnicodeDecode, "invalid UTF-8 sequence"),
                };
                return Err(JobError::new(kind, format!("{}: {}", display_name(path), what)));
            }
        };

        let text = match ext.as_str() {
            "html" | "htm" => {
                let without_blocks = self.markup_blocks.replace_all(&raw, " ");
                self.tags.replace_all(&without_blocks, " ").into_owned()
            }
            "rtf" => self.rtf_controls.replace_all(&raw, "").into_owned(),
            _ => raw,
        };

        Ok(text)
    }

    /// 生成 Markdown 摘要
    fn render(&self, path: &Path, text: &str, sentence_count: usize, lang: &str) -> String {
        let normalized = self.whitespace.replace_all(text.trim(), " ");
        let words = normalized.split_whitespace().count();
        let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
        let chars = normalized.chars().count();

        let lead: Vec<&str> = self
            .sentences
            .find_iter(&normalized)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .take(sentence_count)
            .collect();

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());

        format!(
            "# {}\n\n- Source: {}\n- Words: {} | Lines: {} | Characters: {}\n- Language: {}\n\n## Digest\n\n{}\n",
            title,
            display_name(path),
            words,
            lines,
            chars,
            lang,
            lead.join(" ")
        )
    }
}

impl Processor for DigestProcessor {
    fn process(&self, path: &Path, params: &Params) -> std::result::Result<Payload, JobError> {
        let bytes = fs::read(path)?;
        let text = self.extract_text(path, bytes)?;

        if text.trim().is_empty() {
            return Err(JobError::new(
                ErrorKind::Parse,
                format!("{}: no extractable text", display_name(path)),
            ));
        }

        let sentence_count = match params.get("sentences") {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                JobError::new(
                    ErrorKind::Other,
                    format!("invalid 'sentences' parameter: {}", raw),
                )
            })?,
            None => DEFAULT_SENTENCES,
        };
        let lang = params
            .get("lang")
            .map(String::as_str)
            .unwrap_or(DEFAULT_LANG);

        Ok(Payload::from(self.render(path, &text, sentence_count, lang)))
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| DocbatchError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_digest_plain_text() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "notes.txt",
            b"First sentence here. Second one!\n\nThird? Fourth sentence.",
        );
        let processor = DigestProcessor::new().unwrap();
        let mut params = Params::new();
        params.insert("sentences".into(), "2".into());

        let payload = processor.process(&path, &params).unwrap();
        let out = payload.to_text();
        assert!(out.starts_with("# notes\n"));
        assert!(out.contains("First sentence here. Second one!"));
        assert!(!out.contains("Third?"));
        assert!(out.contains("Words: 8"));
        assert!(out.contains("Language: ja"));
    }

    #[test]
    fn test_digest_strips_html() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "page.html",
            b"<html><head><style>p { color: red; }</style></head><body><p>Hello world.</p></body></html>",
        );
        let processor = DigestProcessor::new().unwrap();
        let payload = processor.process(&path, &Params::new()).unwrap();
        let out = payload.to_text();
        assert!(out.contains("Hello world."));
        assert!(!out.contains("color"));
        assert!(!out.contains("<p>"));
    }

    #[test]
    fn test_digest_japanese_sentences() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "jp.md", "最初の文です。次の文です。最後。".as_bytes());
        let processor = DigestProcessor::new().unwrap();
        let mut params = Params::new();
        params.insert("sentences".into(), "1".into());
        let payload = processor.process(&path, &params).unwrap();
        let out = payload.to_text();
        assert!(out.contains("最初の文です。"));
        assert!(!out.contains("次の文です。"));
    }

    #[test]
    fn test_digest_binary_pdf_fails_with_pdf_syntax() {
        let dir = TempDir::new().unwrap();
        let bytes = [0x25, 0x50, 0x44, 0x46, 0xff, 0xfe, 0x00];
        let path = write(&dir, "scan.pdf", &bytes);
        let processor = DigestProcessor::new().unwrap();
        let err = processor.process(&path, &Params::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PdfSyntax);
    }

    #[test]
    fn test_digest_missing_file() {
        let processor = DigestProcessor::new().unwrap();
        let err = processor
            .process(Path::new("/definitely/not/here.txt"), &Params::new())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFound);
    }

    #[test]
    fn test_digest_empty_text_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blank.txt", b"   \n\n  ");
        let processor = DigestProcessor::new().unwrap();
        let err = processor.process(&path, &Params::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }
}
