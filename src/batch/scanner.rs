//! # 文件扫描器
//!
//! 递归遍历输入目录，按支持的文件类型生成不可变的 `FileDescriptor`。
//!
//! ## 功能
//! - 跳过隐藏目录/文件及 glob 排除项
//! - 扩展名白名单（大小写不敏感）
//! - 文件大小上下限，超限文件记为 `ScanIssue`
//! - 无法读取的条目只记录，不中止扫描
//!
//! ## 依赖关系
//! - 被 `batch/processor.rs` 与 `commands/scan.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配排除模式

use crate::error::{DocbatchError, Result};

use glob::Pattern;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const MIB: u64 = 1024 * 1024;

/// 内置支持的文件类型: (扩展名, 类型名, MIME)
pub const SUPPORTED_TYPES: &[(&str, &str, &str)] = &[
    ("pdf", "PDF Document", "application/pdf"),
    ("txt", "Text File", "text/plain"),
    ("html", "HTML Document", "text/html"),
    ("htm", "HTML Document", "text/html"),
    ("md", "Markdown Document", "text/markdown"),
    (
        "docx",
        "Word Document",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("json", "JSON Document", "application/json"),
    ("rtf", "Rich Text Format", "application/rtf"),
];

/// 允许列表里有、内置表里没有的扩展名
const UNKNOWN_TYPE: (&str, &str) = ("Unknown", "application/octet-stream");

/// 规范化扩展名（去掉前导点并转小写）
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

fn lookup_type(ext: &str) -> Option<(&'static str, &'static str)> {
    SUPPORTED_TYPES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, file_type, mime)| (*file_type, *mime))
}

// ─────────────────────────────────────────────────────────────
// 数据类型
// ─────────────────────────────────────────────────────────────

/// 扫描得到的文件描述（创建后不再修改）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    path: PathBuf,
    size: u64,
    file_type: String,
    mime_type: String,
}

impl FileDescriptor {
    pub fn new(
        path: impl Into<PathBuf>,
        size: u64,
        file_type: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            file_type: file_type.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 字节大小
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn size_mb(&self) -> f64 {
        self.size as f64 / MIB as f64
    }

    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// 小写扩展名（不含点）
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default()
    }
}

/// 被跳过的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub reason: String,
}

/// 文件大小限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub min_bytes: u64,
    /// JSON 文件较小也可能有效，单独设置下限
    pub min_json_bytes: u64,
    pub max_bytes: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            min_bytes: 1024,
            min_json_bytes: 50,
            max_bytes: 100 * MIB,
        }
    }
}

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub recursive: bool,
    pub include_hidden: bool,
    pub exclude: Vec<String>,
    /// `None` 表示不限制大小
    pub size_limits: Option<SizeLimits>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            include_hidden: false,
            exclude: Vec::new(),
            size_limits: Some(SizeLimits::default()),
        }
    }
}

/// 按类型汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeStats {
    pub count: usize,
    pub bytes: u64,
}

/// 扫描结果
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub descriptors: Vec<FileDescriptor>,
    pub issues: Vec<ScanIssue>,
}

impl ScanOutcome {
    pub fn total_bytes(&self) -> u64 {
        self.descriptors.iter().map(|d| d.size()).sum()
    }

    pub fn by_type(&self) -> BTreeMap<String, TypeStats> {
        let mut grouped: BTreeMap<String, TypeStats> = BTreeMap::new();
        for d in &self.descriptors {
            let entry = grouped.entry(d.file_type().to_string()).or_default();
            entry.count += 1;
            entry.bytes += d.size();
        }
        grouped
    }

    /// 小文件优先的处理队列
    pub fn processing_queue(&self) -> Vec<FileDescriptor> {
        let mut queue = self.descriptors.clone();
        queue.sort_by_key(|d| d.size());
        queue
    }
}

// ─────────────────────────────────────────────────────────────
// 扫描器
// ─────────────────────────────────────────────────────────────

/// 文件扫描器
pub struct FileScanner {
    /// 根目录
    root: PathBuf,
    /// 允许的扩展名（已规范化）
    extensions: Vec<String>,
    /// 是否递归
    recursive: bool,
    /// 是否包含隐藏条目
    include_hidden: bool,
    /// 排除模式
    exclude: Vec<Pattern>,
    /// 大小限制
    size_limits: Option<SizeLimits>,
}

impl FileScanner {
    /// 创建新的扫描器（默认接受全部内置类型）
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = ScanOptions::default();
        Self {
            root: root.into(),
            extensions: SUPPORTED_TYPES
                .iter()
                .map(|(e, _, _)| e.to_string())
                .collect(),
            recursive: defaults.recursive,
            include_hidden: defaults.include_hidden,
            exclude: Vec::new(),
            size_limits: defaults.size_limits,
        }
    }

    /// 按选项创建
    pub fn with_options(root: impl Into<PathBuf>, options: &ScanOptions) -> Result<Self> {
        let mut scanner = Self::new(root)
            .recursive(options.recursive)
            .include_hidden(options.include_hidden)
            .size_limits(options.size_limits);
        for pattern in &options.exclude {
            scanner = scanner.exclude(pattern)?;
        }
        Ok(scanner)
    }

    /// 收窄扩展名白名单（仅保留内置类型中的交集）
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        let wanted: Vec<String> = extensions
            .iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        if !wanted.is_empty() {
            self.extensions.retain(|e| wanted.contains(e));
        }
        self
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// 添加排除模式（匹配目录名或文件名）
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        let compiled = Pattern::new(pattern).map_err(|e| DocbatchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.exclude.push(compiled);
        Ok(self)
    }

    pub fn size_limits(mut self, limits: Option<SizeLimits>) -> Self {
        self.size_limits = limits;
        self
    }

    /// 执行扫描
    pub fn scan(&self) -> Result<ScanOutcome> {
        if !self.root.exists() {
            return Err(DocbatchError::DirectoryNotFound {
                path: self.root.display().to_string(),
            });
        }
        if !self.root.is_dir() {
            return Err(DocbatchError::NotADirectory {
                path: self.root.display().to_string(),
            });
        }

        let root = fs::canonicalize(&self.root).map_err(|e| DocbatchError::FileReadError {
            path: self.root.display().to_string(),
            source: e,
        })?;

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut outcome = ScanOutcome::default();

        let walker = WalkDir::new(&root)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_skipped(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.clone());
                    tracing::debug!(
                        path = %path.display(),
                        error = %err,
                        "unreadable entry skipped"
                    );
                    outcome.issues.push(ScanIssue {
                        path,
                        reason: format!("Unreadable entry: {}", err),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.describe(&entry) {
                Ok(Some(descriptor)) => outcome.descriptors.push(descriptor),
                Ok(None) => {}
                Err(issue) => outcome.issues.push(issue),
            }
        }

        outcome.descriptors.sort_by(|a, b| a.path().cmp(b.path()));

        tracing::info!(
            root = %root.display(),
            files = outcome.descriptors.len(),
            issues = outcome.issues.len(),
            "scan finished"
        );

        Ok(outcome)
    }

    /// 检查扩展名是否在白名单中
    pub fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .map(|ext| self.extensions.contains(&ext))
            .unwrap_or(false)
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if !self.include_hidden && name.starts_with('.') {
            return true;
        }
        self.exclude.iter().any(|p| p.matches(&name))
    }

    /// 生成描述；不支持的类型返回 `Ok(None)`，超限或不可读返回 `Err(issue)`
    fn describe(&self, entry: &DirEntry) -> std::result::Result<Option<FileDescriptor>, ScanIssue> {
        let path = entry.path();
        if !self.accepts_extension(path) {
            return Ok(None);
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        let size = entry
            .metadata()
            .map_err(|e| ScanIssue {
                path: path.to_path_buf(),
                reason: format!("Processing error: {}", e),
            })?
            .len();

        if let Some(limits) = self.size_limits {
            let min = if ext == "json" {
                limits.min_json_bytes
            } else {
                limits.min_bytes
            };
            if size < min {
                return Err(ScanIssue {
                    path: path.to_path_buf(),
                    reason: format!("File too small: {} bytes", size),
                });
            }
            if size > limits.max_bytes {
                return Err(ScanIssue {
                    path: path.to_path_buf(),
                    reason: format!("File too large: {:.1} MB", size as f64 / MIB as f64),
                });
            }
        }

        let (file_type, mime) = lookup_type(&ext).unwrap_or(UNKNOWN_TYPE);
        Ok(Some(FileDescriptor::new(path, size, file_type, mime)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, size: usize) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![b'a'; size]).unwrap();
    }

    fn names(outcome: &ScanOutcome) -> Vec<String> {
        outcome
            .descriptors
            .iter()
            .map(|d| d.path().file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_filters_supported_types() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.txt", 2048);
        touch(dir.path(), "b.PDF", 2048);
        touch(dir.path(), "c.exe", 2048);
        touch(dir.path(), "sub/d.md", 2048);

        let outcome = FileScanner::new(dir.path()).scan().unwrap();
        assert_eq!(names(&outcome), vec!["a.txt", "b.PDF", "d.md"]);
        assert!(outcome.descriptors.iter().all(|d| d.path().is_absolute()));
        assert_eq!(outcome.descriptors[1].mime_type(), "application/pdf");
        assert_eq!(outcome.total_bytes(), 3 * 2048);
    }

    #[test]
    fn test_scan_skips_hidden_and_excluded() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".hidden/a.txt", 2048);
        touch(dir.path(), ".secret.txt", 2048);
        touch(dir.path(), "node_modules/b.txt", 2048);
        touch(dir.path(), "keep/c.txt", 2048);

        let outcome = FileScanner::new(dir.path())
            .exclude("node_*")
            .unwrap()
            .scan()
            .unwrap();
        assert_eq!(names(&outcome), vec!["c.txt"]);

        let with_hidden = FileScanner::new(dir.path())
            .include_hidden(true)
            .scan()
            .unwrap();
        assert_eq!(with_hidden.descriptors.len(), 4);
    }

    #[test]
    fn test_scan_non_recursive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "top.txt", 2048);
        touch(dir.path(), "nested/deep.txt", 2048);

        let outcome = FileScanner::new(dir.path())
            .recursive(false)
            .scan()
            .unwrap();
        assert_eq!(names(&outcome), vec!["top.txt"]);
    }

    #[test]
    fn test_scan_size_limits_record_issues() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "tiny.txt", 10);
        touch(dir.path(), "small.json", 60);
        touch(dir.path(), "ok.txt", 4096);

        let outcome = FileScanner::new(dir.path()).scan().unwrap();
        assert_eq!(names(&outcome), vec!["ok.txt", "small.json"]);
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].reason.contains("too small"));

        let unlimited = FileScanner::new(dir.path())
            .size_limits(None)
            .scan()
            .unwrap();
        assert_eq!(unlimited.descriptors.len(), 3);
        assert!(unlimited.issues.is_empty());
    }

    #[test]
    fn test_allow_list_narrows_types() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.txt", 2048);
        touch(dir.path(), "b.md", 2048);
        touch(dir.path(), "c.html", 2048);

        let outcome = FileScanner::new(dir.path())
            .with_extensions(&[".MD", "html", "xyz"])
            .scan()
            .unwrap();
        assert_eq!(names(&outcome), vec!["b.md", "c.html"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_recorded_not_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "ok.txt", 2048);
        touch(dir.path(), "locked/inner.txt", 2048);
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root 不受权限位限制，此时无法构造不可读目录
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let outcome = FileScanner::new(dir.path()).scan();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let outcome = outcome.unwrap();
        assert_eq!(names(&outcome), vec!["ok.txt"]);
        let issue = outcome
            .issues
            .iter()
            .find(|issue| issue.path.ends_with("locked"))
            .unwrap();
        assert!(issue.reason.starts_with("Unreadable entry"));
    }

    #[test]
    fn test_missing_root_is_error() {
        let err = FileScanner::new("/no/such/docbatch/root")
            .scan()
            .unwrap_err();
        assert!(matches!(err, DocbatchError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_by_type_and_queue() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "big.txt", 8192);
        touch(dir.path(), "small.txt", 2048);
        touch(dir.path(), "page.htm", 4096);

        let outcome = FileScanner::new(dir.path()).scan().unwrap();
        let grouped = outcome.by_type();
        let text = &grouped["Text File"];
        assert_eq!((text.count, text.bytes), (2, 10240));
        assert_eq!(grouped["HTML Document"].count, 1);

        let queue = outcome.processing_queue();
        assert_eq!(queue[0].size(), 2048);
        assert_eq!(queue[2].size(), 8192);
    }
}
