//! 静态资源目录（只读）。
//!
//! 请求路径先经 [`AssetStore::resolve`] 做词法归一化与根目录边界检查，
//! 之后的查找只会在已通过检查的路径上追加 `index.html` / `.html`。

use percent_encoding::percent_decode_str;
use std::ffi::OsString;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::time::SystemTime;

use crate::error::AppError;

/// 根路径请求对应的文档
pub const INDEX_DOCUMENT: &str = "index.html";

/// 通过边界检查的请求路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// 根目录下的绝对路径
    pub absolute: PathBuf,
    /// 原始请求以 `/` 结尾（目录语义）
    pub directory_hint: bool,
}

/// 读取到的静态文件
#[derive(Debug)]
pub struct Asset {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub modified: Option<SystemTime>,
}

/// 目录扫描结果中的单个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// 相对根目录的路径，使用 `/` 分隔
    pub relative: String,
    pub modified: SystemTime,
}

#[derive(Debug)]
pub struct AssetStore {
    root: PathBuf,
    root_str: String,
}

impl AssetStore {
    /// 打开资源目录（规范化为绝对路径，目录必须存在）
    pub fn open(root: impl AsRef<Path>) -> Result<Self, AppError> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|e| AppError::Io(format!("资源目录不可用 '{}': {e}", root.display())))?;
        if !canonical.is_dir() {
            return Err(AppError::Io(format!(
                "资源路径不是目录: {}",
                canonical.display()
            )));
        }
        let root_str = canonical.to_string_lossy().into_owned();
        Ok(Self {
            root: canonical,
            root_str,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 判断路径是否为根目录本身或其后代。
    ///
    /// 按字符串前缀比较，且前缀必须以路径分隔符结尾：根为 `/srv/public` 时
    /// `/srv/public-evil` 不属于根目录。
    pub fn contains(&self, candidate: &Path) -> bool {
        let candidate = candidate.to_string_lossy();
        let root = self.root_str.trim_end_matches(MAIN_SEPARATOR);
        candidate == self.root_str
            || candidate == root
            || candidate.starts_with(&format!("{root}{MAIN_SEPARATOR}"))
    }

    /// 将请求路径解析为根目录下的绝对路径。
    ///
    /// - 先做百分号解码（`%2f` 等同于 `/`）
    /// - `.`/空段忽略，`..` 回退一级（允许回退到根目录之外，随后由边界检查拒绝）
    /// - 含反斜杠或 NUL 的段视为穿越尝试
    /// - 解析结果为根目录本身时改写为 `index.html`
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedPath, AppError> {
        let decoded = percent_decode_str(request_path)
            .decode_utf8()
            .map_err(|_| AppError::NotFound)?;

        let mut resolved = self.root.clone();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    resolved.pop();
                }
                s if s.contains(['\\', '\0']) => {
                    tracing::warn!("拒绝可疑路径段: {:?}", request_path);
                    return Err(AppError::Forbidden(request_path.to_string()));
                }
                s => resolved.push(s),
            }
        }

        if !self.contains(&resolved) {
            tracing::warn!(
                "Path traversal attempt blocked: {} -> {}",
                request_path,
                resolved.display()
            );
            return Err(AppError::Forbidden(request_path.to_string()));
        }

        if resolved == self.root {
            resolved.push(INDEX_DOCUMENT);
            return Ok(ResolvedPath {
                absolute: resolved,
                directory_hint: false,
            });
        }

        Ok(ResolvedPath {
            absolute: resolved,
            directory_hint: decoded.ends_with('/'),
        })
    }

    /// 查找已解析路径对应的文件。
    ///
    /// 精确命中优先；否则尝试 `<path>/index.html`，无扩展名时再尝试 `<path>.html`。
    /// 文件不存在或位于隐藏路径（任一段以 `.` 开头）时返回 `Ok(None)`，
    /// 与 [`AssetStore::list_files`] 的可见范围一致。
    pub async fn lookup(&self, resolved: &ResolvedPath) -> Result<Option<Asset>, AppError> {
        if self.is_hidden(&resolved.absolute) {
            tracing::debug!("隐藏路径不对外提供: {}", resolved.absolute.display());
            return Ok(None);
        }
        for candidate in candidates(resolved) {
            let Ok(meta) = tokio::fs::metadata(&candidate).await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }

            // 词法检查之外再确认真实路径（符号链接）仍在根目录内
            let Ok(real) = tokio::fs::canonicalize(&candidate).await else {
                continue;
            };
            if !self.contains(&real) {
                tracing::warn!(
                    "Symlink escape blocked: {} -> {}",
                    candidate.display(),
                    real.display()
                );
                return Err(AppError::Forbidden(candidate.display().to_string()));
            }

            let bytes = tokio::fs::read(&candidate).await.map_err(|e| {
                tracing::error!("读取文件失败 '{}': {}", candidate.display(), e);
                AppError::from(e)
            })?;
            return Ok(Some(Asset {
                path: candidate,
                bytes,
                modified: meta.modified().ok(),
            }));
        }
        Ok(None)
    }

    /// 递归列出全部文件（跳过以 `.` 开头的文件与目录），按相对路径排序。
    pub async fn list_files(&self) -> Result<Vec<StoredFile>, AppError> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let modified = entry.metadata().await?.modified()?;
                    if let Some(relative) = self.relative_key(&path) {
                        files.push(StoredFile { relative, modified });
                    }
                }
            }
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(files)
    }

    fn is_hidden(&self, path: &Path) -> bool {
        path.strip_prefix(&self.root)
            .map(|rel| {
                rel.components()
                    .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
            })
            .unwrap_or(false)
    }

    fn relative_key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

fn candidates(resolved: &ResolvedPath) -> Vec<PathBuf> {
    let path = &resolved.absolute;
    if resolved.directory_hint {
        return vec![path.join(INDEX_DOCUMENT)];
    }

    let mut out = vec![path.clone(), path.join(INDEX_DOCUMENT)];
    if path.extension().is_none() {
        let mut with_html = OsString::from(path.as_os_str());
        with_html.push(".html");
        out.push(PathBuf::from(with_html));
    }
    out
}
