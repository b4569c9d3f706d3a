use chrono::{DateTime, NaiveDate, Utc};

use crate::config::SitemapEntryConfig;
use crate::error::AppError;
use crate::features::assets::{AssetStore, StoredFile};

pub const ROOT_PRIORITY: f32 = 1.0;
pub const PAGE_PRIORITY: f32 = 0.8;
pub const DISCOVERED_CHANGEFREQ: &str = "monthly";

/// sitemap 中的一条 URL
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// 站内路径（以 `/` 开头）
    pub path: String,
    pub lastmod: NaiveDate,
    pub changefreq: String,
    /// 取值范围 [0.0, 1.0]
    pub priority: f32,
}

impl From<&SitemapEntryConfig> for SitemapEntry {
    fn from(cfg: &SitemapEntryConfig) -> Self {
        Self {
            path: cfg.path.clone(),
            lastmod: cfg.lastmod,
            changefreq: cfg.changefreq.clone(),
            priority: cfg.priority.clamp(0.0, 1.0),
        }
    }
}

/// HTML 文件的相对路径 → 站内 URL 路径；非 HTML 返回 None。
///
/// `index.html` → `/`，`dir/index.html` → `/dir/`，`name.html` → `/name`
pub fn url_path_for(relative: &str) -> Option<String> {
    let stem = relative.strip_suffix(".html")?;
    if stem == "index" {
        return Some("/".to_string());
    }
    if let Some(dir) = stem.strip_suffix("/index") {
        return Some(format!("/{dir}/"));
    }
    Some(format!("/{stem}"))
}

fn entry_for(file: &StoredFile) -> Option<SitemapEntry> {
    let path = url_path_for(&file.relative)?;
    let priority = if path == "/" {
        ROOT_PRIORITY
    } else {
        PAGE_PRIORITY
    };
    Some(SitemapEntry {
        path,
        lastmod: DateTime::<Utc>::from(file.modified).date_naive(),
        changefreq: DISCOVERED_CHANGEFREQ.to_string(),
        priority,
    })
}

/// 扫描资源目录生成条目（每次调用都重新读取目录），按路径排序
pub async fn discover_entries(store: &AssetStore) -> Result<Vec<SitemapEntry>, AppError> {
    let files = store.list_files().await?;
    let mut entries: Vec<SitemapEntry> = files.iter().filter_map(entry_for).collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_paths_follow_filename_conventions() {
        assert_eq!(url_path_for("index.html").as_deref(), Some("/"));
        assert_eq!(url_path_for("blog/index.html").as_deref(), Some("/blog/"));
        assert_eq!(url_path_for("about.html").as_deref(), Some("/about"));
        assert_eq!(
            url_path_for("blog/first-post.html").as_deref(),
            Some("/blog/first-post")
        );
        assert_eq!(url_path_for("css/site.css"), None);
        assert_eq!(url_path_for("notes.htm"), None);
    }

    #[test]
    fn configured_priority_is_clamped() {
        let cfg = SitemapEntryConfig {
            path: "/".into(),
            lastmod: NaiveDate::from_ymd_opt(2024, 1, 2).expect("date"),
            changefreq: "yearly".into(),
            priority: 3.0,
        };
        assert_eq!(SitemapEntry::from(&cfg).priority, 1.0);
    }
}
