use axum::{
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};

use super::generator::render_sitemap;
use super::model::{SitemapEntry, discover_entries};
use crate::config::SitemapMode;
use crate::error::AppError;
use crate::state::AppState;

pub const SITEMAP_PATH: &str = "/sitemap.xml";

const SITEMAP_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const SITEMAP_CACHE_CONTROL: &str = "public, max-age=86400";

/// 按配置的模式收集条目
pub async fn collect_entries(state: &AppState) -> Result<Vec<SitemapEntry>, AppError> {
    match state.config.sitemap.mode {
        SitemapMode::Static => Ok(state
            .config
            .sitemap
            .entries
            .iter()
            .map(SitemapEntry::from)
            .collect()),
        SitemapMode::Discovery => discover_entries(&state.assets).await,
    }
}

/// `/sitemap.xml`
pub async fn sitemap(state: &AppState) -> Response {
    let entries = match collect_entries(state).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("sitemap 条目收集失败: {}", e);
            return e.into_response();
        }
    };
    tracing::debug!("sitemap 生成: {} 条", entries.len());

    let xml = render_sitemap(state.config.site.base_url_trimmed(), &entries);
    let mut res = xml.into_response();
    let headers = res.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(SITEMAP_CONTENT_TYPE),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(SITEMAP_CACHE_CONTROL),
    );
    res
}
