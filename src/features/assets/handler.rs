use axum::{
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::time::SystemTime;

use super::mime::content_type_for;
use super::store::{AssetStore, ResolvedPath};
use crate::error::AppError;

/// 静态资源处理：命中则返回文件内容，否则 404。
pub async fn serve_asset(store: &AssetStore, resolved: &ResolvedPath) -> Result<Response, AppError> {
    let asset = store.lookup(resolved).await?.ok_or(AppError::NotFound)?;

    let content_type = content_type_for(&asset.path);
    let mut res = asset.bytes.into_response();
    let headers = res.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Some(value) = asset.modified.and_then(last_modified_value) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    Ok(res)
}

/// IMF-fixdate 格式，例如 `Sun, 06 Nov 1994 08:49:37 GMT`
fn last_modified_value(modified: SystemTime) -> Option<HeaderValue> {
    let formatted = DateTime::<Utc>::from(modified)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    HeaderValue::from_str(&formatted).ok()
}
