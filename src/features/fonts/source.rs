use axum::body::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::Client;

use crate::error::UpstreamError;

/// 字体出站请求的抽象：样式表（文本）与字体文件（二进制）。
pub trait FontSource: Send + Sync {
    fn fetch_stylesheet<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, UpstreamError>>;

    fn fetch_binary<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, UpstreamError>>;
}

/// 基于 reqwest 的实现
#[derive(Clone)]
pub struct HttpFontSource {
    client: Client,
}

impl HttpFontSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl FontSource for HttpFontSource {
    fn fetch_stylesheet<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, UpstreamError>> {
        async move {
            tracing::debug!("请求字体样式表: {}", url);
            let resp = self.client.get(url).send().await?.error_for_status()?;
            Ok(resp.text().await?)
        }
        .boxed()
    }

    fn fetch_binary<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, UpstreamError>> {
        async move {
            tracing::debug!("下载字体文件: {}", url);
            let resp = self.client.get(url).send().await?.error_for_status()?;
            Ok(resp.bytes().await?)
        }
        .boxed()
    }
}
