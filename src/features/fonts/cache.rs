use axum::body::Bytes;
use futures_util::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

use super::source::FontSource;
use super::stylesheet::extract_font_url;
use crate::config::{FontFamilyConfig, FontsConfig};
use crate::error::UpstreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// 已加载的字体（加载后不可变）
#[derive(Debug, Clone)]
pub struct FontDescriptor {
    pub family: String,
    pub data: Bytes,
    pub weight: u16,
    pub style: FontStyle,
}

/// 需要获取的一个字体家族
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontRequest {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
    pub stylesheet_url: String,
}

impl FontRequest {
    pub fn from_config(fonts: &FontsConfig, family: &FontFamilyConfig) -> Self {
        Self {
            family: family.family.clone(),
            weight: family.weight,
            style: FontStyle::Normal,
            stylesheet_url: fonts.stylesheet_url(family),
        }
    }
}

/// 字体缓存句柄（随服务实例创建，克隆后共享同一份缓存）。
///
/// 首次成功获取后常驻，无淘汰；获取失败时保持为空，下一次请求重新获取。
/// 并发的未命中请求合并为同一次获取。
#[derive(Clone)]
pub struct FontCache {
    inner: Arc<FontCacheInner>,
}

struct FontCacheInner {
    fonts: OnceCell<Arc<[FontDescriptor]>>,
    source: Arc<dyn FontSource>,
    requests: Vec<FontRequest>,
}

impl FontCache {
    pub fn new(source: Arc<dyn FontSource>, requests: Vec<FontRequest>) -> Self {
        Self {
            inner: Arc::new(FontCacheInner {
                fonts: OnceCell::new(),
                source,
                requests,
            }),
        }
    }

    /// 按配置创建：衬线（标题）+ 无衬线（副标题）
    pub fn from_config(fonts: &FontsConfig, source: Arc<dyn FontSource>) -> Self {
        Self::new(
            source,
            vec![
                FontRequest::from_config(fonts, &fonts.serif),
                FontRequest::from_config(fonts, &fonts.sans),
            ],
        )
    }

    /// 当前缓存内容（不触发获取）
    pub fn cached(&self) -> Option<Arc<[FontDescriptor]>> {
        self.inner.fonts.get().cloned()
    }

    /// 获取字体：命中直接返回，未命中则请求上游并在全部成功后写入缓存
    pub async fn acquire(&self) -> Result<Arc<[FontDescriptor]>, UpstreamError> {
        self.inner
            .fonts
            .get_or_try_init(|| self.fetch_all())
            .await
            .cloned()
    }

    async fn fetch_all(&self) -> Result<Arc<[FontDescriptor]>, UpstreamError> {
        let t0 = Instant::now();
        let source = self.inner.source.as_ref();
        let requests = &self.inner.requests;

        let sheets = try_join_all(
            requests
                .iter()
                .map(|r| source.fetch_stylesheet(&r.stylesheet_url)),
        )
        .await?;

        let urls = requests
            .iter()
            .zip(&sheets)
            .map(|(req, css)| {
                extract_font_url(css).ok_or_else(|| {
                    UpstreamError::FontResolution(format!(
                        "{} 的样式表中没有 src: url(...)",
                        req.family
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let payloads = try_join_all(urls.iter().map(|url| source.fetch_binary(url))).await?;

        let fonts: Arc<[FontDescriptor]> = requests
            .iter()
            .zip(payloads)
            .map(|(req, data)| FontDescriptor {
                family: req.family.clone(),
                data,
                weight: req.weight,
                style: req.style,
            })
            .collect();

        tracing::info!(
            "字体缓存已填充: {} 个字体, 共 {} 字节, 耗时 {:?}",
            fonts.len(),
            fonts.iter().map(|f| f.data.len()).sum::<usize>(),
            t0.elapsed()
        );
        Ok(fonts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSource {
        stylesheet_calls: AtomicUsize,
        binary_calls: AtomicUsize,
        /// 前 N 次样式表请求返回无 src 的内容
        broken_stylesheets: AtomicUsize,
    }

    impl FontSource for FakeSource {
        fn fetch_stylesheet<'a>(
            &'a self,
            url: &'a str,
        ) -> BoxFuture<'a, Result<String, UpstreamError>> {
            async move {
                self.stylesheet_calls.fetch_add(1, Ordering::SeqCst);
                let broken = self
                    .broken_stylesheets
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if broken {
                    return Ok("/* quota exceeded */".to_string());
                }
                Ok(format!("@font-face {{ src: url(https://cdn.test/{}.ttf); }}", url.len()))
            }
            .boxed()
        }

        fn fetch_binary<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, UpstreamError>> {
            async move {
                self.binary_calls.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from(url.to_string()))
            }
            .boxed()
        }
    }

    fn cache_with(source: Arc<FakeSource>) -> FontCache {
        FontCache::from_config(&FontsConfig::default(), source)
    }

    #[tokio::test]
    async fn second_acquire_is_a_cache_hit() {
        let source = Arc::new(FakeSource::default());
        let cache = cache_with(source.clone());

        let first = cache.acquire().await.expect("first acquire");
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].family, "Instrument Serif");
        assert_eq!(first[1].family, "Inter");
        assert_eq!(first[1].weight, 500);
        assert_eq!(source.stylesheet_calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.binary_calls.load(Ordering::SeqCst), 2);

        let second = cache.acquire().await.expect("second acquire");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.stylesheet_calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.binary_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unexpected_stylesheet_fails_without_populating() {
        let source = Arc::new(FakeSource::default());
        source.broken_stylesheets.store(1, Ordering::SeqCst);
        let cache = cache_with(source.clone());

        let err = cache.acquire().await.expect_err("should fail");
        assert!(matches!(err, UpstreamError::FontResolution(_)));
        assert!(cache.cached().is_none());
        // 样式表解析失败时不应下载任何字体文件
        assert_eq!(source.binary_calls.load(Ordering::SeqCst), 0);

        // 下一次请求重新获取并成功
        let fonts = cache.acquire().await.expect("retry succeeds");
        assert_eq!(fonts.len(), 2);
        assert_eq!(source.stylesheet_calls.load(Ordering::SeqCst), 4);
        assert!(cache.cached().is_some());
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let source = Arc::new(FakeSource::default());
        let cache = cache_with(source.clone());

        let (a, b) = tokio::join!(cache.acquire(), cache.acquire());
        assert!(Arc::ptr_eq(&a.expect("a"), &b.expect("b")));
        assert_eq!(source.stylesheet_calls.load(Ordering::SeqCst), 2);
    }
}
