use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{Request, StatusCode, header},
};
use futures_util::{FutureExt, future::BoxFuture};
use resvg::usvg::fontdb;
use site_backend::config::AppConfig;
use site_backend::error::UpstreamError;
use site_backend::features::assets::AssetStore;
use site_backend::features::fonts::FontSource;
use site_backend::{AppState, create_site_router};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tower::ServiceExt;

/// 记录调用次数的字体源；`broken` 为真时样式表缺少 `src: url(...)`
struct CountingSource {
    font: Bytes,
    broken: AtomicBool,
    stylesheet_calls: AtomicUsize,
    binary_calls: AtomicUsize,
}

impl CountingSource {
    fn new(font: Vec<u8>) -> Self {
        Self {
            font: Bytes::from(font),
            broken: AtomicBool::new(false),
            stylesheet_calls: AtomicUsize::new(0),
            binary_calls: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.stylesheet_calls.load(Ordering::SeqCst) + self.binary_calls.load(Ordering::SeqCst)
    }
}

impl FontSource for CountingSource {
    fn fetch_stylesheet<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, UpstreamError>> {
        async move {
            let n = self.stylesheet_calls.fetch_add(1, Ordering::SeqCst);
            if self.broken.load(Ordering::SeqCst) {
                return Ok("/* quota exceeded */".to_string());
            }
            assert!(url.contains("family="));
            Ok(format!(
                "@font-face {{ font-family: 'X'; src: url(https://fonts.test/{n}.ttf) format('truetype'); }}"
            ))
        }
        .boxed()
    }

    fn fetch_binary<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Bytes, UpstreamError>> {
        async move {
            self.binary_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.font.clone())
        }
        .boxed()
    }
}

/// 系统字体作为渲染用的字体数据；没有字体时测试直接失败
fn system_font_bytes() -> Vec<u8> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    db.faces()
        .find(|f| f.index == 0)
        .map(|f| f.id)
        .and_then(|id| db.with_face_data(id, |data, _| data.to_vec()))
        .expect("no system font found; install a TrueType font (e.g. fonts-dejavu-core)")
}

fn build_app(source: Arc<CountingSource>) -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("index.html"), "home").expect("write");
    let store = AssetStore::open(dir.path()).expect("open store");
    let state = AppState::new(AppConfig::default(), store, source);
    (dir, create_site_router(state))
}

async fn get_og(app: &Router) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri("/og.png").body(Body::empty()).unwrap())
        .await
        .expect("request /og.png")
}

#[tokio::test]
async fn og_image_is_deterministic_and_cached() {
    let font = system_font_bytes();
    let source = Arc::new(CountingSource::new(font));
    let (_dir, app) = build_app(source.clone());

    let first = get_og(&app).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(
        first.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=86400"
    );
    assert_eq!(first.headers().get("x-frame-options").unwrap(), "DENY");
    let first = to_bytes(first.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&first[..4], b"\x89PNG");

    // 两个家族：各一次样式表 + 一次字体文件
    let after_first = source.fetches();
    assert_eq!(after_first, 4);

    let second = get_og(&app).await;
    assert_eq!(second.status(), StatusCode::OK);
    let second = to_bytes(second.into_body(), usize::MAX).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.fetches(), after_first, "second call must be a cache hit");
}

#[tokio::test]
async fn broken_stylesheet_returns_500_and_next_request_retries() {
    let font = system_font_bytes();
    let source = Arc::new(CountingSource::new(font));
    source.broken.store(true, Ordering::SeqCst);
    let (_dir, app) = build_app(source.clone());

    let failed = get_og(&app).await;
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failed.headers().get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(source.binary_calls.load(Ordering::SeqCst), 0);

    source.broken.store(false, Ordering::SeqCst);
    let calls_before_retry = source.stylesheet_calls.load(Ordering::SeqCst);

    let ok = get_og(&app).await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert!(source.stylesheet_calls.load(Ordering::SeqCst) > calls_before_retry);
}

#[tokio::test]
async fn second_request_is_a_cache_hit_even_when_rendering_fails() {
    // 字体数据无法解析：渲染失败，但字体获取本身成功并写入缓存
    let source = Arc::new(CountingSource::new(b"not a font".to_vec()));
    let (_dir, app) = build_app(source.clone());

    let first = get_og(&app).await;
    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(source.fetches(), 4);

    let second = get_og(&app).await;
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(source.fetches(), 4, "fonts must not be fetched again");
}
