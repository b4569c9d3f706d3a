pub mod gates;
pub mod headers;

use axum::Router;
use tower_http::compression::CompressionLayer;

pub use gates::{Flow, GATE_ORDER, Gate, GateContext, MAX_PATH_LEN, Route, dispatch, run_gates};
pub use headers::{SECURITY_HEADERS, security_header_layers};

use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 构建站点路由：所有请求进入关卡链，外层依次套上压缩、request_id 与安全头
pub fn create_site_router(state: AppState) -> Router {
    let mut app = Router::new().fallback(dispatch).with_state(state);

    // 明确排除图片等不值得压缩的响应
    app = app.layer(CompressionLayer::new().compress_when(compression_predicate()));
    app = app.layer(axum::middleware::from_fn(request_id_middleware));

    // 安全头放在最外层，错误响应同样覆盖
    for layer in security_header_layers() {
        app = app.layer(layer);
    }
    app
}

fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    // 保留默认的最小大小阈值（32B）
    SizeAbove::default()
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::const_new("application/octet-stream"))
        .and(NotForContentType::const_new("application/zip"))
        .and(NotForContentType::const_new("application/gzip"))
        .and(NotForContentType::const_new("font/woff2"))
        .and(NotForContentType::const_new("video/"))
        .and(NotForContentType::const_new("audio/"))
}

#[cfg(test)]
mod compression_predicate_tests {
    use super::compression_predicate;
    use axum::body::Body;
    use axum::http::{Response as HttpResponse, header};
    use tower_http::compression::predicate::Predicate;

    fn should_compress_for(ct: &str) -> bool {
        let body_bytes = vec![b'x'; 2048];
        let resp = HttpResponse::builder()
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(body_bytes))
            .unwrap();
        compression_predicate().should_compress(&resp)
    }

    #[test]
    fn compresses_text_documents() {
        assert!(should_compress_for("text/html; charset=utf-8"));
        assert!(should_compress_for("application/xml; charset=utf-8"));
    }

    #[test]
    fn skips_png_but_allows_svg() {
        assert!(!should_compress_for("image/png"));
        assert!(should_compress_for("image/svg+xml"));
    }

    #[test]
    fn skips_binary_downloads() {
        assert!(!should_compress_for("application/octet-stream"));
        assert!(!should_compress_for("application/zip"));
        assert!(!should_compress_for("font/woff2"));
    }
}
