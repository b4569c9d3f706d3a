use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

tokio::task_local! {
    /// 当前异步任务绑定的 request_id，错误响应体会回填该值。
    static TASK_REQUEST_ID: String;
}

/// 获取当前请求上下文中的 request_id（不在请求上下文中时为 None）。
pub fn current_request_id() -> Option<String> {
    TASK_REQUEST_ID.try_with(Clone::clone).ok()
}

fn is_safe_token(v: &str) -> bool {
    !v.is_empty()
        && v.len() <= MAX_REQUEST_ID_LEN
        && v.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn pick_request_id(req: &Request) -> String {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| is_safe_token(v))
        .map(str::to_string)
        .unwrap_or_else(|| format!("req_{}", Uuid::new_v4().simple()))
}

/// request_id 中间件：透传合法的客户端 `X-Request-Id`，否则生成新值，并回写到响应头。
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let request_id = pick_request_id(&req);

    let mut res = TASK_REQUEST_ID
        .scope(request_id.clone(), next.run(req))
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}
