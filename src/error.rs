use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 非 GET/HEAD 请求
    #[error("不允许的请求方法")]
    MethodNotAllowed,

    /// 请求路径过长
    #[error("请求路径过长")]
    UriTooLong,

    /// 路径穿越等被拒绝的访问
    #[error("禁止访问: {0}")]
    Forbidden(String),

    /// 资源不存在
    #[error("资源不存在")]
    NotFound,

    /// 上游（字体元数据/字体文件）错误
    #[error("上游错误: {0}")]
    Upstream(#[from] UpstreamError),

    /// 排版/栅格化错误
    #[error("渲染错误: {0}")]
    Render(#[from] RenderError),

    /// I/O 错误（如资源目录不可读）
    #[error("I/O 错误: {0}")]
    Io(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 上游请求错误类型
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// 网络请求错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 上游返回非成功状态码
    #[error("上游返回状态码 {status}: {url}")]
    Status { status: u16, url: String },

    /// 超时
    #[error("超时")]
    Timeout,

    /// 字体样式表中未找到 `src: url(...)`
    #[error("字体解析失败: {0}")]
    FontResolution(String),
}

/// 渲染错误类型
#[derive(Error, Debug)]
pub enum RenderError {
    /// 排版失败（字体缺失、字体无法解析、SVG 无法构建）
    #[error("排版失败: {0}")]
    Layout(String),

    /// 栅格化失败
    #[error("栅格化失败: {0}")]
    Rasterize(String),

    /// PNG 编码失败
    #[error("PNG 编码失败: {0}")]
    Encode(String),
}

/// RFC7807 风格的错误响应（Problem Details）。
///
/// 5xx 响应不携带 `detail`，避免把上游或内部错误文本泄露给客户端。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。
    #[serde(rename = "type")]
    pub type_url: String,

    /// 简短标题。
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    pub status: u16,

    /// 人类可读的详细信息（仅 4xx）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    pub code: String,

    /// 请求追踪 ID。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::UriTooLong => StatusCode::URI_TOO_LONG,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Upstream(_)
            | AppError::Render(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            AppError::UriTooLong => "URI_TOO_LONG",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound => "NOT_FOUND",
            // 服务端错误统一对外暴露同一个错误码
            AppError::Upstream(_)
            | AppError::Render(_)
            | AppError::Io(_)
            | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::METHOD_NOT_ALLOWED => "Method Not Allowed",
            StatusCode::URI_TOO_LONG => "URI Too Long",
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }

    /// 对客户端可见的详细信息：服务端错误一律隐藏。
    fn public_detail(&self) -> Option<String> {
        match self {
            AppError::MethodNotAllowed => Some("only GET and HEAD are supported".to_string()),
            AppError::UriTooLong => Some("request path exceeds 2048 characters".to_string()),
            AppError::Forbidden(_) => Some("path escapes the site root".to_string()),
            AppError::NotFound => Some("resource not found".to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: self.public_detail(),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        if matches!(self, AppError::MethodNotAllowed) {
            res.headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        }
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if let Some(status) = err.status() {
            UpstreamError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}
