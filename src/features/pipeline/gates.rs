//! 请求安全关卡链。
//!
//! 每个关卡要么放行（[`Flow::Next`]），要么直接给出终态响应；
//! 关卡顺序由 [`GATE_ORDER`] 显式声明，由 [`run_gates`] 顺序驱动。

use axum::{
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::features::assets::{ResolvedPath, serve_asset};
use crate::features::og::{OG_IMAGE_PATH, og_image};
use crate::features::sitemap::{SITEMAP_PATH, sitemap};
use crate::state::AppState;

/// 请求路径最大长度（字符）
pub const MAX_PATH_LEN: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Method,
    UriLength,
    RouteDispatch,
    PathTraversal,
    StaticAsset,
}

pub const GATE_ORDER: [Gate; 5] = [
    Gate::Method,
    Gate::UriLength,
    Gate::RouteDispatch,
    Gate::PathTraversal,
    Gate::StaticAsset,
];

/// 保留路由（精确匹配）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    OgImage,
    Sitemap,
}

impl Route {
    pub fn match_path(path: &str) -> Option<Self> {
        match path {
            OG_IMAGE_PATH => Some(Route::OgImage),
            SITEMAP_PATH => Some(Route::Sitemap),
            _ => None,
        }
    }
}

pub enum Flow {
    Next,
    Respond(Response),
}

impl From<AppError> for Flow {
    fn from(e: AppError) -> Self {
        Flow::Respond(e.into_response())
    }
}

/// 关卡间传递的请求上下文
#[derive(Debug)]
pub struct GateContext {
    pub method: Method,
    pub path: String,
    /// 穿越检查通过后填充
    pub resolved: Option<ResolvedPath>,
}

impl GateContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            resolved: None,
        }
    }
}

fn method_gate(ctx: &GateContext) -> Flow {
    if ctx.method == Method::GET || ctx.method == Method::HEAD {
        Flow::Next
    } else {
        AppError::MethodNotAllowed.into()
    }
}

fn uri_length_gate(ctx: &GateContext) -> Flow {
    if ctx.path.chars().count() > MAX_PATH_LEN {
        AppError::UriTooLong.into()
    } else {
        Flow::Next
    }
}

async fn route_dispatch(state: &AppState, ctx: &GateContext) -> Flow {
    match Route::match_path(&ctx.path) {
        Some(Route::OgImage) => Flow::Respond(og_image(state).await),
        Some(Route::Sitemap) => Flow::Respond(sitemap(state).await),
        None => Flow::Next,
    }
}

fn path_traversal_gate(state: &AppState, ctx: &mut GateContext) -> Flow {
    match state.assets.resolve(&ctx.path) {
        Ok(resolved) => {
            ctx.resolved = Some(resolved);
            Flow::Next
        }
        Err(e) => e.into(),
    }
}

async fn static_asset_gate(state: &AppState, ctx: &GateContext) -> Flow {
    let Some(resolved) = ctx.resolved.as_ref() else {
        return Flow::Next;
    };
    match serve_asset(&state.assets, resolved).await {
        Ok(res) => Flow::Respond(res),
        Err(AppError::NotFound) => Flow::Next,
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!("静态资源读取失败 {}: {}", ctx.path, e);
            }
            e.into()
        }
    }
}

async fn run_gate(gate: Gate, state: &AppState, ctx: &mut GateContext) -> Flow {
    match gate {
        Gate::Method => method_gate(ctx),
        Gate::UriLength => uri_length_gate(ctx),
        Gate::RouteDispatch => route_dispatch(state, ctx).await,
        Gate::PathTraversal => path_traversal_gate(state, ctx),
        Gate::StaticAsset => static_asset_gate(state, ctx).await,
    }
}

/// 依次执行关卡，第一个终态响应即为结果；全部放行则返回 404
pub async fn run_gates(state: &AppState, mut ctx: GateContext) -> Response {
    for gate in GATE_ORDER {
        if let Flow::Respond(res) = run_gate(gate, state, &mut ctx).await {
            tracing::debug!("{:?} {} 终止于 {:?}: {}", ctx.method, ctx.path, gate, res.status());
            return res;
        }
    }
    AppError::NotFound.into_response()
}

/// 路由兜底处理器：所有请求都经由关卡链
pub async fn dispatch(State(state): State<AppState>, req: Request) -> Response {
    let ctx = GateContext::new(req.method().clone(), req.uri().path());
    run_gates(&state, ctx).await
}
