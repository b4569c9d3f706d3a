use axum::{
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tokio::task::spawn_blocking;

use super::layout::{CANVAS_HEIGHT, CANVAS_WIDTH, build_layout};
use super::raster::rasterize;
use super::render::render;
use crate::error::AppError;
use crate::state::AppState;

pub const OG_IMAGE_PATH: &str = "/og.png";

/// 生成结果允许缓存 24 小时
pub const OG_CACHE_CONTROL: &str = "public, max-age=86400";

/// 字体获取 → 布局 → 矢量化 → 栅格化，输出 PNG 字节。
pub async fn generate_og_png(state: &AppState) -> Result<Vec<u8>, AppError> {
    let t_total = Instant::now();

    let fonts = state.fonts.acquire().await?;
    let t_fonts = t_total.elapsed();

    let layout = build_layout(&state.config.site, &state.config.fonts);
    let width = state.config.image.width;
    let optimize_speed = state.config.image.optimize_speed;

    // 栅格化是 CPU 密集型任务：限制并发并放到阻塞线程池
    let _permit = state
        .render_semaphore
        .acquire()
        .await
        .map_err(|e| AppError::Internal(format!("渲染信号量已关闭: {e}")))?;
    let png = spawn_blocking(move || {
        let doc = render(&layout, &fonts, CANVAS_WIDTH, CANVAS_HEIGHT)?;
        rasterize(&doc, width, optimize_speed)
    })
    .await
    .map_err(|e| AppError::Internal(format!("阻塞渲染任务执行失败: {e}")))??;

    tracing::debug!(
        "分享图生成完成: 字体={:?}, 总计={:?}, {} 字节",
        t_fonts,
        t_total.elapsed(),
        png.len()
    );
    Ok(png)
}

/// `/og.png`：失败时记录日志并返回不含细节的 500
pub async fn og_image(state: &AppState) -> Response {
    match generate_og_png(state).await {
        Ok(png) => {
            let mut res = png.into_response();
            let headers = res.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(OG_CACHE_CONTROL),
            );
            res
        }
        Err(e) => {
            tracing::error!("分享图生成失败: {}", e);
            e.into_response()
        }
    }
}
