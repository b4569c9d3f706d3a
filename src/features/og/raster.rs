use resvg::{
    render,
    tiny_skia::{Pixmap, Transform},
};

use super::render::VectorDocument;
use crate::error::RenderError;

/// 按目标宽度等比缩放后栅格化并编码为 PNG（宽度为 0 时保持原始尺寸）。
///
/// `optimize_speed` 为真时使用快速压缩，输出更大但编码更快。
pub fn rasterize(
    doc: &VectorDocument,
    target_width: u32,
    optimize_speed: bool,
) -> Result<Vec<u8>, RenderError> {
    let src_size = doc.tree().size().to_int_size();
    let (dst_w, dst_h, scale) = if target_width > 0 && target_width != src_size.width() {
        let s = target_width as f32 / src_size.width() as f32;
        (
            target_width,
            ((src_size.height() as f32 * s).round() as u32).max(1),
            s,
        )
    } else {
        (src_size.width(), src_size.height(), 1.0)
    };

    let mut pixmap = Pixmap::new(dst_w, dst_h)
        .ok_or_else(|| RenderError::Rasterize(format!("无法创建 {dst_w}x{dst_h} 画布")))?;
    render(
        doc.tree(),
        Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    // tiny-skia 使用预乘 alpha，PNG 需要直通 alpha
    let mut rgba = Vec::with_capacity(rgba_len(dst_w, dst_h));
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let compression = if optimize_speed {
        png::Compression::Fast
    } else {
        png::Compression::Default
    };
    encode_png(&rgba, dst_w, dst_h, compression)
}

/// RGBA8 缓冲区长度（按 usize 计算，避免大尺寸时 u32 溢出）
fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

fn encode_png(
    rgba: &[u8],
    width: u32,
    height: u32,
    compression: png::Compression,
) -> Result<Vec<u8>, RenderError> {
    let mut out = Vec::with_capacity(rgba.len() / 4);
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(compression);
        encoder.set_filter(png::FilterType::Paeth);
        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderError::Encode(format!("PNG write_header error: {e}")))?;
        writer
            .write_image_data(rgba)
            .map_err(|e| RenderError::Encode(format!("PNG write_image_data error: {e}")))?;
        writer
            .finish()
            .map_err(|e| RenderError::Encode(format!("PNG finish error: {e}")))?;
    }
    Ok(out)
}
