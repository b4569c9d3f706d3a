use resvg::usvg::{self, Options as UsvgOptions, fontdb};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use super::layout::{Align, FlexContainer, FlexDirection, Justify, LayoutNode, TextNode};
use crate::error::RenderError;
use crate::features::fonts::FontDescriptor;
use crate::xml::escape_xml;

/// 行高倍数（相对字号）
const LINE_HEIGHT: f32 = 1.2;

/// 布局转换得到的矢量文档（与分辨率无关）
pub struct VectorDocument {
    svg: String,
    tree: usvg::Tree,
}

impl VectorDocument {
    /// 中间 SVG 源文本
    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub fn tree(&self) -> &usvg::Tree {
        &self.tree
    }

    /// 逻辑尺寸（宽, 高）
    pub fn size(&self) -> (f32, f32) {
        let size = self.tree.size();
        (size.width(), size.height())
    }
}

/// 已载入字体数据库的单个字体及其度量
struct LoadedFace {
    /// 字体文件内部声明的家族名（SVG 中按此名称引用）
    svg_family: String,
    data: axum::body::Bytes,
    units_per_em: f32,
    ascender: f32,
    descender: f32,
}

impl LoadedFace {
    fn load(db: &mut fontdb::Database, font: &FontDescriptor) -> Result<Self, RenderError> {
        let face = ttf_parser::Face::parse(&font.data, 0).map_err(|e| {
            RenderError::Layout(format!("字体 '{}' 无法解析: {e}", font.family))
        })?;
        let units_per_em = f32::from(face.units_per_em());
        let ascender = f32::from(face.ascender());
        let descender = f32::from(face.descender());

        let ids = db.load_font_source(fontdb::Source::Binary(Arc::new(font.data.clone())));
        let svg_family = ids
            .first()
            .and_then(|id| db.face(*id))
            .and_then(|info| info.families.first())
            .map(|(name, _)| name.clone())
            .ok_or_else(|| {
                RenderError::Layout(format!("字体 '{}' 未能载入字体数据库", font.family))
            })?;

        Ok(Self {
            svg_family,
            data: font.data.clone(),
            units_per_em,
            ascender,
            descender,
        })
    }

    /// 文本在指定字号与字间距下的宽度（不含字偶距调整）
    fn text_width(&self, text: &str, font_size: f32, letter_spacing: f32) -> f32 {
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return 0.0;
        };
        let scale = font_size / self.units_per_em;
        let mut width = 0.0;
        let mut count = 0usize;
        for ch in text.chars() {
            let advance = face
                .glyph_index(ch)
                .and_then(|g| face.glyph_hor_advance(g))
                .unwrap_or(0);
            width += f32::from(advance) * scale;
            count += 1;
        }
        width + letter_spacing * count as f32
    }

    /// 行框内基线相对行顶的偏移（半行距 + 上升部）
    fn baseline_offset(&self, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let ascent = self.ascender * scale;
        let content = (self.ascender - self.descender) * scale;
        let line = font_size * LINE_HEIGHT;
        (line - content) / 2.0 + ascent
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Size {
    w: f32,
    h: f32,
}

struct Painter<'a> {
    faces: &'a HashMap<String, LoadedFace>,
    svg: String,
}

fn fmt_error(e: std::fmt::Error) -> RenderError {
    RenderError::Layout(format!("SVG 生成失败: {e}"))
}

impl Painter<'_> {
    fn face(&self, family: &str) -> Result<&LoadedFace, RenderError> {
        self.faces
            .get(family)
            .ok_or_else(|| RenderError::Layout(format!("字体 '{family}' 不在提供的字体集合中")))
    }

    fn measure(&self, node: &LayoutNode) -> Result<Size, RenderError> {
        match node {
            LayoutNode::Text(t) => {
                let face = self.face(&t.font_family)?;
                Ok(Size {
                    w: face.text_width(&t.display_text(), t.font_size, t.letter_spacing),
                    h: t.font_size * LINE_HEIGHT,
                })
            }
            LayoutNode::Flex(f) => {
                let sizes = f
                    .children
                    .iter()
                    .map(|c| self.measure(c))
                    .collect::<Result<Vec<_>, _>>()?;
                let (main, cross) = main_and_cross(f, &sizes);
                let pad = f.padding * 2.0;
                Ok(match f.direction {
                    FlexDirection::Column => Size {
                        w: cross + pad,
                        h: main + pad,
                    },
                    FlexDirection::Row => Size {
                        w: main + pad,
                        h: cross + pad,
                    },
                })
            }
        }
    }

    fn place(&mut self, node: &LayoutNode, x: f32, y: f32, size: Size) -> Result<(), RenderError> {
        match node {
            LayoutNode::Text(t) => self.paint_text(t, x, y, size),
            LayoutNode::Flex(f) => self.place_flex(f, x, y, size),
        }
    }

    fn place_flex(&mut self, f: &FlexContainer, x: f32, y: f32, size: Size) -> Result<(), RenderError> {
        if let Some(bg) = &f.background {
            write!(
                self.svg,
                r#"<rect x="{x:.2}" y="{y:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
                size.w,
                size.h,
                escape_xml(bg)
            )
            .map_err(fmt_error)?;
        }

        let inner = Size {
            w: (size.w - f.padding * 2.0).max(0.0),
            h: (size.h - f.padding * 2.0).max(0.0),
        };
        let sizes = f
            .children
            .iter()
            .map(|c| self.measure(c))
            .collect::<Result<Vec<_>, _>>()?;
        let (content_main, _) = main_and_cross(f, &sizes);

        let (avail_main, avail_cross) = match f.direction {
            FlexDirection::Column => (inner.h, inner.w),
            FlexDirection::Row => (inner.w, inner.h),
        };
        let mut cursor = match f.justify_content {
            Justify::Start => 0.0,
            Justify::Center => ((avail_main - content_main) / 2.0).max(0.0),
            Justify::End => (avail_main - content_main).max(0.0),
        };

        for (child, child_size) in f.children.iter().zip(sizes) {
            let (child_main, child_cross) = match f.direction {
                FlexDirection::Column => (child_size.h, child_size.w),
                FlexDirection::Row => (child_size.w, child_size.h),
            };
            if child_cross > avail_cross {
                tracing::warn!(
                    "分享图内容超出交叉轴可用空间: {:.1} > {:.1}",
                    child_cross,
                    avail_cross
                );
            }
            let cross_offset = match f.align_items {
                Align::Start => 0.0,
                Align::Center => ((avail_cross - child_cross) / 2.0).max(0.0),
                Align::End => (avail_cross - child_cross).max(0.0),
            };
            let (cx, cy) = match f.direction {
                FlexDirection::Column => (x + f.padding + cross_offset, y + f.padding + cursor),
                FlexDirection::Row => (x + f.padding + cursor, y + f.padding + cross_offset),
            };
            self.place(child, cx, cy, child_size)?;
            cursor += child_main + f.gap;
        }
        Ok(())
    }

    fn paint_text(&mut self, t: &TextNode, x: f32, y: f32, _size: Size) -> Result<(), RenderError> {
        let face = self.face(&t.font_family)?;
        let baseline = y + face.baseline_offset(t.font_size);
        let family = escape_xml(&face.svg_family.replace('\'', ""));
        write!(
            self.svg,
            r#"<text x="{x:.2}" y="{baseline:.2}" font-family="'{family}'" font-size="{}" font-weight="{}" fill="{}" letter-spacing="{}" xml:space="preserve">{}</text>"#,
            t.font_size,
            t.font_weight,
            escape_xml(&t.color),
            t.letter_spacing,
            escape_xml(&t.display_text())
        )
        .map_err(fmt_error)
    }
}

/// 子节点在主轴上的总长度（含间距）与交叉轴上的最大长度
fn main_and_cross(f: &FlexContainer, sizes: &[Size]) -> (f32, f32) {
    let gaps = f.gap * sizes.len().saturating_sub(1) as f32;
    match f.direction {
        FlexDirection::Column => (
            sizes.iter().map(|s| s.h).sum::<f32>() + gaps,
            sizes.iter().map(|s| s.w).fold(0.0, f32::max),
        ),
        FlexDirection::Row => (
            sizes.iter().map(|s| s.w).sum::<f32>() + gaps,
            sizes.iter().map(|s| s.h).fold(0.0, f32::max),
        ),
    }
}

/// 按字体度量排版布局树，生成矢量文档。
///
/// 仅使用传入的字体（不读取系统字体）；布局引用了未提供的家族时返回 `Layout` 错误。
pub fn render(
    layout: &LayoutNode,
    fonts: &[FontDescriptor],
    width: u32,
    height: u32,
) -> Result<VectorDocument, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::Layout(format!("无效画布尺寸 {width}x{height}")));
    }

    let mut db = fontdb::Database::new();
    let mut faces = HashMap::new();
    for font in fonts {
        if faces.contains_key(&font.family) {
            continue;
        }
        let face = LoadedFace::load(&mut db, font)?;
        faces.insert(font.family.clone(), face);
    }

    // 先确认布局引用的字体都在，避免生成半成品
    for family in layout.font_families() {
        if !faces.contains_key(family) {
            return Err(RenderError::Layout(format!(
                "字体 '{family}' 不在提供的字体集合中"
            )));
        }
    }

    let mut painter = Painter {
        faces: &faces,
        svg: String::with_capacity(1024),
    };
    write!(
        painter.svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    )
    .map_err(fmt_error)?;
    painter.place(
        layout,
        0.0,
        0.0,
        Size {
            w: width as f32,
            h: height as f32,
        },
    )?;
    painter.svg.push_str("</svg>");
    let svg = painter.svg;

    let fallback_family = fonts
        .first()
        .and_then(|f| faces.get(&f.family))
        .map(|f| f.svg_family.clone())
        .unwrap_or_default();
    let opts = UsvgOptions {
        fontdb: Arc::new(db),
        font_family: fallback_family,
        font_size: 16.0,
        languages: vec!["en".to_string()],
        shape_rendering: usvg::ShapeRendering::GeometricPrecision,
        text_rendering: usvg::TextRendering::OptimizeLegibility,
        image_rendering: usvg::ImageRendering::OptimizeQuality,
        ..Default::default()
    };

    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts)
        .map_err(|e| RenderError::Layout(format!("SVG 解析失败: {e}")))?;

    Ok(VectorDocument { svg, tree })
}
