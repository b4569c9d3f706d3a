//! 分享图的声明式布局树。
//!
//! 只描述结构与样式，不涉及字体度量或像素；定位由 [`super::render`] 完成。

use crate::config::{FontsConfig, SiteConfig};

/// 逻辑画布尺寸（Open Graph 推荐 1200x630）
pub const CANVAS_WIDTH: u32 = 1200;
pub const CANVAS_HEIGHT: u32 = 630;

const BACKGROUND: &str = "#fafaf7";
const TITLE_COLOR: &str = "#111111";
const SUBTITLE_COLOR: &str = "#6b6b6b";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Column,
    Row,
}

/// 交叉轴对齐
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    Center,
    End,
}

/// 主轴分布
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTransform {
    None,
    Uppercase,
}

impl TextTransform {
    pub fn apply(self, text: &str) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlexContainer {
    pub direction: FlexDirection,
    pub align_items: Align,
    pub justify_content: Justify,
    pub background: Option<String>,
    pub padding: f32,
    pub gap: f32,
    pub children: Vec<LayoutNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub content: String,
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub color: String,
    pub letter_spacing: f32,
    pub text_transform: TextTransform,
}

impl TextNode {
    /// 应用 text-transform 后实际绘制的文字
    pub fn display_text(&self) -> String {
        self.text_transform.apply(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    Flex(FlexContainer),
    Text(TextNode),
}

impl LayoutNode {
    /// 树中引用的全部字体家族（去重，保持出现顺序）
    pub fn font_families(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_families(&mut out);
        out
    }

    fn collect_families<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            LayoutNode::Text(t) => {
                if !out.contains(&t.font_family.as_str()) {
                    out.push(&t.font_family);
                }
            }
            LayoutNode::Flex(f) => f.children.iter().for_each(|c| c.collect_families(out)),
        }
    }
}

/// 构建分享图布局：衬线标题 + 大写无衬线副标题，纵向排列、左对齐。
///
/// 输入在进程生命周期内固定，因此结果是确定的。
pub fn build_layout(site: &SiteConfig, fonts: &FontsConfig) -> LayoutNode {
    let title = TextNode {
        content: site.title.clone(),
        font_family: fonts.serif.family.clone(),
        font_size: 72.0,
        font_weight: fonts.serif.weight,
        color: TITLE_COLOR.to_string(),
        letter_spacing: -1.5,
        text_transform: TextTransform::None,
    };
    let subtitle = TextNode {
        content: site.subtitle.clone(),
        font_family: fonts.sans.family.clone(),
        font_size: 28.0,
        font_weight: fonts.sans.weight,
        color: SUBTITLE_COLOR.to_string(),
        letter_spacing: 4.0,
        text_transform: TextTransform::Uppercase,
    };

    LayoutNode::Flex(FlexContainer {
        direction: FlexDirection::Column,
        align_items: Align::Start,
        justify_content: Justify::Center,
        background: Some(BACKGROUND.to_string()),
        padding: 80.0,
        gap: 20.0,
        children: vec![LayoutNode::Text(title), LayoutNode::Text(subtitle)],
    })
}
