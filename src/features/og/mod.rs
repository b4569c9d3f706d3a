//! Open Graph 分享图：布局树 → 矢量文档 → PNG。

pub mod handler;
pub mod layout;
pub mod raster;
pub mod render;

pub use handler::{OG_IMAGE_PATH, generate_og_png, og_image};
pub use layout::{CANVAS_HEIGHT, CANVAS_WIDTH, LayoutNode, build_layout};
pub use raster::rasterize;
pub use render::{VectorDocument, render};
