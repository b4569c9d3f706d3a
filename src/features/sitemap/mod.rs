//! 站点地图：静态条目或扫描资源目录

pub mod generator;
pub mod handler;
pub mod model;

pub use generator::render_sitemap;
pub use handler::{SITEMAP_PATH, collect_entries, sitemap};
pub use model::{SitemapEntry, discover_entries, url_path_for};
