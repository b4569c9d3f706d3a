pub mod assets;
pub mod fonts;
pub mod og;
pub mod pipeline;
pub mod sitemap;
