mod cache;
mod source;
mod stylesheet;

pub use cache::{FontCache, FontDescriptor, FontRequest, FontStyle};
pub use source::{FontSource, HttpFontSource};
pub use stylesheet::extract_font_url;
