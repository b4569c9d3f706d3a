use regex::Regex;
use std::sync::LazyLock;

static FONT_SRC_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src:\s*url\(\s*['"]?([^)'"\s]+)['"]?\s*\)"#).expect("valid font src regex")
});

/// 从 @font-face 样式表中取出第一个 `src: url(...)` 的地址
pub fn extract_font_url(css: &str) -> Option<&str> {
    FONT_SRC_URL
        .captures(css)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
