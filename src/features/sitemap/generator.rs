use std::fmt::Write;

use super::model::SitemapEntry;
use crate::xml::escape_xml;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// 生成 sitemap XML；所有写入的文本都经过实体转义
pub fn render_sitemap(base_url: &str, entries: &[SitemapEntry]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut xml = String::with_capacity(128 + entries.len() * 160);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(xml, "<urlset xmlns=\"{SITEMAP_NS}\">");
    for entry in entries {
        let loc = format!("{base}{}", entry.path);
        let _ = write!(
            xml,
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n  </url>\n",
            escape_xml(&loc),
            entry.lastmod.format("%Y-%m-%d"),
            escape_xml(&entry.changefreq),
            entry.priority.clamp(0.0, 1.0)
        );
    }
    xml.push_str("</urlset>\n");
    xml
}
