use chrono::NaiveDate;
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 默认配置文件名（位于工作目录，可缺省）
const CONFIG_FILE: &str = "config.toml";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口（可被环境变量 `PORT` 覆盖）
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        3000
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// 静态资源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// 静态站点根目录
    #[serde(default = "AssetsConfig::default_root")]
    pub root: String,
}

impl AssetsConfig {
    fn default_root() -> String {
        "./public".to_string()
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
        }
    }
}

/// 站点信息（sitemap 基地址与分享图文案）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// 站点对外基地址，不带末尾斜杠
    #[serde(default = "SiteConfig::default_base_url")]
    pub base_url: String,
    /// 分享图主标题
    #[serde(default = "SiteConfig::default_title")]
    pub title: String,
    /// 分享图副标题
    #[serde(default = "SiteConfig::default_subtitle")]
    pub subtitle: String,
}

impl SiteConfig {
    fn default_base_url() -> String {
        "https://example.com".to_string()
    }
    fn default_title() -> String {
        "Personal Website".to_string()
    }
    fn default_subtitle() -> String {
        "Writing & Projects".to_string()
    }

    /// 去掉末尾斜杠后的基地址
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            title: Self::default_title(),
            subtitle: Self::default_subtitle(),
        }
    }
}

/// 单个字体家族的请求参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FontFamilyConfig {
    /// 家族名称（如 "Instrument Serif"）
    pub family: String,
    /// 字重
    pub weight: u16,
}

/// 字体获取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontsConfig {
    /// 字体元数据端点（返回 @font-face 样式表）
    #[serde(default = "FontsConfig::default_css_endpoint")]
    pub css_endpoint: String,
    /// 请求样式表时使用的 User-Agent（决定上游返回的字体格式）
    #[serde(default = "FontsConfig::default_user_agent")]
    pub user_agent: String,
    /// 单次请求超时（秒）
    #[serde(default = "FontsConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 标题使用的衬线字体
    #[serde(default = "FontsConfig::default_serif")]
    pub serif: FontFamilyConfig,
    /// 副标题使用的无衬线字体
    #[serde(default = "FontsConfig::default_sans")]
    pub sans: FontFamilyConfig,
}

impl FontsConfig {
    fn default_css_endpoint() -> String {
        "https://fonts.googleapis.com/css2".to_string()
    }
    fn default_user_agent() -> String {
        // 旧版桌面 UA：上游据此返回 TrueType 而非 woff2
        "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:27.0) Gecko/20100101 Firefox/27.0".to_string()
    }
    fn default_timeout() -> u64 {
        30
    }
    fn default_serif() -> FontFamilyConfig {
        FontFamilyConfig {
            family: "Instrument Serif".to_string(),
            weight: 400,
        }
    }
    fn default_sans() -> FontFamilyConfig {
        FontFamilyConfig {
            family: "Inter".to_string(),
            weight: 500,
        }
    }

    /// 生成某个家族的样式表 URL
    pub fn stylesheet_url(&self, font: &FontFamilyConfig) -> String {
        format!(
            "{}?family={}:wght@{}",
            self.css_endpoint,
            font.family.replace(' ', "+"),
            font.weight
        )
    }

    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            css_endpoint: Self::default_css_endpoint(),
            user_agent: Self::default_user_agent(),
            timeout_secs: Self::default_timeout(),
            serif: Self::default_serif(),
            sans: Self::default_sans(),
        }
    }
}

/// 图片渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRenderConfig {
    /// 输出宽度像素（按比例缩放 1200x630 画布）
    #[serde(default = "ImageRenderConfig::default_width")]
    pub width: u32,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 是否优先编码速度（PNG 快速压缩，文件更大）
    #[serde(default)]
    pub optimize_speed: bool,
}

impl ImageRenderConfig {
    fn default_width() -> u32 {
        1200
    }

    pub fn render_permits(&self) -> usize {
        if self.max_parallel == 0 {
            num_cpus::get()
        } else {
            self.max_parallel as usize
        }
    }
}

impl Default for ImageRenderConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            max_parallel: 0,
            optimize_speed: false,
        }
    }
}

/// sitemap 生成方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SitemapMode {
    /// 使用配置中手工维护的条目
    Static,
    /// 扫描静态资源目录中的 HTML 文件
    #[default]
    Discovery,
}

/// 静态模式下的单个条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapEntryConfig {
    pub path: String,
    pub lastmod: NaiveDate,
    #[serde(default = "SitemapEntryConfig::default_changefreq")]
    pub changefreq: String,
    #[serde(default = "SitemapEntryConfig::default_priority")]
    pub priority: f32,
}

impl SitemapEntryConfig {
    fn default_changefreq() -> String {
        "monthly".to_string()
    }
    fn default_priority() -> f32 {
        0.8
    }
}

/// sitemap 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SitemapConfig {
    #[serde(default)]
    pub mode: SitemapMode,
    /// 静态模式条目
    #[serde(default)]
    pub entries: Vec<SitemapEntryConfig>,
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub fonts: FontsConfig,
    #[serde(default)]
    pub image: ImageRenderConfig,
    #[serde(default)]
    pub sitemap: SitemapConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    ///
    /// 优先级：`PORT` > `APP_*` 环境变量 > config.toml > 默认值
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = PathBuf::from(CONFIG_FILE);
        tracing::info!("正在从 {:?} 加载配置文件（可缺省）", config_path);

        let port_override = std::env::var("PORT")
            .ok()
            .and_then(|p| p.trim().parse::<i64>().ok());

        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            // 例如：APP_SITEMAP__MODE=static
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", port_override)?
            .build()?;

        builder.try_deserialize()
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 获取静态资源根目录
    pub fn assets_path(&self) -> PathBuf {
        PathBuf::from(&self.assets.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize_from_empty_source() {
        let cfg: AppConfig = ConfigBuilder::builder()
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.sitemap.mode, SitemapMode::Discovery);
        assert_eq!(cfg.image.width, 1200);
        assert_eq!(cfg.fonts.serif.family, "Instrument Serif");
    }

    #[test]
    fn stylesheet_url_encodes_family_and_weight() {
        let fonts = FontsConfig::default();
        assert_eq!(
            fonts.stylesheet_url(&fonts.sans),
            "https://fonts.googleapis.com/css2?family=Inter:wght@500"
        );
        assert_eq!(
            fonts.stylesheet_url(&fonts.serif),
            "https://fonts.googleapis.com/css2?family=Instrument+Serif:wght@400"
        );
    }

    #[test]
    fn static_sitemap_entries_parse_from_toml() {
        let raw = r#"
            [sitemap]
            mode = "static"

            [[sitemap.entries]]
            path = "/"
            lastmod = "2024-05-01"
            priority = 1.0
        "#;
        let cfg: AppConfig = ConfigBuilder::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");
        assert_eq!(cfg.sitemap.mode, SitemapMode::Static);
        assert_eq!(cfg.sitemap.entries.len(), 1);
        assert_eq!(cfg.sitemap.entries[0].changefreq, "monthly");
        assert_eq!(
            cfg.sitemap.entries[0].lastmod,
            NaiveDate::from_ymd_opt(2024, 5, 1).expect("date")
        );
    }

    #[test]
    fn site_base_url_is_trimmed() {
        let site = SiteConfig {
            base_url: "https://example.org/".into(),
            ..SiteConfig::default()
        };
        assert_eq!(site.base_url_trimmed(), "https://example.org");
    }
}
