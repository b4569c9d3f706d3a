use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::features::assets::AssetStore;
use crate::features::fonts::{FontCache, FontSource};

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub assets: Arc<AssetStore>,
    /// 分享图字体缓存（随服务实例创建，不是全局变量）
    pub fonts: FontCache,
    /// 控制并发渲染的信号量（限制 CPU 密集型任务数量）
    pub render_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: AppConfig, assets: AssetStore, font_source: Arc<dyn FontSource>) -> Self {
        let fonts = FontCache::from_config(&config.fonts, font_source);
        let render_semaphore = Arc::new(Semaphore::new(config.image.render_permits()));
        Self {
            config: Arc::new(config),
            assets: Arc::new(assets),
            fonts,
            render_semaphore,
        }
    }
}
