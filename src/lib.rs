/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 优雅退出管理模块
pub mod shutdown;

/// HTTP Client 复用工具
pub mod http;

/// request_id 中间件
pub mod request_id;

pub mod xml;

// 导出常用类型供外部使用
pub use config::AppConfig;
pub use error::AppError;
pub use features::pipeline::create_site_router;
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::AppState;
