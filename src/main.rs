use site_backend::config::AppConfig;
use site_backend::features::assets::AssetStore;
use site_backend::features::fonts::HttpFontSource;
use site_backend::{AppState, ShutdownManager, create_site_router, http};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "site_backend=info,tower_http=info".into()),
        )
        .init();

    // 创建优雅退出管理器
    let shutdown_manager = ShutdownManager::new();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Config init failed: {}", e);
            std::process::exit(1);
        }
    };

    // 启动信号处理器
    if let Err(e) = shutdown_manager.start_signal_handler().await {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    let assets = AssetStore::open(config.assets_path()).unwrap_or_else(|e| {
        tracing::error!("静态资源目录不可用 {:?}: {}", config.assets_path(), e);
        std::process::exit(1);
    });

    let client = http::font_client(&config.fonts).unwrap_or_else(|e| {
        tracing::error!("HTTP Client 创建失败: {}", e);
        std::process::exit(1);
    });

    let addr = config.server_addr();
    let shutdown_timeout = config.shutdown.timeout_duration();
    tracing::info!(
        "站点根目录: {:?}, sitemap 模式: {:?}, 渲染并发: {}",
        assets.root(),
        config.sitemap.mode,
        config.image.render_permits()
    );

    let state = AppState::new(config, assets, Arc::new(HttpFontSource::new(client)));
    let app = create_site_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);

    // 运行服务器直到收到退出信号
    let manager_for_server = shutdown_manager.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let reason = manager_for_server.wait_for_shutdown().await;
                tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
            })
            .await
    });

    let result = tokio::select! {
        res = &mut server => res,
        _ = shutdown_manager.wait_for_shutdown() => {
            tracing::info!("优雅退出超时时间: {}秒", shutdown_timeout.as_secs());
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(res) => res,
                Err(_) => {
                    tracing::warn!("优雅退出超时，强制退出");
                    server.abort();
                    std::process::exit(1);
                }
            }
        }
    };

    match result {
        Ok(Ok(())) => tracing::info!("服务器已优雅关闭"),
        Ok(Err(e)) => {
            tracing::error!("服务器运行错误: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("服务器任务异常退出: {}", e);
            std::process::exit(1);
        }
    }
}
