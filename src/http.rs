use reqwest::Client;
use std::time::Duration;

use crate::config::FontsConfig;

/// 构建出站 HTTP Client（连接池/Keep-Alive 在实例内复用）。
///
/// 超时覆盖整个请求（connect + 读取），超时后该次字体获取失败，缓存保持为空。
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

/// 按字体配置构建 Client。
pub fn font_client(fonts: &FontsConfig) -> Result<Client, reqwest::Error> {
    build_client(&fonts.user_agent, fonts.timeout_duration())
}
