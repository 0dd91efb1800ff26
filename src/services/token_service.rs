//! 动态令牌服务 - 业务能力层
//!
//! 只负责从登录页拿到 tokenValue

use crate::config::Endpoints;
use crate::error::AppResult;
use crate::infrastructure::markup::find_attribute;
use crate::infrastructure::Transport;
use std::time::Duration;
use tracing::{info, warn};

/// 登录令牌服务
pub struct TokenService {
    endpoints: Endpoints,
    timeout: Duration,
}

impl TokenService {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Self {
        Self { endpoints, timeout }
    }

    /// 获取当前登录页上的 tokenValue
    ///
    /// 页面没有该字段或请求失败都返回 None，调用方应视为 "暂时无法登录"。
    pub async fn fetch_token(&self, session: &dyn Transport) -> Option<String> {
        info!("正在获取动态tokenValue...");
        match self.try_fetch(session).await {
            Ok(Some(token)) => {
                info!("✓ 成功获取动态tokenValue");
                Some(token)
            }
            Ok(None) => {
                warn!("登录页中没有找到 tokenValue");
                None
            }
            Err(e) => {
                warn!("获取登录页面失败: {}", e);
                None
            }
        }
    }

    async fn try_fetch(&self, session: &dyn Transport) -> AppResult<Option<String>> {
        let url = self.endpoints.login_page();
        let page = session
            .get(&url, &[], self.timeout)
            .await?
            .error_for_status(&url)?;
        Ok(find_attribute(&page.text(), "input", ("name", "tokenValue"), "value")
            .filter(|token| !token.is_empty()))
    }
}
