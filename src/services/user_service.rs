//! 用户信息服务 - 业务能力层

use crate::config::Endpoints;
use crate::error::AppResult;
use crate::infrastructure::markup::find_text;
use crate::infrastructure::Transport;
use std::time::Duration;
use tracing::{info, warn};

/// 取不到姓名时的称呼
pub const DEFAULT_USER_NAME: &str = "同学";

const GREETING_PREFIX: &str = "欢迎您，";

pub struct UserService {
    endpoints: Endpoints,
    timeout: Duration,
}

impl UserService {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Self {
        Self { endpoints, timeout }
    }

    /// 从门户首页读取用户姓名，失败时返回 "同学"
    pub async fn fetch_user_name(&self, session: &dyn Transport) -> String {
        info!("尝试获取用户姓名...");
        match self.try_fetch(session).await {
            Ok(Some(name)) => {
                info!("✓ 成功获取用户姓名: {}", name);
                name
            }
            Ok(None) => DEFAULT_USER_NAME.to_string(),
            Err(e) => {
                warn!("解析用户姓名失败: {}", e);
                DEFAULT_USER_NAME.to_string()
            }
        }
    }

    /// 能读到真实姓名即认为会话仍然有效
    pub async fn has_valid_session(&self, session: &dyn Transport) -> bool {
        self.fetch_user_name(session).await != DEFAULT_USER_NAME
    }

    async fn try_fetch(&self, session: &dyn Transport) -> AppResult<Option<String>> {
        let url = self.endpoints.user_index();
        let page = session
            .get(&url, &[], self.timeout)
            .await?
            .error_for_status(&url)?;
        Ok(find_text(&page.text(), "span.user-info").and_then(|text| strip_greeting(&text)))
    }
}

fn strip_greeting(text: &str) -> Option<String> {
    let name = text.replace(GREETING_PREFIX, "");
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Scripted, StubTransport, BASE};

    fn service() -> UserService {
        UserService::new(Endpoints::new(BASE).unwrap(), Duration::from_secs(10))
    }

    fn index_url() -> String {
        format!("{}/index", BASE)
    }

    #[tokio::test]
    async fn test_strips_greeting() {
        let page = r#"<div class="navbar"><span class="user-info"> 欢迎您，李四 </span></div>"#;
        let stub = StubTransport::new().on(index_url(), vec![Scripted::ok(page)]);

        assert_eq!(service().fetch_user_name(&stub).await, "李四");
        assert!(service().has_valid_session(&stub).await);
    }

    #[tokio::test]
    async fn test_login_page_falls_back_to_default() {
        let stub = StubTransport::new().on(index_url(), vec![Scripted::ok("<form id=\"loginForm\"></form>")]);

        assert_eq!(service().fetch_user_name(&stub).await, DEFAULT_USER_NAME);
        assert!(!service().has_valid_session(&stub).await);
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back_to_default() {
        let stub = StubTransport::new().on(index_url(), vec![Scripted::Fail("refused")]);

        assert_eq!(service().fetch_user_name(&stub).await, DEFAULT_USER_NAME);
    }

    #[test]
    fn test_greeting_only_is_none() {
        assert_eq!(strip_greeting("欢迎您，"), None);
        assert_eq!(strip_greeting("王五"), Some("王五".to_string()));
    }
}
