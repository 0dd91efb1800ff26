//! HTTP 传输 - 基础设施层
//!
//! 持有 Cookie 与连接，只暴露 "发请求" 的能力

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderValue, LOCATION};
use reqwest::{redirect, Client, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// 一次 HTTP 响应
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// `Location` 响应头（仅重定向时有意义）
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            location: None,
            body: body.into(),
        }
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            location: Some(location.into()),
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// 按 UTF-8 解码响应体，非法字节会被替换
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// 解析 JSON 响应体，失败时返回 `AppError::Decode`
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> AppResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| AppError::decode(context, e))
    }

    /// 4xx / 5xx 视为网络层失败
    pub fn error_for_status(self, url: &str) -> AppResult<Self> {
        if self.status >= 400 {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: self.status,
            });
        }
        Ok(self)
    }
}

/// 传输能力
///
/// 职责：
/// - 发送 GET / 表单 POST
/// - 在同一个会话内保持 Cookie
/// - 不认识门户的页面结构
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> AppResult<HttpResponse>;

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        timeout: Duration,
        follow_redirects: bool,
    ) -> AppResult<HttpResponse>;
}

/// 基于 reqwest 的会话
///
/// 两个客户端共享同一个 Cookie 罐：一个跟随重定向，一个不跟随
/// （登录提交需要检查 302 的目标地址）。
pub struct HttpSession {
    jar: Arc<Jar>,
    client: Client,
    no_redirect: Client,
}

impl HttpSession {
    /// 创建一个空会话
    pub fn new() -> AppResult<Self> {
        Self::with_jar(Arc::new(Jar::default()))
    }

    /// 用之前导出的 Cookie 字符串恢复会话
    ///
    /// # 参数
    /// - `base_url`: Cookie 所属站点
    /// - `cookie_header`: 形如 `JSESSIONID=abc; route=xyz`
    pub fn with_cookies(base_url: &str, cookie_header: &str) -> AppResult<Self> {
        let url = parse_url(base_url)?;
        let jar = Arc::new(Jar::default());
        for pair in cookie_header.split(';') {
            let pair = pair.trim();
            if pair.contains('=') {
                jar.add_cookie_str(pair, &url);
            }
        }
        Self::with_jar(jar)
    }

    fn with_jar(jar: Arc<Jar>) -> AppResult<Self> {
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        let no_redirect = Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(BROWSER_USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            jar,
            client,
            no_redirect,
        })
    }

    /// 导出当前站点的 Cookie，供下次运行复用
    pub fn cookie_header(&self, base_url: &str) -> Option<String> {
        let url = Url::parse(base_url).ok()?;
        self.jar
            .cookies(&url)
            .and_then(|value: HeaderValue| value.to_str().ok().map(str::to_string))
    }

    async fn read_response(url: &str, response: reqwest::Response) -> AppResult<HttpResponse> {
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::transport(url, e))?
            .to_vec();
        debug!("{} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpSession {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> AppResult<HttpResponse> {
        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AppError::transport(url, e))?;
        Self::read_response(url, response).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        timeout: Duration,
        follow_redirects: bool,
    ) -> AppResult<HttpResponse> {
        let client = if follow_redirects {
            &self.client
        } else {
            &self.no_redirect
        };
        let response = client
            .post(url)
            .form(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AppError::transport(url, e))?;
        Self::read_response(url, response).await
    }
}

fn parse_url(raw: &str) -> AppResult<Url> {
    Url::parse(raw).map_err(|e| AppError::transport(raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_round_trip() {
        let session =
            HttpSession::with_cookies("https://jwxs.example.edu.cn", "JSESSIONID=abc123; route=r1")
                .unwrap();
        let header = session
            .cookie_header("https://jwxs.example.edu.cn/index")
            .unwrap();
        assert!(header.contains("JSESSIONID=abc123"));
        assert!(header.contains("route=r1"));
    }

    #[test]
    fn test_empty_session_has_no_cookies() {
        let session = HttpSession::new().unwrap();
        assert!(session
            .cookie_header("https://jwxs.example.edu.cn")
            .is_none());
    }

    #[test]
    fn test_response_status_helpers() {
        let redirect = HttpResponse::redirect(302, "https://jwxs.example.edu.cn/index");
        assert!(redirect.is_redirect());
        assert!(!redirect.is_success());

        let failed = HttpResponse::new(503, "busy");
        assert!(failed.error_for_status("https://x").is_err());
    }

    #[test]
    fn test_json_decode_error_is_typed() {
        let response = HttpResponse::new(200, "<html>login</html>");
        let err = response.json::<serde_json::Value>("grades").unwrap_err();
        assert!(matches!(err, AppError::Decode { .. }));
    }
}
