//! 应用编排 - 编排层
//!
//! ## 职责
//!
//! 1. **资源装配**：按配置构造各服务和流程，初始化识别引擎
//! 2. **会话管理**：创建 / 恢复 / 保存会话 Cookie
//! 3. **模式调度**：手动登录、自动登录、退出登录
//! 4. **结果汇总**：把流程结果转成给用户看的 `ScrapeReport`

use crate::config::Config;
use crate::infrastructure::ocr::global_engine;
use crate::infrastructure::{
    CaptchaRecognizer, CharsetFilter, CommandRecognizer, HttpSession, Transport,
    UnconfiguredRecognizer,
};
use crate::models::{Credentials, ScrapeReport, StoredCredentials};
use crate::services::password::storage_hash;
use crate::services::{CaptchaSolver, CredentialStore, SessionFile, TokenService};
use crate::utils::logging::{log_startup, log_summary};
use crate::workflow::{LoginFlow, ScrapeFlow};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const MSG_MISSING_CREDENTIALS: &str = "缺少学号或密码。";
pub const MSG_TOKEN_FAILED: &str = "获取Token失败，请重试。";
pub const MSG_LOGIN_FAILED: &str = "登录失败，请检查学号、密码或验证码。";
pub const MSG_GRADES_FAILED: &str = "登录成功，但获取成绩失败。";
pub const MSG_SESSION_EXPIRED: &str = "会话已过期，请手动登录。";
pub const MSG_PLEASE_LOGIN: &str = "请登录。";
pub const MSG_LOGGED_OUT: &str = "已成功退出登录。";

/// 手动登录请求
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub credentials: Credentials,
    /// 是否 "记住我"
    pub save_info: bool,
}

/// 运行模式
#[derive(Debug, Clone)]
pub enum Mode {
    Login(LoginRequest),
    Auto,
    Logout,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Login(_) => "手动登录",
            Mode::Auto => "自动登录",
            Mode::Logout => "退出登录",
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    login: LoginFlow,
    scrape: ScrapeFlow,
    credentials: CredentialStore,
    session_file: SessionFile,
}

impl App {
    /// 按配置初始化应用，识别引擎使用进程级单例
    pub fn initialize(config: Config) -> Result<Self> {
        let ocr_command = config.ocr_command.clone();
        let recognizer = global_engine(move || build_recognizer(ocr_command.as_deref()));
        Self::with_recognizer(config, recognizer)
    }

    /// 使用指定的识别引擎初始化应用
    pub fn with_recognizer(config: Config, recognizer: Arc<dyn CaptchaRecognizer>) -> Result<Self> {
        let endpoints = config.endpoints().context("教务系统地址无效")?;

        let captcha = CaptchaSolver::new(
            endpoints.clone(),
            config.captcha_timeout(),
            config.captcha_policy(),
            recognizer,
        );
        let login = LoginFlow::new(
            endpoints.clone(),
            config.request_timeout(),
            config.login_policy(),
            TokenService::new(endpoints, config.request_timeout()),
            captcha,
        );
        let scrape = ScrapeFlow::from_config(&config)?;

        Ok(Self {
            credentials: CredentialStore::new(&config.credentials_file),
            session_file: SessionFile::new(&config.session_file),
            login,
            scrape,
            config,
        })
    }

    /// 按模式运行
    pub async fn run(&self, mode: Mode) -> Result<ScrapeReport> {
        log_startup(mode.name(), &self.config.base_url);

        let report = match mode {
            Mode::Login(request) => {
                let session = HttpSession::new().context("创建HTTP会话失败")?;
                let report = self.login_and_scrape(&session, &request).await;
                if report.success {
                    self.save_session(&session).await;
                }
                report
            }
            Mode::Auto => {
                let session = self.restore_session().await?;
                self.resume_and_scrape(&session).await
            }
            Mode::Logout => self.logout().await,
        };

        log_summary(report.success, report.all_grades.len(), &report.overall_gpa);
        Ok(report)
    }

    /// 手动登录并抓取数据
    pub async fn login_and_scrape(
        &self,
        session: &dyn Transport,
        request: &LoginRequest,
    ) -> ScrapeReport {
        let credentials = &request.credentials;
        if !credentials.is_complete() {
            return ScrapeReport::failure(MSG_MISSING_CREDENTIALS);
        }

        info!("尝试手动登录账号: {}...", credentials.username);
        let Some(token) = self.login.fetch_token(session).await else {
            return ScrapeReport::failure(MSG_TOKEN_FAILED);
        };

        let outcome = self.login.run(session, credentials, token).await;
        if let Err(e) = outcome.into_result() {
            warn!("登录未成功: {}", e);
            return ScrapeReport::failure(MSG_LOGIN_FAILED);
        }

        let report = self.scrape.run(session).await;
        if !report.success {
            return ScrapeReport::failure(MSG_GRADES_FAILED);
        }

        self.remember(request).await;
        report.with_username(credentials.username.clone())
    }

    /// 复用已有会话抓取数据
    pub async fn resume_and_scrape(&self, session: &dyn Transport) -> ScrapeReport {
        let saved_username = match self.credentials.load().await {
            Ok(saved) => saved.map(|c| c.username),
            Err(e) => {
                warn!("读取登录信息失败: {}", e);
                None
            }
        };

        if self.scrape.user_service().has_valid_session(session).await {
            info!("现有会话有效");
            let report = self.scrape.run(session).await;
            if report.success {
                return match saved_username {
                    Some(username) => report.with_username(username),
                    None => report,
                };
            }
        }

        let message = if saved_username.is_some() {
            MSG_SESSION_EXPIRED
        } else {
            MSG_PLEASE_LOGIN
        };
        let report = ScrapeReport::failure(message);
        match saved_username {
            Some(username) => report.with_username(username),
            None => report,
        }
    }

    /// 清除保存的凭证和会话
    pub async fn logout(&self) -> ScrapeReport {
        if let Err(e) = self.session_file.clear().await {
            error!("清除会话失败: {}", e);
        }
        if let Err(e) = self.credentials.clear().await {
            error!("清除凭证失败: {}", e);
        }
        info!("👋 {}", MSG_LOGGED_OUT);
        ScrapeReport::notice(true, MSG_LOGGED_OUT)
    }

    async fn remember(&self, request: &LoginRequest) {
        let result = if request.save_info {
            let stored = StoredCredentials {
                username: request.credentials.username.clone(),
                hashed_password_for_storage: storage_hash(request.credentials.password()),
            };
            self.credentials.save(&stored).await
        } else {
            self.credentials.clear().await
        };
        if let Err(e) = result {
            error!("更新登录信息失败: {}", e);
        }
    }

    async fn restore_session(&self) -> Result<HttpSession> {
        let saved = match self.session_file.load().await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("读取会话失败: {}", e);
                None
            }
        };
        let session = match saved {
            Some(cookies) => HttpSession::with_cookies(&self.config.base_url, &cookies),
            None => HttpSession::new(),
        };
        session.context("创建HTTP会话失败")
    }

    async fn save_session(&self, session: &HttpSession) {
        let Some(cookies) = session.cookie_header(&self.config.base_url) else {
            warn!("会话中没有可保存的 Cookie");
            return;
        };
        if let Err(e) = self.session_file.save(&cookies).await {
            error!("保存会话失败: {}", e);
        }
    }
}

/// 按配置构造识别引擎，输出统一过滤到验证码字母表
fn build_recognizer(ocr_command: Option<&str>) -> Arc<dyn CaptchaRecognizer> {
    match ocr_command.map(CommandRecognizer::from_command_line) {
        Some(Ok(command)) => Arc::new(CharsetFilter::new(command)),
        Some(Err(e)) => {
            error!("识别命令无效: {}", e);
            Arc::new(UnconfiguredRecognizer)
        }
        None => {
            warn!("未配置验证码识别程序，登录将无法完成");
            Arc::new(UnconfiguredRecognizer)
        }
    }
}
