use crate::error::{AppError, AppResult, ConfigError};
use crate::utils::retry::RetryPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 教务系统根地址
    pub base_url: String,
    /// 普通页面请求超时（秒）
    pub request_timeout_secs: u64,
    /// 验证码图片下载超时（秒）
    pub captcha_timeout_secs: u64,
    /// 成绩页面与成绩接口超时（秒）
    pub grades_timeout_secs: u64,
    /// 登录最大尝试次数
    pub login_max_retries: usize,
    /// 验证码识别最大尝试次数
    pub captcha_max_retries: usize,
    /// 学业信息最大尝试次数
    pub academic_max_retries: usize,
    /// 学业信息重试间隔（秒）
    pub academic_retry_delay_secs: u64,
    /// "记住我" 凭证文件
    pub credentials_file: String,
    /// 会话 Cookie 文件
    pub session_file: String,
    /// 外部验证码识别命令（从 stdin 读图片，向 stdout 输出结果）
    pub ocr_command: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://jwxs.tiangong.edu.cn".to_string(),
            request_timeout_secs: 10,
            captcha_timeout_secs: 5,
            grades_timeout_secs: 15,
            login_max_retries: 5,
            captcha_max_retries: 5,
            academic_max_retries: 5,
            academic_retry_delay_secs: 2,
            credentials_file: "user_credentials.json".to_string(),
            session_file: "session_cookies.txt".to_string(),
            ocr_command: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的字段使用默认值
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，环境变量优先
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file(path.display().to_string(), e))?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            base_url: std::env::var("JWXS_BASE_URL").unwrap_or(self.base_url),
            request_timeout_secs: env_parse("JWXS_REQUEST_TIMEOUT").unwrap_or(self.request_timeout_secs),
            captcha_timeout_secs: env_parse("JWXS_CAPTCHA_TIMEOUT").unwrap_or(self.captcha_timeout_secs),
            grades_timeout_secs: env_parse("JWXS_GRADES_TIMEOUT").unwrap_or(self.grades_timeout_secs),
            login_max_retries: env_parse("JWXS_LOGIN_MAX_RETRIES").unwrap_or(self.login_max_retries),
            captcha_max_retries: env_parse("JWXS_CAPTCHA_MAX_RETRIES").unwrap_or(self.captcha_max_retries),
            academic_max_retries: env_parse("JWXS_ACADEMIC_MAX_RETRIES").unwrap_or(self.academic_max_retries),
            academic_retry_delay_secs: env_parse("JWXS_ACADEMIC_RETRY_DELAY").unwrap_or(self.academic_retry_delay_secs),
            credentials_file: std::env::var("JWXS_CREDENTIALS_FILE").unwrap_or(self.credentials_file),
            session_file: std::env::var("JWXS_SESSION_FILE").unwrap_or(self.session_file),
            ocr_command: std::env::var("JWXS_OCR_COMMAND").ok().or(self.ocr_command),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
        }
    }

    /// 校验配置并生成门户地址表
    pub fn endpoints(&self) -> AppResult<Endpoints> {
        Endpoints::new(&self.base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn captcha_timeout(&self) -> Duration {
        Duration::from_secs(self.captcha_timeout_secs)
    }

    pub fn grades_timeout(&self) -> Duration {
        Duration::from_secs(self.grades_timeout_secs)
    }

    /// 验证码下载重试：随机退避 1~2 秒
    pub fn captcha_policy(&self) -> RetryPolicy {
        RetryPolicy::uniform(
            self.captcha_max_retries,
            Duration::from_secs(1),
            Duration::from_secs(2),
        )
    }

    /// 登录重试：随机退避 2~4 秒
    pub fn login_policy(&self) -> RetryPolicy {
        RetryPolicy::uniform(
            self.login_max_retries,
            Duration::from_secs(2),
            Duration::from_secs(4),
        )
    }

    /// 学业信息重试：固定间隔
    pub fn academic_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.academic_max_retries,
            Duration::from_secs(self.academic_retry_delay_secs),
        )
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    std::env::var(var_name).ok().and_then(|v| v.trim().parse().ok())
}

/// 教务系统各页面与接口地址
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> AppResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url.to_string()).into());
        }
        Ok(Self {
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_page(&self) -> String {
        format!("{}/login", self.base_url)
    }

    pub fn login_submit(&self) -> String {
        format!("{}/j_spring_security_check", self.base_url)
    }

    pub fn captcha(&self) -> String {
        format!("{}/img/captcha.jpg", self.base_url)
    }

    pub fn grades_index(&self) -> String {
        format!(
            "{}/student/integratedQuery/scoreQuery/thisTermScores/index",
            self.base_url
        )
    }

    /// 成绩数据接口，路径段每个会话都不同
    pub fn grades_data(&self, segment: &str) -> String {
        format!(
            "{}/student/integratedQuery/scoreQuery/{}/thisTermScores/data",
            self.base_url, segment
        )
    }

    pub fn user_index(&self) -> String {
        format!("{}/index", self.base_url)
    }

    pub fn academic_info(&self) -> String {
        format!("{}/main/academicInfo", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_strip_trailing_slash() {
        let endpoints = Endpoints::new("https://jwxs.example.edu.cn/").unwrap();
        assert_eq!(endpoints.login_page(), "https://jwxs.example.edu.cn/login");
        assert_eq!(
            endpoints.grades_data("abc123"),
            "https://jwxs.example.edu.cn/student/integratedQuery/scoreQuery/abc123/thisTermScores/data"
        );
    }

    #[test]
    fn test_endpoints_reject_non_http() {
        assert!(Endpoints::new("jwxs.example.edu.cn").is_err());
    }

    #[test]
    fn test_load_from_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jwxs.toml");
        std::fs::write(
            &path,
            "base_url = \"https://portal.example.edu.cn\"\nlogin_max_retries = 3\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.login_max_retries, 3);
        assert_eq!(config.captcha_max_retries, 5);
        assert_eq!(config.academic_retry_delay_secs, 2);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "login_max_retries = \"many\"").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::TomlParseFailed { .. })));
    }
}
