use thiserror::Error;

/// 应用程序错误类型
///
/// 各组件在自身边界处把这些错误折叠成 `Option` / `bool` / 哨兵值，
/// 不会让门户侧的异常终止整条抓取流程。
#[derive(Debug, Error)]
pub enum AppError {
    /// 网络层失败（连接、超时等）
    #[error("网络请求失败 ({url}): {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 服务器返回了非预期的 HTTP 状态码
    #[error("HTTP 状态异常 ({url}): {status}")]
    HttpStatus { url: String, status: u16 },

    /// 门户拒绝了登录（验证码或账号密码错误）
    #[error("门户拒绝请求: {0}")]
    PortalRejection(String),

    /// 页面或 JSON 缺少预期字段
    #[error("数据结构异常: {0}")]
    DataShape(String),

    /// JSON 解析失败
    #[error("JSON解析失败 ({context}): {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// 验证码识别引擎错误
    #[error("验证码识别失败: {0}")]
    Ocr(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 文件操作错误
    #[error("文件操作失败 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// 基础 URL 不合法
    #[error("基础 URL 不合法: {0}")]
    InvalidBaseUrl(String),
}

// ========== 从常见错误类型转换 ==========

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        AppError::Transport {
            url,
            source: Box::new(err),
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建网络层错误
    pub fn transport(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Transport {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// 用一段描述创建网络层错误（测试桩与外部进程使用）
    pub fn transport_msg(url: impl Into<String>, message: impl Into<String>) -> Self {
        let message: String = message.into();
        AppError::Transport {
            url: url.into(),
            source: message.into(),
        }
    }

    /// 创建 JSON 解析错误
    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        AppError::Decode {
            context: context.into(),
            source,
        }
    }

    /// 创建文件操作错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }

    /// 是否属于网络层失败（可按重试策略重试）
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport { .. } | AppError::HttpStatus { .. })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
