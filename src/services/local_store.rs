//! 本地存储 - 业务能力层
//!
//! - `CredentialStore`: "记住我" 文件，只保存学号和密码的存储哈希
//! - `SessionFile`: 会话 Cookie，供下次自动登录复用

use crate::error::{AppError, AppResult};
use crate::models::StoredCredentials;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// 删除文件，文件不存在不算错误
async fn remove_if_exists(path: &Path) -> AppResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::file(path.display().to_string(), e)),
    }
}

/// 读取文件，文件不存在返回 None
async fn read_if_exists(path: &Path) -> AppResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::file(path.display().to_string(), e)),
    }
}

/// "记住我" 凭证文件
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, credentials: &StoredCredentials) -> AppResult<()> {
        let content = serde_json::to_string(credentials)
            .map_err(|e| AppError::decode("登录信息", e))?;
        fs::write(&self.path, content)
            .await
            .map_err(|e| AppError::file(self.path.display().to_string(), e))?;
        info!("💾 登录信息已保存到 {}", self.path.display());
        Ok(())
    }

    /// 读取保存的凭证
    ///
    /// 文件损坏时删除它并按 "没有保存" 处理。
    pub async fn load(&self) -> AppResult<Option<StoredCredentials>> {
        let Some(content) = read_if_exists(&self.path).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<StoredCredentials>(&content) {
            Ok(credentials) => {
                info!("从 {} 加载登录信息成功", self.path.display());
                Ok(Some(credentials))
            }
            Err(e) => {
                warn!("加载登录信息失败，文件可能已损坏: {}", e);
                remove_if_exists(&self.path).await?;
                Ok(None)
            }
        }
    }

    pub async fn clear(&self) -> AppResult<()> {
        remove_if_exists(&self.path).await
    }
}

/// 会话 Cookie 文件，内容是一行 `Cookie` 请求头
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn save(&self, cookie_header: &str) -> AppResult<()> {
        fs::write(&self.path, cookie_header)
            .await
            .map_err(|e| AppError::file(self.path.display().to_string(), e))?;
        info!("💾 会话已保存到 {}", self.path.display());
        Ok(())
    }

    pub async fn load(&self) -> AppResult<Option<String>> {
        Ok(read_if_exists(&self.path)
            .await?
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty()))
    }

    pub async fn clear(&self) -> AppResult<()> {
        remove_if_exists(&self.path).await
    }
}
