//! 验证码识别 - 基础设施层
//!
//! 识别引擎是进程级资源：首次使用时构造，之后只读共享。

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// 验证码允许出现的字符
pub const CAPTCHA_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// 识别能力：图片字节 → 文本
#[async_trait]
pub trait CaptchaRecognizer: Send + Sync {
    async fn classify(&self, image: &[u8]) -> AppResult<String>;
}

static OCR_ENGINE: OnceLock<Arc<dyn CaptchaRecognizer>> = OnceLock::new();

/// 获取进程级识别引擎，首次调用时用 `init` 构造
pub fn global_engine<F>(init: F) -> Arc<dyn CaptchaRecognizer>
where
    F: FnOnce() -> Arc<dyn CaptchaRecognizer>,
{
    OCR_ENGINE
        .get_or_init(|| {
            info!("验证码识别引擎已初始化");
            init()
        })
        .clone()
}

/// 把任意引擎的输出限制在给定字母表内
///
/// 大写转小写，其余不在字母表里的字符直接丢弃。
pub struct CharsetFilter<R> {
    inner: R,
    alphabet: &'static str,
}

impl<R: CaptchaRecognizer> CharsetFilter<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            alphabet: CAPTCHA_ALPHABET,
        }
    }

    fn filter(&self, raw: &str) -> String {
        raw.chars()
            .flat_map(char::to_lowercase)
            .filter(|c| self.alphabet.contains(*c))
            .collect()
    }
}

#[async_trait]
impl<R: CaptchaRecognizer> CaptchaRecognizer for CharsetFilter<R> {
    async fn classify(&self, image: &[u8]) -> AppResult<String> {
        let raw = self.inner.classify(image).await?;
        let filtered = self.filter(&raw);
        if filtered != raw {
            debug!("识别结果已过滤: {:?} -> {:?}", raw, filtered);
        }
        Ok(filtered)
    }
}

/// 调用外部识别程序
///
/// 图片写入子进程 stdin，识别结果从 stdout 读取（去掉首尾空白）。
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    /// 解析形如 `python3 ocr.py --model small` 的命令行
    pub fn from_command_line(command_line: &str) -> AppResult<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| AppError::Ocr("识别命令为空".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl CaptchaRecognizer for CommandRecognizer {
    async fn classify(&self, image: &[u8]) -> AppResult<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Ocr(format!("无法启动 {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image)
                .await
                .map_err(|e| AppError::Ocr(format!("写入图片失败: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AppError::Ocr(format!("等待识别程序失败: {}", e)))?;
        if !output.status.success() {
            return Err(AppError::Ocr(format!(
                "{} 退出码 {:?}",
                self.program,
                output.status.code()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// 未配置识别程序时使用：每次都失败
pub struct UnconfiguredRecognizer;

#[async_trait]
impl CaptchaRecognizer for UnconfiguredRecognizer {
    async fn classify(&self, _image: &[u8]) -> AppResult<String> {
        Err(AppError::Ocr(
            "未配置验证码识别程序 (JWXS_OCR_COMMAND)".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl CaptchaRecognizer for Fixed {
        async fn classify(&self, _image: &[u8]) -> AppResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_charset_filter_lowercases_and_drops() {
        let filter = CharsetFilter::new(Fixed("Ab-3 x!"));
        assert_eq!(filter.classify(b"img").await.unwrap(), "ab3x");
    }

    #[test]
    fn test_command_line_parsing() {
        let recognizer = CommandRecognizer::from_command_line("python3 ocr.py --small").unwrap();
        assert_eq!(recognizer.program, "python3");
        assert_eq!(recognizer.args, vec!["ocr.py", "--small"]);
        assert!(CommandRecognizer::from_command_line("   ").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_recognizer_fails() {
        assert!(UnconfiguredRecognizer.classify(b"img").await.is_err());
    }

    #[test]
    fn test_global_engine_initializes_once() {
        let first = global_engine(|| Arc::new(Fixed("abcd")) as Arc<dyn CaptchaRecognizer>);
        let second = global_engine(|| Arc::new(Fixed("zzzz")) as Arc<dyn CaptchaRecognizer>);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
