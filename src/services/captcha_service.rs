//! 验证码服务 - 业务能力层
//!
//! 只负责 "下载验证码 → 识别 → 校验长度"，带有限次重试

use crate::config::Endpoints;
use crate::error::AppResult;
use crate::infrastructure::{CaptchaRecognizer, Transport};
use crate::utils::RetryPolicy;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 识别结果的合法长度（字符数）
pub const CAPTCHA_LENGTH: RangeInclusive<usize> = 3..=6;

/// 一次识别尝试
#[derive(Debug, Clone)]
pub struct CaptchaAttempt {
    pub attempt: usize,
    pub image: Vec<u8>,
    pub text: String,
}

impl CaptchaAttempt {
    pub fn is_plausible(&self) -> bool {
        CAPTCHA_LENGTH.contains(&self.text.chars().count())
    }
}

/// 验证码求解服务
///
/// 职责：
/// - 下载验证码图片（带超时）
/// - 调用识别引擎
/// - 丢弃长度不合理的结果并重试
pub struct CaptchaSolver {
    endpoints: Endpoints,
    timeout: Duration,
    policy: RetryPolicy,
    recognizer: Arc<dyn CaptchaRecognizer>,
}

impl CaptchaSolver {
    pub fn new(
        endpoints: Endpoints,
        timeout: Duration,
        policy: RetryPolicy,
        recognizer: Arc<dyn CaptchaRecognizer>,
    ) -> Self {
        Self {
            endpoints,
            timeout,
            policy,
            recognizer,
        }
    }

    /// 求解验证码，用尽次数返回 None
    pub async fn solve(&self, session: &dyn Transport) -> Option<String> {
        for attempt in 1..=self.policy.max_attempts {
            info!("尝试识别验证码 (第 {} 次)...", attempt);

            match self.try_once(session, attempt).await {
                Ok(result) if result.is_plausible() => {
                    info!("验证码识别成功: {}", result.text);
                    return Some(result.text);
                }
                Ok(result) => {
                    warn!(
                        "识别结果长度不合理 ({:?}, {} 字符)，重试",
                        result.text,
                        result.text.chars().count()
                    );
                }
                Err(e) if e.is_transport() => warn!("下载验证码失败: {}", e),
                Err(e) => warn!("{}", e),
            }

            self.policy.wait_after(attempt).await;
        }

        warn!("验证码识别最终失败 (已尝试 {} 次)", self.policy.max_attempts);
        None
    }

    async fn try_once(&self, session: &dyn Transport, attempt: usize) -> AppResult<CaptchaAttempt> {
        let url = self.endpoints.captcha();
        let image = session
            .get(&url, &[], self.timeout)
            .await?
            .error_for_status(&url)?
            .body;
        let text = self.recognizer.classify(&image).await?;
        Ok(CaptchaAttempt {
            attempt,
            image,
            text,
        })
    }
}
