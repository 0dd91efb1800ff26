//! 学业信息服务 - 业务能力层
//!
//! 登录后服务器的学业数据会延迟就绪，这里按固定间隔重试

use crate::config::Endpoints;
use crate::error::AppResult;
use crate::infrastructure::Transport;
use crate::models::AcademicInfo;
use crate::utils::RetryPolicy;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{info, warn};

/// 学业信息服务
pub struct AcademicInfoService {
    endpoints: Endpoints,
    timeout: Duration,
    policy: RetryPolicy,
}

impl AcademicInfoService {
    pub fn new(endpoints: Endpoints, timeout: Duration, policy: RetryPolicy) -> Self {
        Self {
            endpoints,
            timeout,
            policy,
        }
    }

    /// 获取 GPA 与课程数
    ///
    /// 第一个同时带有两项数据的响应即被接受（GPA 为 0 也算）；
    /// 用尽次数返回 `AcademicInfo::unavailable()`。
    pub async fn fetch_academic_info(&self, session: &dyn Transport) -> AcademicInfo {
        let url = self.endpoints.academic_info();
        info!("尝试从API {} 获取学业信息...", url);

        for attempt in 1..=self.policy.max_attempts {
            match self.try_fetch(session, &url).await {
                Ok(data) => match AcademicInfo::from_response(&data) {
                    Some(info) => {
                        info!(
                            "✓ 成功获取学业信息: GPA {}, 课程数 {}",
                            info.gpa, info.course_count
                        );
                        return info;
                    }
                    None => warn!(
                        "API返回数据不完整 (第 {}/{} 次)",
                        attempt, self.policy.max_attempts
                    ),
                },
                Err(e) => warn!("获取或解析学业信息失败: {}", e),
            }

            self.policy.wait_after(attempt).await;
        }

        warn!("达到最大重试次数，未能获取到有效的学业信息");
        AcademicInfo::unavailable()
    }

    async fn try_fetch(&self, session: &dyn Transport, url: &str) -> AppResult<JsonValue> {
        session
            .get(url, &[], self.timeout)
            .await?
            .error_for_status(url)?
            .json("学业信息")
    }
}
