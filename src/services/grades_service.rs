//! 成绩服务 - 业务能力层
//!
//! 两步：先在成绩首页找出本会话的接口路径段，再请求接口拿原始 JSON。
//! 整理工作交给 `processing`。

use crate::config::Endpoints;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{EndpointDiscoverer, RegexDiscoverer, Transport};
use crate::models::TermGroup;
use crate::processing;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 成绩服务
pub struct GradesService {
    endpoints: Endpoints,
    timeout: Duration,
    discoverer: Box<dyn EndpointDiscoverer>,
}

impl GradesService {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Self {
        Self::with_discoverer(endpoints, timeout, Box::new(RegexDiscoverer::default()))
    }

    pub fn with_discoverer(
        endpoints: Endpoints,
        timeout: Duration,
        discoverer: Box<dyn EndpointDiscoverer>,
    ) -> Self {
        Self {
            endpoints,
            timeout,
            discoverer,
        }
    }

    /// 获取全部成绩，按学期从新到旧
    ///
    /// 任何一步失败都返回空列表。
    pub async fn fetch_grades(&self, session: &dyn Transport) -> Vec<TermGroup> {
        match self.try_fetch(session).await {
            Ok(terms) => {
                info!("✓ 成功获取 {} 个学期的成绩", terms.len());
                terms
            }
            Err(e) => {
                warn!("获取成绩失败: {}", e);
                Vec::new()
            }
        }
    }

    /// 在成绩首页里找出数据接口地址
    pub async fn discover_data_url(&self, session: &dyn Transport) -> AppResult<String> {
        let index_url = self.endpoints.grades_index();
        info!("正在访问成绩页面...");
        let page = session
            .get(&index_url, &[], self.timeout)
            .await?
            .error_for_status(&index_url)?;

        let segment = self.discoverer.discover(&page.text()).ok_or_else(|| {
            AppError::DataShape("成绩页面中没有找到数据接口路径".to_string())
        })?;
        debug!("成绩接口路径段: {}", segment);
        Ok(self.endpoints.grades_data(&segment))
    }

    async fn try_fetch(&self, session: &dyn Transport) -> AppResult<Vec<TermGroup>> {
        let data_url = self.discover_data_url(session).await?;
        let index_url = self.endpoints.grades_index();
        let headers = [
            ("Referer", index_url.as_str()),
            ("X-Requested-With", "XMLHttpRequest"),
        ];

        info!("正在请求成绩数据...");
        let data: JsonValue = session
            .get(&data_url, &headers, self.timeout)
            .await?
            .error_for_status(&data_url)?
            .json("成绩数据")?;

        Ok(processing::process_grades(&data))
    }
}
