//! 抓取流程 - 流程层
//!
//! 已登录会话 → 用户姓名 + 成绩 + 学业信息 → `ScrapeReport`

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::Transport;
use crate::models::{AcademicInfo, CurrentStats, ScrapeReport, TermGroup};
use crate::services::{AcademicInfoService, GradesService, UserService};
use tracing::info;

pub struct ScrapeFlow {
    user: UserService,
    grades: GradesService,
    academic: AcademicInfoService,
}

impl ScrapeFlow {
    pub fn new(user: UserService, grades: GradesService, academic: AcademicInfoService) -> Self {
        Self {
            user,
            grades,
            academic,
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let endpoints = config.endpoints()?;
        Ok(Self::new(
            UserService::new(endpoints.clone(), config.request_timeout()),
            GradesService::new(endpoints.clone(), config.grades_timeout()),
            AcademicInfoService::new(endpoints, config.request_timeout(), config.academic_policy()),
        ))
    }

    pub fn user_service(&self) -> &UserService {
        &self.user
    }

    /// 依次获取姓名、成绩、学业信息并汇总
    ///
    /// 没有任何成绩时 `success` 为 false，其余字段照常填写。
    pub async fn run(&self, session: &dyn Transport) -> ScrapeReport {
        info!("📥 开始获取数据...");
        let user_name = self.user.fetch_user_name(session).await;
        let terms = self.grades.fetch_grades(session).await;
        let academic = self.academic.fetch_academic_info(session).await;
        assemble_report(user_name, terms, &academic)
    }
}

/// 组装汇总结果
pub fn assemble_report(
    user_name: String,
    terms: Vec<TermGroup>,
    academic: &AcademicInfo,
) -> ScrapeReport {
    ScrapeReport {
        success: !terms.is_empty(),
        username: None,
        user_name,
        overall_gpa: academic.gpa.clone(),
        current_stats: CurrentStats::compute(&terms, academic),
        all_grades: terms,
        message: None,
    }
}
