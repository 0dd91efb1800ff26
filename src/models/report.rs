use crate::models::academic::AcademicInfo;
use crate::models::grade::TermGroup;
use serde::Serialize;

/// 当前学期统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CurrentStats {
    /// 有效分数且 ≥ 60 的课程数
    pub passed: usize,
    /// 已出有效分数的课程数
    pub announced: usize,
    /// 课程总数
    pub total: usize,
}

impl CurrentStats {
    /// 根据当前学期和学业信息计算统计
    ///
    /// `total` 优先使用学业信息里的课程数；为 0 时退回当前学期的课程条数。
    /// 接口说 0 门课和接口没给课程数在这里无法区分，两者都会走退回逻辑。
    pub fn compute(terms: &[TermGroup], academic: &AcademicInfo) -> Self {
        let current = terms.iter().find(|t| t.is_current);
        let courses = current.map(|t| t.list.as_slice()).unwrap_or_default();

        let announced = courses.iter().filter(|c| c.is_valid_score).count();
        let passed = courses.iter().filter(|c| c.is_passed()).count();
        let total = if academic.course_count > 0 {
            academic.course_count as usize
        } else {
            courses.len()
        };

        Self {
            passed,
            announced,
            total,
        }
    }
}

/// 一次抓取的汇总结果，交给展示层
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeReport {
    pub success: bool,
    /// 登录学号（已知时）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub user_name: String,
    pub overall_gpa: String,
    pub current_stats: CurrentStats,
    pub all_grades: Vec<TermGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScrapeReport {
    /// 失败结果，只带提示信息
    pub fn failure(message: impl Into<String>) -> Self {
        Self::notice(false, message)
    }

    /// 不含成绩数据的结果（如退出登录）
    pub fn notice(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            username: None,
            user_name: String::new(),
            overall_gpa: AcademicInfo::UNAVAILABLE_GPA.to_string(),
            current_stats: CurrentStats::default(),
            all_grades: Vec::new(),
            message: Some(message.into()),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
