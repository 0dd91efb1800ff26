use serde::{Deserialize, Serialize};

/// 学期季节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    /// 秋季（第一学期）
    Autumn,
    /// 春季（第二学期）
    Spring,
    /// 夏季小学期
    Summer,
    /// 无法识别
    Other,
}

impl Season {
    /// 从门户的学期代码解析
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Season::Autumn),
            "2" => Some(Season::Spring),
            "3" => Some(Season::Summer),
            _ => None,
        }
    }

    /// 从学期显示名解析
    pub fn from_term_name(name: &str) -> Self {
        if name.contains('秋') {
            Season::Autumn
        } else if name.contains('春') {
            Season::Spring
        } else if name.contains('夏') {
            Season::Summer
        } else {
            Season::Other
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Season::Autumn => "秋季",
            Season::Spring => "春季",
            Season::Summer => "夏季",
            Season::Other => "其他",
        }
    }

    /// 同一学年内的先后顺序：秋 1，春 2，其余 3
    pub fn rank(self) -> u8 {
        match self {
            Season::Autumn => 1,
            Season::Spring => 2,
            Season::Summer | Season::Other => 3,
        }
    }

    /// 学期标签后缀：秋 "上"，春 "下"，其余没有标签
    pub fn half(self) -> Option<&'static str> {
        match self {
            Season::Autumn => Some("上"),
            Season::Spring => Some("下"),
            Season::Summer | Season::Other => None,
        }
    }
}

/// 门户返回的一条原始成绩
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGradeRecord {
    #[serde(rename = "courseName", default, deserialize_with = "lenient_string")]
    pub course_name: Option<String>,

    /// 可能是数字、字符串（如 "缺考"）或 null
    #[serde(rename = "courseScore", default, deserialize_with = "lenient_string")]
    pub course_score: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub credit: Option<String>,

    #[serde(rename = "gradePoint", default, deserialize_with = "lenient_string")]
    pub grade_point: Option<String>,

    #[serde(rename = "levelName", default, deserialize_with = "lenient_string")]
    pub level_name: Option<String>,

    #[serde(rename = "examTypeCode", default, deserialize_with = "lenient_string")]
    pub exam_type_code: Option<String>,

    #[serde(rename = "examTypeName", default, deserialize_with = "lenient_string")]
    pub exam_type_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub operatetime: Option<String>,

    /// 学年，如 "2022-2023"
    #[serde(rename = "academicYearCode", default, deserialize_with = "lenient_string")]
    pub academic_year_code: Option<String>,

    /// 学期代码："1" 秋，"2" 春，"3" 夏
    #[serde(rename = "termCode", default, deserialize_with = "lenient_string")]
    pub term_code: Option<String>,

    /// 部分接口直接给出学期名
    #[serde(rename = "termName", default, deserialize_with = "lenient_string")]
    pub term_name: Option<String>,

    /// 所在容器对象上的 `termName`，扁平化时填入
    #[serde(skip)]
    pub group_term_name: Option<String>,
}

impl RawGradeRecord {
    /// 学期显示名，如 "2022-2023学年 秋季学期"
    pub fn term_display_name(&self) -> String {
        let year = non_blank(self.academic_year_code.as_deref());
        let code = non_blank(self.term_code.as_deref());

        if let (Some(year), Some(code)) = (year, code) {
            return match Season::from_code(code) {
                Some(season) => format!("{}学年 {}学期", year, season.name()),
                None => format!("{}学年 第{}学期", year, code),
            };
        }

        [self.term_name.as_deref(), self.group_term_name.as_deref()]
            .into_iter()
            .filter_map(non_blank)
            .find(|name| *name != "未知学期")
            .unwrap_or("当前学期")
            .to_string()
    }
}

/// 规范化后的课程成绩
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCourse {
    pub course_name: String,
    /// 只有能解析为有限数字时才有值
    pub course_score: Option<String>,
    pub is_valid_score: bool,
    pub credit: String,
    pub grade_point: String,
    pub level_name: String,
    pub exam_type_name: String,
    pub operatetime: String,
}

impl NormalizedCourse {
    pub fn from_raw(raw: &RawGradeRecord) -> Self {
        let course_score = validate_score(raw.course_score.as_deref());
        Self {
            course_name: or_default(raw.course_name.as_deref(), "未知课程"),
            is_valid_score: course_score.is_some(),
            course_score,
            credit: or_default(raw.credit.as_deref(), "N/A"),
            grade_point: or_default(raw.grade_point.as_deref(), "N/A"),
            level_name: or_default(raw.level_name.as_deref(), "N/A"),
            exam_type_name: exam_type_name(raw),
            operatetime: or_default(raw.operatetime.as_deref(), "N/A"),
        }
    }

    /// 分数数值（无效分数为 None）
    pub fn score_value(&self) -> Option<f64> {
        self.course_score.as_deref().and_then(|s| s.parse().ok())
    }

    /// 已出成绩且不低于 60 分
    pub fn is_passed(&self) -> bool {
        self.score_value().is_some_and(|v| v >= 60.0)
    }
}

/// 一个学期的成绩
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermGroup {
    pub term_name: String,
    /// 如 "大二上"；夏季学期和无法识别学年的学期没有标签
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_label: Option<String>,
    pub list: Vec<NormalizedCourse>,
    pub is_current: bool,
}

/// 校验原始分数：去空白后能解析为有限数字才算有效
pub fn validate_score(raw: Option<&str>) -> Option<String> {
    let cleaned = raw?.trim();
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(cleaned.to_string()),
        _ => None,
    }
}

fn exam_type_name(raw: &RawGradeRecord) -> String {
    if let Some(name) = non_blank(raw.exam_type_name.as_deref()) {
        return name.to_string();
    }
    match non_blank(raw.exam_type_code.as_deref()) {
        Some("01") | Some("1") => "正常考试".to_string(),
        Some("02") | Some("2") => "补考".to_string(),
        Some("03") | Some("3") => "缓考".to_string(),
        Some("04") | Some("4") => "重修".to_string(),
        Some(code) => code.to_string(),
        None => "N/A".to_string(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn or_default(value: Option<&str>, default: &str) -> String {
    non_blank(value).unwrap_or(default).to_string()
}

// 门户的字段类型不稳定：同一个字段可能是字符串、数字或 null
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct LenientVisitor;

    impl<'de> Visitor<'de> for LenientVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number, bool or null")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(LenientVisitor)
        }
    }

    deserializer.deserialize_any(LenientVisitor)
}
