use serde::Serialize;
use serde_json::Value;

/// 学业信息（总绩点与课程数）
///
/// `"N/A"` / `0` 是 "取不到" 的哨兵值，和真实的 0 绩点不同。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcademicInfo {
    pub gpa: String,
    pub course_count: u32,
}

impl AcademicInfo {
    pub const UNAVAILABLE_GPA: &'static str = "N/A";

    /// 取不到数据时的默认值
    pub fn unavailable() -> Self {
        Self {
            gpa: Self::UNAVAILABLE_GPA.to_string(),
            course_count: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.gpa != Self::UNAVAILABLE_GPA
    }

    /// 解析 `/main/academicInfo` 的响应
    ///
    /// 响应是数组，取第一个对象的 `gpa` 与 `courseNum_bxqyxd`；
    /// 两者任一缺失或为 null 都视为服务器数据尚未就绪，返回 None。
    pub fn from_response(data: &Value) -> Option<Self> {
        let info = data.as_array()?.first()?;
        let gpa = match info.get("gpa")? {
            Value::Null => return None,
            Value::String(s) if s.trim().is_empty() => return None,
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let course_count = parse_count(info.get("courseNum_bxqyxd")?)?;
        Some(Self { gpa, course_count })
    }
}

fn parse_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
