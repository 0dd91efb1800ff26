//! 成绩数据处理模块
//!
//! 把成绩接口返回的嵌套 JSON 整理成按学期分组、从新到旧排好序的结果：
//!
//! 1. 扁平化：所有嵌套的 `list` 合并成一个原始成绩序列
//! 2. 规范化：分数校验、缺省字段补 "N/A"
//! 3. 分组：按学期显示名分组，组内保持接口顺序
//! 4. 排序：(起始年份, 季节序) 升序，再整体反转为从新到旧
//! 5. 标注：学期标签（大一上、大二下…）和当前学期标记

use crate::infrastructure::markup::capture_first;
use crate::models::grade::{NormalizedCourse, RawGradeRecord, Season, TermGroup};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

static ACADEMIC_YEAR: OnceLock<Regex> = OnceLock::new();

fn academic_year() -> &'static Regex {
    ACADEMIC_YEAR.get_or_init(|| {
        Regex::new(r"(\d{4})\s*-\s*\d{4}").expect("academic year pattern is valid")
    })
}

/// 排序用的学期键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TermKey {
    start_year: Option<i32>,
    season: Season,
}

impl TermKey {
    fn parse(term_name: &str) -> Self {
        Self {
            start_year: capture_first(academic_year(), term_name).and_then(|y| y.parse().ok()),
            season: Season::from_term_name(term_name),
        }
    }

    // 没有学年的学期（如 "当前学期"）排在所有有学年的学期之后
    fn sort_key(&self) -> (i32, u8) {
        (self.start_year.unwrap_or(i32::MAX), self.season.rank())
    }
}

/// 把成绩接口的 JSON 扁平化为原始成绩序列
///
/// - `list` 数组里的对象都视为一条成绩，除非它自己还带着 `list`
/// - 其他位置含 `courseName` 的对象也视为一条成绩
/// - 容器对象上的 `termName` 作为其下成绩的学期名兜底
pub fn flatten_records(data: &Value) -> Vec<RawGradeRecord> {
    let mut records = Vec::new();
    collect_records(data, None, false, &mut records);
    debug!("扁平化得到 {} 条成绩", records.len());
    records
}

fn collect_records(
    value: &Value,
    group_term: Option<&str>,
    in_list: bool,
    out: &mut Vec<RawGradeRecord>,
) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_records(item, group_term, in_list, out);
            }
        }
        Value::Object(map) if is_record(map, in_list) => {
            match serde_json::from_value::<RawGradeRecord>(value.clone()) {
                Ok(mut record) => {
                    record.group_term_name = group_term.map(str::to_string);
                    out.push(record);
                }
                Err(e) => warn!("跳过无法解析的成绩记录: {}", e),
            }
        }
        Value::Object(map) => {
            let term = map
                .get("termName")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .or(group_term);
            for (key, child) in map {
                match child {
                    Value::Array(_) => collect_records(child, term, key == "list", out),
                    Value::Object(_) => collect_records(child, term, false, out),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn is_record(map: &Map<String, Value>, in_list: bool) -> bool {
    map.contains_key("courseName") || (in_list && !map.contains_key("list"))
}

/// 分组、排序、标注，返回从新到旧的学期列表
pub fn build_term_groups(records: &[RawGradeRecord]) -> Vec<TermGroup> {
    let mut groups: Vec<(String, Vec<NormalizedCourse>)> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    for record in records {
        let term_name = record.term_display_name();
        let idx = *index_by_name.entry(term_name.clone()).or_insert_with(|| {
            groups.push((term_name, Vec::new()));
            groups.len() - 1
        });
        groups[idx].1.push(NormalizedCourse::from_raw(record));
    }

    let mut keyed: Vec<(TermKey, String, Vec<NormalizedCourse>)> = groups
        .into_iter()
        .map(|(name, list)| (TermKey::parse(&name), name, list))
        .collect();
    keyed.sort_by_key(|(key, _, _)| key.sort_key());

    let base_year = keyed.iter().filter_map(|(key, _, _)| key.start_year).min();

    let mut terms: Vec<TermGroup> = keyed
        .into_iter()
        .map(|(key, term_name, list)| TermGroup {
            term_label: term_label(&key, base_year),
            term_name,
            list,
            is_current: false,
        })
        .collect();

    terms.reverse();
    if let Some(newest) = terms.first_mut() {
        newest.is_current = true;
    }
    terms
}

/// 扁平化 + 分组的便捷组合
pub fn process_grades(data: &Value) -> Vec<TermGroup> {
    build_term_groups(&flatten_records(data))
}

fn term_label(key: &TermKey, base_year: Option<i32>) -> Option<String> {
    let half = key.season.half()?;
    let year_index = key.start_year? - base_year? + 1;
    Some(format!("大{}{}", ordinal(year_index), half))
}

fn ordinal(n: i32) -> String {
    match n {
        1 => "一".to_string(),
        2 => "二".to_string(),
        3 => "三".to_string(),
        4 => "四".to_string(),
        5 => "五".to_string(),
        _ => n.to_string(),
    }
}
