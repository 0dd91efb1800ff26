//! 页面查询 - 基础设施层
//!
//! 只负责在 HTML / 文本里找东西，不关心找到的值用来干什么

use regex::Regex;
use scraper::{Html, Selector};

/// 找到第一个 `<tag filter_name="filter_value">` 元素并返回其 `attribute` 属性
///
/// # 参数
/// - `html`: 页面源码
/// - `tag`: 标签名，如 `input`
/// - `filter`: 用于定位元素的 (属性名, 属性值)
/// - `attribute`: 要读取的属性名
pub fn find_attribute(
    html: &str,
    tag: &str,
    filter: (&str, &str),
    attribute: &str,
) -> Option<String> {
    let selector = Selector::parse(&format!(r#"{}[{}="{}"]"#, tag, filter.0, filter.1)).ok()?;
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .find_map(|element| element.value().attr(attribute))
        .map(str::to_string)
}

/// 返回第一个匹配 CSS 选择器的元素的文本（去掉首尾空白），空文本视为不存在
pub fn find_text(html: &str, css_selector: &str) -> Option<String> {
    let selector = Selector::parse(css_selector).ok()?;
    let document = Html::parse_document(html);
    let element = document.select(&selector).next()?;
    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// 返回正则第一个捕获组的内容
pub fn find_regex(text: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    capture_first(&re, text)
}

/// 用已编译的正则取第一个捕获组，空捕获视为不存在
pub fn capture_first(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

/// 从成绩首页源码里找出本会话的成绩接口路径段
///
/// 门户每个会话都会换一个随机路径段，发现规则单独抽出来，便于替换。
pub trait EndpointDiscoverer: Send + Sync {
    fn discover(&self, html: &str) -> Option<String>;
}

/// 默认规则：`scoreQuery/<段>/thisTermScores/data`
pub struct RegexDiscoverer {
    pattern: Regex,
}

impl RegexDiscoverer {
    pub const DEFAULT_PATTERN: &'static str = r"scoreQuery/(.*?)/thisTermScores/data";

    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Default for RegexDiscoverer {
    fn default() -> Self {
        Self {
            pattern: Regex::new(Self::DEFAULT_PATTERN).expect("default discovery pattern is valid"),
        }
    }
}

impl EndpointDiscoverer for RegexDiscoverer {
    fn discover(&self, html: &str) -> Option<String> {
        capture_first(&self.pattern, html)
    }
}
