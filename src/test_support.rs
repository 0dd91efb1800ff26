//! 单元测试用的传输与识别桩

use crate::error::{AppError, AppResult};
use crate::infrastructure::{CaptchaRecognizer, HttpResponse, Transport};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub const BASE: &str = "https://jwxs.test";

/// 预设的一次响应
#[derive(Clone)]
pub enum Scripted {
    Response(HttpResponse),
    Fail(&'static str),
}

impl Scripted {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Scripted::Response(HttpResponse::new(200, body))
    }

    pub fn redirect(location: &str) -> Self {
        Scripted::Response(HttpResponse::redirect(302, location))
    }
}

/// 记录下来的一次请求
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

/// 按 URL 回放预设响应；队列只剩一条时重复使用它
#[derive(Default)]
pub struct StubTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url: impl Into<String>, responses: Vec<Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.into(), responses.into_iter().collect());
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.url == url).count()
    }

    fn next(&self, url: &str) -> AppResult<HttpResponse> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts
            .get_mut(url)
            .ok_or_else(|| AppError::transport_msg(url, "no script"))?;
        let scripted = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match scripted {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Fail(msg)) => Err(AppError::transport_msg(url, msg)),
            None => Err(AppError::transport_msg(url, "empty script")),
        }
    }

    fn record(&self, method: &'static str, url: &str, headers: &[(&str, &str)], form: &[(&str, &str)]) {
        self.requests.lock().unwrap().push(Recorded {
            method,
            url: url.to_string(),
            headers: owned(headers),
            form: owned(form),
        });
    }
}

fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        _timeout: Duration,
    ) -> AppResult<HttpResponse> {
        self.record("GET", url, headers, &[]);
        self.next(url)
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        _timeout: Duration,
        _follow_redirects: bool,
    ) -> AppResult<HttpResponse> {
        self.record("POST", url, &[], form);
        self.next(url)
    }
}

/// 按顺序返回预设识别结果；只剩一条时重复使用
pub struct StubRecognizer {
    answers: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl StubRecognizer {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|s| s.to_string()).collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CaptchaRecognizer for StubRecognizer {
    async fn classify(&self, _image: &[u8]) -> AppResult<String> {
        *self.calls.lock().unwrap() += 1;
        let mut answers = self.answers.lock().unwrap();
        let answer = if answers.len() > 1 {
            answers.pop_front()
        } else {
            answers.front().cloned()
        };
        answer.ok_or_else(|| AppError::Ocr("no answer".to_string()))
    }
}
