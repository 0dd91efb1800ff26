//! # JWXS Grades
//!
//! 登录 URP 教务系统并抓取成绩与绩点
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有连接与识别引擎，只暴露能力
//! - `HttpSession` - 唯一持有 Cookie 罐的会话，实现 `Transport`
//! - `CaptchaRecognizer` - 验证码识别能力，进程级单例
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务只对应一个页面或接口
//! - `TokenService` / `CaptchaSolver` - 登录前置
//! - `GradesService` / `AcademicInfoService` / `UserService` - 数据获取
//! - `CredentialStore` / `SessionFile` - 本地存储
//!
//! ### ③ 流程层（Workflow）
//! - `LoginFlow` - 登录状态机（验证码 → 提交 → 判断 → 刷新 token）
//! - `ScrapeFlow` - 汇总姓名、成绩、学业信息
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator::App` - 手动登录 / 自动登录 / 退出登录
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod processing;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
mod test_support;

// 重新导出常用类型
pub use config::{Config, Endpoints};
pub use error::{AppError, AppResult};
pub use infrastructure::{CaptchaRecognizer, HttpResponse, HttpSession, Transport};
pub use models::{Credentials, ScrapeReport, TermGroup};
pub use orchestrator::{App, LoginRequest, Mode};
pub use workflow::{LoginFlow, LoginOutcome, ScrapeFlow};
