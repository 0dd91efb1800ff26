//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (模式调度、会话与本地文件)
//!     ↓
//! workflow (LoginFlow / ScrapeFlow)
//!     ↓
//! services (能力层：token / captcha / grades / academic / user)
//!     ↓
//! infrastructure (基础设施：Transport / OCR / markup)
//! ```
//!
//! 只有编排层创建和保存会话，下层一律通过 `&dyn Transport` 使用。

pub mod app;

pub use app::{App, LoginRequest, Mode};
