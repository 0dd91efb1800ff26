pub mod login_flow;
pub mod scrape_flow;

pub use login_flow::{LoginFailure, LoginFlow, LoginOutcome, LoginState};
pub use scrape_flow::{assemble_report, ScrapeFlow};
