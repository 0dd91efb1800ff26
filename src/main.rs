use anyhow::{bail, Context, Result};
use jwxs_grades::utils::logging;
use jwxs_grades::{App, Config, Credentials, LoginRequest, Mode};
use std::path::Path;

const USAGE: &str = "用法: jwxs_grades [login|auto|logout]";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = match std::env::var("JWXS_CONFIG") {
        Ok(path) => Config::load(Path::new(&path)).context("加载配置文件失败")?,
        Err(_) => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    let mode = parse_mode(std::env::args().nth(1).as_deref())?;

    // 初始化并运行应用
    let report = App::initialize(config)?.run(mode).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_mode(arg: Option<&str>) -> Result<Mode> {
    match arg.unwrap_or("auto") {
        "login" => {
            let username = std::env::var("JWXS_USERNAME").unwrap_or_default();
            let password = std::env::var("JWXS_PASSWORD").unwrap_or_default();
            let save_info = std::env::var("JWXS_SAVE_INFO")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false);
            Ok(Mode::Login(LoginRequest {
                credentials: Credentials::new(username, password),
                save_info,
            }))
        }
        "auto" => Ok(Mode::Auto),
        "logout" => Ok(Mode::Logout),
        other => bail!("未知模式: {}\n{}", other, USAGE),
    }
}
