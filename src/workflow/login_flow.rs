//! 登录流程 - 流程层
//!
//! 状态转换：
//!
//! ```text
//! Init → TokenAcquired → CaptchaPending → Submitted → Success
//!                              ↑               │
//!                              └── Retryable ←─┤
//!                                              └→ Failed
//! ```
//!
//! - 验证码求解失败：立即终止
//! - 验证码错误或学号密码错误：刷新 token 后重试
//! - 请求失败或未知错误：沿用原 token 重试
//! - 最后一次失败直接进入 Failed，不再刷新 token

use crate::config::Endpoints;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{HttpResponse, Transport};
use crate::models::Credentials;
use crate::services::password::login_hash;
use crate::services::{CaptchaSolver, TokenService};
use crate::utils::logging::truncate_text;
use crate::utils::RetryPolicy;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const CAPTCHA_ERROR_MARKER: &str = "验证码输入错误";
const BAD_CREDENTIALS_MARKER: &str = "用户名或密码错误";

/// 登录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Init,
    TokenAcquired,
    CaptchaPending,
    Submitted,
    Success,
    Retryable,
    Failed,
}

/// 单次提交失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    /// 门户提示验证码错误
    Captcha,
    /// 门户提示学号或密码错误
    BadCredentials,
    /// 请求本身失败
    Transport,
    Unknown,
}

impl LoginFailure {
    /// 根据门户返回的页面判断失败原因
    pub fn classify(response: &HttpResponse) -> Self {
        let body = response.text();
        if body.contains(CAPTCHA_ERROR_MARKER) {
            LoginFailure::Captcha
        } else if body.contains(BAD_CREDENTIALS_MARKER) {
            LoginFailure::BadCredentials
        } else {
            LoginFailure::Unknown
        }
    }
}

impl fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LoginFailure::Captcha => "验证码输入错误",
            LoginFailure::BadCredentials => "用户名或密码错误",
            LoginFailure::Transport => "登录请求失败",
            LoginFailure::Unknown => "未知登录错误",
        };
        f.write_str(text)
    }
}

impl LoginFailure {
    /// 门户明确拒绝时 token 已失效，需要重新获取
    pub fn refreshes_token(&self) -> bool {
        matches!(self, LoginFailure::Captcha | LoginFailure::BadCredentials)
    }
}

/// 登录结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    /// 验证码始终无法识别，没有提交
    CaptchaUnsolved,
    /// 所有尝试都被拒绝
    Exhausted { last_failure: LoginFailure },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success)
    }

    /// 状态机的终止状态
    pub fn final_state(&self) -> LoginState {
        match self {
            LoginOutcome::Success => LoginState::Success,
            LoginOutcome::CaptchaUnsolved | LoginOutcome::Exhausted { .. } => LoginState::Failed,
        }
    }

    /// 转成 `AppResult`，便于调用方统一记录失败原因
    pub fn into_result(self) -> AppResult<()> {
        match self {
            LoginOutcome::Success => Ok(()),
            LoginOutcome::CaptchaUnsolved => Err(AppError::Ocr("验证码无法识别".to_string())),
            LoginOutcome::Exhausted { last_failure } => {
                Err(AppError::PortalRejection(last_failure.to_string()))
            }
        }
    }
}

/// 登录流程
///
/// - 编排 验证码 → 提交 → 判断 → 刷新 token
/// - 不持有会话，由调用方传入
pub struct LoginFlow {
    endpoints: Endpoints,
    timeout: Duration,
    policy: RetryPolicy,
    tokens: TokenService,
    captcha: CaptchaSolver,
}

impl LoginFlow {
    pub fn new(
        endpoints: Endpoints,
        timeout: Duration,
        policy: RetryPolicy,
        tokens: TokenService,
        captcha: CaptchaSolver,
    ) -> Self {
        Self {
            endpoints,
            timeout,
            policy,
            tokens,
            captcha,
        }
    }

    /// 获取登录页上的 token
    pub async fn fetch_token(&self, session: &dyn Transport) -> Option<String> {
        self.tokens.fetch_token(session).await
    }

    /// 登录，只关心成功与否
    pub async fn login(
        &self,
        session: &dyn Transport,
        credentials: &Credentials,
        token: String,
    ) -> bool {
        self.run(session, credentials, token).await.is_success()
    }

    /// 执行登录并给出详细结果
    pub async fn run(
        &self,
        session: &dyn Transport,
        credentials: &Credentials,
        token: String,
    ) -> LoginOutcome {
        let hashed_password = login_hash(credentials.password());
        let mut token = token;
        let mut state = LoginState::Init;
        let mut last_failure = LoginFailure::Unknown;

        transition(&mut state, LoginState::TokenAcquired);

        for attempt in 1..=self.policy.max_attempts {
            info!("🔐 尝试登录 {} (第 {} 次)...", credentials.username, attempt);
            transition(&mut state, LoginState::CaptchaPending);

            let Some(captcha) = self.captcha.solve(session).await else {
                transition(&mut state, LoginState::Failed);
                error!("验证码无法识别，放弃登录");
                return LoginOutcome::CaptchaUnsolved;
            };

            let form = [
                ("tokenValue", token.as_str()),
                ("j_username", credentials.username.as_str()),
                ("j_password", hashed_password.as_str()),
                ("j_captcha", captcha.as_str()),
            ];
            transition(&mut state, LoginState::Submitted);

            let failure = match self.submit(session, &form).await {
                Ok(response) if is_login_success(&response) => {
                    transition(&mut state, LoginState::Success);
                    info!("✅ 登录成功！");
                    return LoginOutcome::Success;
                }
                Ok(response) => {
                    debug!("登录响应: {}", truncate_text(&response.text(), 200));
                    LoginFailure::classify(&response)
                }
                Err(e) => {
                    warn!("登录请求失败: {}", e);
                    LoginFailure::Transport
                }
            };

            warn!("登录失败: {}", failure);
            last_failure = failure;
            if attempt < self.policy.max_attempts {
                transition(&mut state, LoginState::Retryable);
            } else {
                transition(&mut state, LoginState::Failed);
            }

            if state == LoginState::Failed {
                break;
            }

            if failure.refreshes_token() {
                match self.tokens.fetch_token(session).await {
                    Some(fresh) => token = fresh,
                    None => warn!("刷新 token 失败，继续使用旧 token"),
                }
            }

            self.policy.wait_after(attempt).await;
        }

        if state != LoginState::Failed {
            transition(&mut state, LoginState::Failed);
        }
        error!("❌ 登录最终失败 (已尝试 {} 次)", self.policy.max_attempts);
        LoginOutcome::Exhausted { last_failure }
    }

    async fn submit(
        &self,
        session: &dyn Transport,
        form: &[(&str, &str)],
    ) -> AppResult<HttpResponse> {
        let url = self.endpoints.login_submit();
        session
            .post_form(&url, form, self.timeout, false)
            .await?
            .error_for_status(&url)
    }
}

/// 重定向到首页即登录成功
fn is_login_success(response: &HttpResponse) -> bool {
    response.is_redirect()
        && response
            .location
            .as_deref()
            .is_some_and(|location| location.contains("/index"))
}

fn transition(state: &mut LoginState, next: LoginState) {
    debug!("登录状态: {:?} → {:?}", state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Recorded, Scripted, StubRecognizer, StubTransport, BASE};
    use std::sync::Arc;

    fn flow(recognizer: Arc<StubRecognizer>, attempts: usize) -> LoginFlow {
        let endpoints = Endpoints::new(BASE).unwrap();
        LoginFlow::new(
            endpoints.clone(),
            Duration::from_secs(10),
            RetryPolicy::immediate(attempts),
            TokenService::new(endpoints.clone(), Duration::from_secs(10)),
            CaptchaSolver::new(
                endpoints,
                Duration::from_secs(5),
                RetryPolicy::immediate(2),
                recognizer,
            ),
        )
    }

    fn url(path: &str) -> String {
        format!("{}{}", BASE, path)
    }

    fn with_captcha(stub: StubTransport) -> StubTransport {
        stub.on(url("/img/captcha.jpg"), vec![Scripted::ok(vec![0xFF, 0xD8])])
    }

    fn posts(stub: &StubTransport) -> Vec<Recorded> {
        stub.requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect()
    }

    fn form_value<'a>(request: &'a Recorded, key: &str) -> Option<&'a str> {
        request
            .form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn credentials() -> Credentials {
        Credentials::new("2021001", "123456")
    }

    #[tokio::test]
    async fn test_success_on_redirect_to_index() {
        let stub = with_captcha(StubTransport::new()).on(
            url("/j_spring_security_check"),
            vec![Scripted::redirect("https://jwxs.test/index.jsp")],
        );
        let recognizer = Arc::new(StubRecognizer::new(&["k3m9"]));

        let outcome = flow(recognizer, 5)
            .run(&stub, &credentials(), "tok-1".to_string())
            .await;

        assert_eq!(outcome, LoginOutcome::Success);
        let posts = posts(&stub);
        assert_eq!(posts.len(), 1);
        assert_eq!(form_value(&posts[0], "tokenValue"), Some("tok-1"));
        assert_eq!(form_value(&posts[0], "j_username"), Some("2021001"));
        assert_eq!(form_value(&posts[0], "j_password"), Some(login_hash("123456").as_str()));
        assert_eq!(form_value(&posts[0], "j_captcha"), Some("k3m9"));
    }

    #[tokio::test]
    async fn test_non_redirect_exhausts_with_one_solve_per_attempt() {
        let stub = with_captcha(StubTransport::new()).on(
            url("/j_spring_security_check"),
            vec![Scripted::ok("<html>登录页</html>")],
        );
        let recognizer = Arc::new(StubRecognizer::new(&["k3m9"]));

        let ok = flow(recognizer.clone(), 3)
            .login(&stub, &credentials(), "tok".to_string())
            .await;

        assert!(!ok);
        assert_eq!(recognizer.calls(), 3);
        assert_eq!(posts(&stub).len(), 3);
        assert_eq!(stub.count(&url("/login")), 0);
    }

    #[tokio::test]
    async fn test_redirect_elsewhere_is_not_success() {
        let stub = with_captcha(StubTransport::new()).on(
            url("/j_spring_security_check"),
            vec![Scripted::redirect("https://jwxs.test/login?errorCode=badCaptcha")],
        );
        let recognizer = Arc::new(StubRecognizer::new(&["k3m9"]));

        let outcome = flow(recognizer, 2)
            .run(&stub, &credentials(), "tok".to_string())
            .await;

        assert_eq!(
            outcome,
            LoginOutcome::Exhausted {
                last_failure: LoginFailure::Unknown
            }
        );
    }

    #[tokio::test]
    async fn test_captcha_error_refreshes_token() {
        let stub = with_captcha(StubTransport::new())
            .on(
                url("/j_spring_security_check"),
                vec![
                    Scripted::ok("<div class=\"alert\">验证码输入错误</div>"),
                    Scripted::redirect("/index"),
                ],
            )
            .on(
                url("/login"),
                vec![Scripted::ok(r#"<input name="tokenValue" value="fresh">"#)],
            );
        let recognizer = Arc::new(StubRecognizer::new(&["aaaa", "bbbb"]));

        let outcome = flow(recognizer, 5)
            .run(&stub, &credentials(), "stale".to_string())
            .await;

        assert!(outcome.is_success());
        let posts = posts(&stub);
        assert_eq!(form_value(&posts[0], "tokenValue"), Some("stale"));
        assert_eq!(form_value(&posts[1], "tokenValue"), Some("fresh"));
        assert_eq!(form_value(&posts[1], "j_captcha"), Some("bbbb"));
        assert_eq!(stub.count(&url("/login")), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_old_token() {
        let stub = with_captcha(StubTransport::new())
            .on(
                url("/j_spring_security_check"),
                vec![
                    Scripted::ok("验证码输入错误"),
                    Scripted::redirect("/index"),
                ],
            )
            .on(url("/login"), vec![Scripted::Fail("timeout")]);
        let recognizer = Arc::new(StubRecognizer::new(&["aaaa"]));

        assert!(flow(recognizer, 5)
            .login(&stub, &credentials(), "old".to_string())
            .await);
        let posts = posts(&stub);
        assert_eq!(form_value(&posts[1], "tokenValue"), Some("old"));
    }

    #[tokio::test]
    async fn test_bad_credentials_also_refresh_token() {
        let stub = with_captcha(StubTransport::new())
            .on(
                url("/j_spring_security_check"),
                vec![Scripted::ok("<div class=\"alert\">用户名或密码错误</div>")],
            )
            .on(
                url("/login"),
                vec![
                    Scripted::ok(r#"<input name="tokenValue" value="second">"#),
                    Scripted::ok(r#"<input name="tokenValue" value="third">"#),
                ],
            );
        let recognizer = Arc::new(StubRecognizer::new(&["aaaa"]));

        let outcome = flow(recognizer, 3)
            .run(&stub, &credentials(), "first".to_string())
            .await;

        assert_eq!(
            outcome,
            LoginOutcome::Exhausted {
                last_failure: LoginFailure::BadCredentials
            }
        );
        // 每次被拒后刷新一次，最后一次失败后不再刷新
        assert_eq!(stub.count(&url("/login")), 2);
        let recorded = posts(&stub);
        let tokens: Vec<Option<&str>> = recorded
            .iter()
            .map(|post| form_value(post, "tokenValue"))
            .collect();
        assert_eq!(tokens, vec![Some("first"), Some("second"), Some("third")]);
    }

    #[tokio::test]
    async fn test_unknown_failure_keeps_token() {
        let stub = with_captcha(StubTransport::new())
            .on(
                url("/j_spring_security_check"),
                vec![Scripted::ok("<html>系统繁忙</html>"), Scripted::redirect("/index")],
            )
            .on(
                url("/login"),
                vec![Scripted::ok(r#"<input name="tokenValue" value="fresh">"#)],
            );
        let recognizer = Arc::new(StubRecognizer::new(&["aaaa"]));

        assert!(flow(recognizer, 3)
            .login(&stub, &credentials(), "tok".to_string())
            .await);
        assert_eq!(stub.count(&url("/login")), 0);
        let posts = posts(&stub);
        assert_eq!(form_value(&posts[1], "tokenValue"), Some("tok"));
    }

    #[tokio::test]
    async fn test_unsolvable_captcha_aborts_without_submit() {
        let stub = with_captcha(StubTransport::new());
        let recognizer = Arc::new(StubRecognizer::new(&["x"]));

        let outcome = flow(recognizer.clone(), 5)
            .run(&stub, &credentials(), "tok".to_string())
            .await;

        assert_eq!(outcome, LoginOutcome::CaptchaUnsolved);
        assert!(posts(&stub).is_empty());
        assert_eq!(recognizer.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_failures_are_folded_into_attempts() {
        let stub = with_captcha(StubTransport::new()).on(
            url("/j_spring_security_check"),
            vec![
                Scripted::Fail("connection reset"),
                Scripted::Response(HttpResponse::new(502, "")),
                Scripted::redirect("/index"),
            ],
        );
        let recognizer = Arc::new(StubRecognizer::new(&["aaaa"]));

        assert!(flow(recognizer, 3)
            .login(&stub, &credentials(), "tok".to_string())
            .await);
    }

    #[test]
    fn test_outcome_into_result() {
        assert!(LoginOutcome::Success.into_result().is_ok());
        assert!(matches!(
            LoginOutcome::CaptchaUnsolved.into_result(),
            Err(AppError::Ocr(_))
        ));
        let rejected = LoginOutcome::Exhausted {
            last_failure: LoginFailure::BadCredentials,
        }
        .into_result();
        assert!(matches!(rejected, Err(AppError::PortalRejection(ref m)) if m == "用户名或密码错误"));
    }

    #[tokio::test]
    async fn test_outcomes_end_in_terminal_state() {
        let success = with_captcha(StubTransport::new())
            .on(url("/j_spring_security_check"), vec![Scripted::redirect("/index")]);
        let outcome = flow(Arc::new(StubRecognizer::new(&["aaaa"])), 2)
            .run(&success, &credentials(), "tok".to_string())
            .await;
        assert_eq!(outcome.final_state(), LoginState::Success);

        let rejected = with_captcha(StubTransport::new())
            .on(url("/j_spring_security_check"), vec![Scripted::ok("验证码输入错误")])
            .on(url("/login"), vec![Scripted::ok(r#"<input name="tokenValue" value="t">"#)]);
        let outcome = flow(Arc::new(StubRecognizer::new(&["aaaa"])), 2)
            .run(&rejected, &credentials(), "tok".to_string())
            .await;
        assert_eq!(outcome.final_state(), LoginState::Failed);

        assert_eq!(LoginOutcome::CaptchaUnsolved.final_state(), LoginState::Failed);
    }

    #[test]
    fn test_only_portal_rejections_refresh_token() {
        assert!(LoginFailure::Captcha.refreshes_token());
        assert!(LoginFailure::BadCredentials.refreshes_token());
        assert!(!LoginFailure::Transport.refreshes_token());
        assert!(!LoginFailure::Unknown.refreshes_token());
    }

    #[test]
    fn test_classify_failures() {
        assert_eq!(
            LoginFailure::classify(&HttpResponse::new(200, "验证码输入错误")),
            LoginFailure::Captcha
        );
        assert_eq!(
            LoginFailure::classify(&HttpResponse::new(200, "用户名或密码错误")),
            LoginFailure::BadCredentials
        );
        assert_eq!(
            LoginFailure::classify(&HttpResponse::new(200, "")),
            LoginFailure::Unknown
        );
    }
}
