pub mod academic_service;
pub mod captcha_service;
pub mod grades_service;
pub mod local_store;
pub mod password;
pub mod token_service;
pub mod user_service;

pub use academic_service::AcademicInfoService;
pub use captcha_service::{CaptchaAttempt, CaptchaSolver};
pub use grades_service::GradesService;
pub use local_store::{CredentialStore, SessionFile};
pub use token_service::TokenService;
pub use user_service::{UserService, DEFAULT_USER_NAME};
