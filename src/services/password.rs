//! 密码变换
//!
//! 两种变换互相独立：
//! - 登录提交用门户规定的组合 MD5
//! - 本地 "记住我" 只保存 SHA-256，不落地原始密码

use md5::Md5;
use sha2::{Digest, Sha256};

/// 门户前端脚本里写死的盐
const LOGIN_SALT: &str = "{Urp602019}";

/// 登录提交用的密码哈希：`md5(密码 + 盐) * md5(密码)`
pub fn login_hash(raw_password: &str) -> String {
    let salted = format!("{}{}", raw_password, LOGIN_SALT);
    format!(
        "{:x}*{:x}",
        Md5::digest(salted.as_bytes()),
        Md5::digest(raw_password.as_bytes())
    )
}

/// 本地存储用的密码哈希
pub fn storage_hash(raw_password: &str) -> String {
    format!("{:x}", Sha256::digest(raw_password.as_bytes()))
}
