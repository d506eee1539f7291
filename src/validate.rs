//! Form field checks shared by the route handlers.
//!
//! Every check returns the cleaned value or a code 1 `AppError` whose message
//! is shown to the user as a flash.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::entity::message::MAX_TEXT_LEN;
use crate::error::AppError;

pub const USERNAME_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 6;

pub fn username(value: Option<String>) -> Result<String, AppError> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(AppError::param_error("Username is required."));
    }
    if value.chars().count() > USERNAME_MAX {
        return Err(AppError::param_error(format!(
            "Username must be at most {} characters.",
            USERNAME_MAX
        )));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(AppError::param_error("Username cannot contain spaces."));
    }
    Ok(value)
}

pub fn email(value: Option<String>) -> Result<String, AppError> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if !RE.is_match(&value) {
        return Err(AppError::param_error("Invalid email address."));
    }
    Ok(value)
}

/// Passwords are taken as typed; only the length is checked.
pub fn password(value: Option<String>) -> Result<String, AppError> {
    let value = value.unwrap_or_default();
    if value.chars().count() < PASSWORD_MIN {
        return Err(AppError::param_error(format!(
            "Password must be at least {} characters.",
            PASSWORD_MIN
        )));
    }
    Ok(value)
}

/// Non-empty as typed. Used where the value is only compared, never stored.
pub fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::param_error(message))
}

pub fn message_text(value: Option<String>) -> Result<String, AppError> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(AppError::param_error("Message cannot be empty."));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::param_error(format!(
            "Message must be at most {} characters.",
            MAX_TEXT_LEN
        )));
    }
    Ok(value)
}

/// Blank optional fields count as absent.
pub fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Only same-site paths are accepted as a post-action destination.
pub fn local_path(value: Option<String>) -> Result<String, AppError> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(AppError::param_error("Missing return address."));
    }
    if !value.starts_with('/') || value.starts_with("//") || value.contains('\\') {
        return Err(AppError::param_error("Invalid return address."));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn some(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[rstest]
    #[case::plain("testuser", true)]
    #[case::trimmed("  testuser ", true)]
    #[case::missing("", false)]
    #[case::inner_space("test user", false)]
    #[case::thirty_chars("abcdefghijabcdefghijabcdefghij", true)]
    #[case::thirty_one_chars("abcdefghijabcdefghijabcdefghijk", false)]
    fn username_rules(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(username(some(input)).is_ok(), ok);
    }

    #[rstest]
    #[case::valid("test@test.com", true)]
    #[case::no_at("test.com", false)]
    #[case::no_domain_dot("test@test", false)]
    #[case::space("te st@test.com", false)]
    fn email_rules(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(email(some(input)).is_ok(), ok);
    }

    #[test]
    fn password_needs_six_characters() {
        assert!(password(some("12345")).is_err());
        assert_eq!(password(some("123456")).expect("ok"), "123456");
        assert!(password(None).is_err());
        assert!(required(some(""), "Password is required.").is_err());
        assert_eq!(required(some(" x"), "Password is required.").expect("ok"), " x");
    }

    #[test]
    fn message_text_is_trimmed_and_bounded() {
        assert_eq!(message_text(some("  hello  ")).expect("ok"), "hello");
        assert!(message_text(some("   ")).is_err());
        assert!(message_text(Some("a".repeat(140))).is_ok());
        assert!(message_text(Some("a".repeat(141))).is_err());
        assert!(message_text(Some("é".repeat(140))).is_ok());
    }

    #[rstest]
    #[case::root("/", true)]
    #[case::user_page("/users/3", true)]
    #[case::with_query("/users?q=u", true)]
    #[case::absolute("https://evil.example", false)]
    #[case::protocol_relative("//evil.example", false)]
    #[case::backslash("/\\evil.example", false)]
    #[case::relative("users/3", false)]
    #[case::missing("", false)]
    fn local_path_rules(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(local_path(some(input)).is_ok(), ok);
    }

    #[test]
    fn blank_optional_is_none() {
        assert_eq!(optional(some("  ")), None);
        assert_eq!(optional(some(" x ")), some("x"));
        assert_eq!(optional(None), None);
    }
}
