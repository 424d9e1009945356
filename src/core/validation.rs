//! Input validation rules for account data

use crate::core::error::{AppError, Result};
use lazy_static::lazy_static;
use regex::Regex;

/// Minimum length of first and last names, in characters
pub const MIN_NAME_LENGTH: usize = 2;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,4}$").unwrap();
    // Character set and length only; the class requirements are checked separately
    static ref PASSWORD_CHARSET_RE: Regex = Regex::new(r"^[a-zA-Z0-9]{8,20}$").unwrap();
}

/// Structural email check: `local@domain.tld` with a 2-4 letter TLD.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Password complexity: 8-20 ASCII letters or digits, with at least one
/// lowercase letter, one uppercase letter and one digit. Punctuation is
/// rejected.
pub fn is_valid_password(password: &str) -> bool {
    PASSWORD_CHARSET_RE.is_match(password)
        && password.bytes().any(|b| b.is_ascii_lowercase())
        && password.bytes().any(|b| b.is_ascii_uppercase())
        && password.bytes().any(|b| b.is_ascii_digit())
}

pub fn is_valid_name(name: &str) -> bool {
    name.chars().count() >= MIN_NAME_LENGTH
}

pub fn validate_names(first_name: &str, last_name: &str) -> Result<()> {
    if !is_valid_name(first_name) || !is_valid_name(last_name) {
        return Err(AppError::ValidationError(format!(
            "First and last name must contain at least {} characters",
            MIN_NAME_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if !is_valid_email(email) {
        return Err(AppError::ValidationError("Invalid email address".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if !is_valid_password(password) {
        return Err(AppError::ValidationError("Invalid password".to_string()));
    }
    Ok(())
}
