//! Request field validation shared by the OTP and signup services.
//!
//! Email addresses are checked syntactically only (no DNS / deliverability
//! lookups) and normalized to trimmed lowercase so they can be used directly
//! as store keys.

use std::fmt;

use validator::ValidateEmail;

/// Length of a one-time code.
pub const OTP_LEN: usize = 6;

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A request field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub constraint: String,
}

impl ValidationError {
    fn new(field: &'static str, constraint: impl Into<String>) -> Self {
        Self { field, constraint: constraint.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Validate `raw` as an email address and return its normalized form.
///
/// # Errors
///
/// Returns [`ValidationError`] when the address is empty or fails the
/// `validator` crate's HTML5 email check.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(ValidationError::new("email", "is required"));
    }
    if !email.validate_email() {
        return Err(ValidationError::new("email", "is not a valid email address"));
    }
    Ok(email_key(email))
}

/// Case-folded form of an address, used as the store key for codes and accounts.
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check that `code` is exactly [`OTP_LEN`] ASCII digits.
///
/// # Errors
///
/// Returns [`ValidationError`] for an empty or malformed code.
pub fn validate_otp(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        return Err(ValidationError::new("otp", "is required"));
    }
    if code.len() != OTP_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new("otp", format!("must be exactly {OTP_LEN} digits")));
    }
    Ok(())
}
