//! Form validation and phone-number normalization.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

pub const PHONE_DIGITS: usize = 10;
pub const OTP_DIGITS: usize = 6;

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Accept exactly ten ASCII digits, nothing else.
///
/// # Errors
///
/// Returns `InvalidPhoneNumber` for any other input.
pub fn validate_phone_number(input: &str) -> Result<&str, ValidationError> {
    if input.len() == PHONE_DIGITS && input.bytes().all(|b| b.is_ascii_digit()) {
        Ok(input)
    } else {
        Err(ValidationError::InvalidPhoneNumber)
    }
}

/// Prefix a validated local number with the country code: `+919876543210`.
#[must_use]
pub fn format_phone_number(country_code: &str, local: &str) -> String {
    format!("{country_code}{local}")
}

/// Strip every non-digit character. The result is the record-store key.
#[must_use]
pub fn normalize_phone_number(phone_number: &str) -> String {
    phone_number.chars().filter(char::is_ascii_digit).collect()
}

/// Trim the typed code and require six digits.
///
/// # Errors
///
/// Returns `InvalidOtp` when the code is not six digits.
pub fn validate_otp(input: &str) -> Result<&str, ValidationError> {
    let code = input.trim();
    if code.len() == OTP_DIGITS && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(code)
    } else {
        Err(ValidationError::InvalidOtp)
    }
}

/// Raw signup form as posted.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

/// Trimmed, validated signup fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl SignupForm {
    /// Check fields in display order and return the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first missing or malformed field.
    pub fn validate(&self) -> Result<ProfileInput, ValidationError> {
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        let email = self.email.trim();

        if first_name.is_empty() {
            return Err(ValidationError::FirstNameRequired);
        }
        if last_name.is_empty() {
            return Err(ValidationError::LastNameRequired);
        }
        if email.is_empty() {
            return Err(ValidationError::EmailRequired);
        }
        if !RE_EMAIL.is_match(email) {
            return Err(ValidationError::InvalidEmail);
        }

        Ok(ProfileInput {
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email: email.to_owned(),
        })
    }
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
