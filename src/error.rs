//! Screen-level error taxonomy.
//!
//! DESIGN
//! ======
//! Every failure a screen can hit lands in one of three buckets:
//! - `Validation`: bad form input, rendered inline with a fixed message.
//! - `External`: an identity or store call failed; mapped to a small fixed
//!   set of user-facing messages, never retried.
//! - `Navigation`: the screen was reached without the context it needs;
//!   resolved by redirecting to `/login`.
//!
//! `Display` on `ValidationError` is the user-facing text. For external
//! failures `Display` carries operator detail for the log and
//! `user_message()` carries what the page shows.

use axum::http::StatusCode;

use crate::identity::IdentityError;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhoneNumber,
    #[error("Please enter the 6-digit code")]
    InvalidOtp,
    #[error("First name is required")]
    FirstNameRequired,
    #[error("Last name is required")]
    LastNameRequired,
    #[error("Email is required")]
    EmailRequired,
    #[error("Please enter a valid email")]
    InvalidEmail,
}

#[derive(Debug, thiserror::Error)]
pub enum ExternalServiceError {
    #[error("send verification code failed: {0}")]
    SendCode(#[source] IdentityError),
    #[error("confirm code failed: {0}")]
    ConfirmCode(#[source] IdentityError),
    #[error("profile read failed: {0}")]
    ProfileRead(#[source] StoreError),
    #[error("profile write failed: {0}")]
    ProfileWrite(#[source] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("missing navigation state for {screen}")]
pub struct NavigationStateError {
    pub screen: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    External(#[from] ExternalServiceError),
    #[error(transparent)]
    Navigation(#[from] NavigationStateError),
}

impl ExternalServiceError {
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::SendCode(IdentityError::InvalidPhoneNumber) => "Invalid phone number format.",
            Self::SendCode(IdentityError::TooManyRequests) => "Too many attempts. Please try again later.",
            Self::SendCode(IdentityError::CaptchaCheckFailed) => "reCAPTCHA verification failed. Please try again.",
            Self::SendCode(IdentityError::Transport(_)) => "An unexpected error occurred. Please try again.",
            Self::SendCode(_) => "Failed to send OTP. Please try again.",
            Self::ConfirmCode(_) => "Invalid OTP. Please try again.",
            Self::ProfileRead(_) => "Failed to load your profile. Please try again.",
            Self::ProfileWrite(_) => "Failed to complete signup. Please try again.",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SendCode(IdentityError::InvalidPhoneNumber) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::SendCode(IdentityError::TooManyRequests) => StatusCode::TOO_MANY_REQUESTS,
            Self::ConfirmCode(
                IdentityError::InvalidCode | IdentityError::SessionExpired | IdentityError::InvalidPhoneNumber,
            ) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl FlowError {
    /// Text rendered inline on the screen that hit the error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::External(e) => e.user_message().to_owned(),
            Self::Navigation(_) => "Please sign in to continue.".to_owned(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::External(e) => e.status(),
            Self::Navigation(_) => StatusCode::SEE_OTHER,
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
