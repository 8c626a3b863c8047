//! Identity service adapters: phone-number OTP dispatch and confirmation.
//!
//! DESIGN
//! ======
//! The remote identity provider is stateless from our point of view: it
//! sends a code and later trades `(challenge, code)` for an identity. The
//! stateful half (current user, change notifications, sign-out) lives in
//! `services::auth_client`, one per browser context. `IdentityService` is
//! implemented by the Firebase REST client and by an in-process dev
//! provider used locally and in tests.

pub mod dev;
pub mod firebase;

use std::fmt;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by identity provider operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider rejected the phone number format.
    #[error("invalid phone number")]
    InvalidPhoneNumber,

    /// The provider throttled the caller.
    #[error("too many requests")]
    TooManyRequests,

    /// The app-verifier (reCAPTCHA) token was rejected.
    #[error("captcha check failed")]
    CaptchaCheckFailed,

    /// The submitted code did not match the challenge.
    #[error("invalid verification code")]
    InvalidCode,

    /// The challenge is unknown, consumed, or past its expiry.
    #[error("verification session expired")]
    SessionExpired,

    /// Any other provider-reported failure, keyed by its error code.
    #[error("identity service error: {code}")]
    Service { code: String },

    /// The request never produced a usable response.
    #[error("identity transport error: {0}")]
    Transport(String),
}

// =============================================================================
// TYPES
// =============================================================================

/// Opaque handle returned by `send_verification_code` and required by
/// `confirm_code`. Threaded through navigation state, never stored globally.
#[derive(Clone, PartialEq, Eq)]
pub struct ChallengeHandle(String);

impl ChallengeHandle {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChallengeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChallengeHandle(..)")
    }
}

/// A signed-in identity issued by the provider. Provider tokens are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Provider-assigned user id.
    pub uid: String,
    /// Verified phone number in E.164 form, when the provider reports one.
    pub phone_number: Option<String>,
}

// =============================================================================
// TRAIT
// =============================================================================

/// Remote identity operations consumed by the auth client.
#[async_trait::async_trait]
pub trait IdentityService: Send + Sync {
    /// Ask the provider to text a one-time code to `phone_number` (E.164).
    ///
    /// `app_verifier` carries the reCAPTCHA token when the browser supplied one.
    async fn send_verification_code(
        &self,
        phone_number: &str,
        app_verifier: Option<&str>,
    ) -> Result<ChallengeHandle, IdentityError>;

    /// Trade a challenge and the code the user typed for an identity.
    async fn confirm_code(&self, challenge: &ChallengeHandle, code: &str) -> Result<Identity, IdentityError>;
}
