//! Firebase Identity Toolkit client for phone sign-in.
//!
//! Thin HTTP wrapper over `accounts:sendVerificationCode` and
//! `accounts:signInWithPhoneNumber`. Pure parsing lives in `parse_*`
//! functions for testability.

use std::time::Duration;

use super::{ChallengeHandle, Identity, IdentityError, IdentityService};

pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Firebase configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub base_url: String,
}

impl FirebaseConfig {
    /// Load from `FIREBASE_API_KEY` and optional `FIREBASE_AUTH_BASE_URL`.
    /// Returns `None` when no API key is set (dev identity is used instead).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("FIREBASE_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
        let base_url = std::env::var("FIREBASE_AUTH_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        Some(Self { api_key, base_url })
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct FirebaseIdentityService {
    http: reqwest::Client,
    config: FirebaseConfig,
}

impl FirebaseIdentityService {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FirebaseConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{method}?key={}", self.config.base_url, self.config.api_key)
    }

    async fn post<B: serde::Serialize + Sync>(&self, method: &str, body: &B) -> Result<(u16, String), IdentityError> {
        let response = self
            .http
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        Ok((status, text))
    }
}

#[async_trait::async_trait]
impl IdentityService for FirebaseIdentityService {
    async fn send_verification_code(
        &self,
        phone_number: &str,
        app_verifier: Option<&str>,
    ) -> Result<ChallengeHandle, IdentityError> {
        let body = SendCodeRequest { phone_number, recaptcha_token: app_verifier };
        let (status, text) = self.post("sendVerificationCode", &body).await?;
        if status != 200 {
            return Err(parse_error(&text));
        }
        parse_send_code_response(&text)
    }

    async fn confirm_code(&self, challenge: &ChallengeHandle, code: &str) -> Result<Identity, IdentityError> {
        let body = SignInRequest { session_info: challenge.as_str(), code };
        let (status, text) = self.post("signInWithPhoneNumber", &body).await?;
        if status != 200 {
            return Err(parse_error(&text));
        }
        parse_sign_in_response(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeRequest<'a> {
    phone_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recaptcha_token: Option<&'a str>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    session_info: &'a str,
    code: &'a str,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeResponse {
    session_info: String,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    phone_number: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: String,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_send_code_response(json: &str) -> Result<ChallengeHandle, IdentityError> {
    let resp: SendCodeResponse =
        serde_json::from_str(json).map_err(|e| IdentityError::Transport(format!("unexpected response: {e}")))?;
    Ok(ChallengeHandle::new(resp.session_info))
}

fn parse_sign_in_response(json: &str) -> Result<Identity, IdentityError> {
    let resp: SignInResponse =
        serde_json::from_str(json).map_err(|e| IdentityError::Transport(format!("unexpected response: {e}")))?;
    Ok(Identity { uid: resp.local_id, phone_number: resp.phone_number })
}

/// Map an Identity Toolkit error body onto `IdentityError`.
///
/// Messages look like `"INVALID_PHONE_NUMBER : Invalid format."`; only the
/// leading code is significant.
fn parse_error(json: &str) -> IdentityError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(json) else {
        return IdentityError::Transport(format!("unexpected error body: {json}"));
    };
    let code = envelope
        .error
        .message
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .to_owned();
    match code.as_str() {
        "INVALID_PHONE_NUMBER" | "MISSING_PHONE_NUMBER" => IdentityError::InvalidPhoneNumber,
        "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => IdentityError::TooManyRequests,
        "CAPTCHA_CHECK_FAILED" | "MISSING_RECAPTCHA_TOKEN" | "INVALID_RECAPTCHA_TOKEN" => {
            IdentityError::CaptchaCheckFailed
        }
        "INVALID_CODE" | "MISSING_CODE" => IdentityError::InvalidCode,
        "SESSION_EXPIRED" | "INVALID_SESSION_INFO" | "MISSING_SESSION_INFO" => IdentityError::SessionExpired,
        _ => IdentityError::Service { code },
    }
}

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;
