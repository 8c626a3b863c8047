//! OTP step: verification phase and the resend countdown.
//!
//! ```text
//! AwaitingCode ──submit──▶ Verifying ──ok──▶ Verified
//!      ▲                       │
//!      └──────submit───── Failed ◀──err──┘
//! ```
//!
//! The resend timer starts when the code is sent and gates leaving the step
//! for a fresh code; it never resets on failed attempts.

use std::time::{Duration, Instant};

use serde::Serialize;

pub const RESEND_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPhase {
    AwaitingCode,
    Verifying,
    Verified,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OtpStepError {
    #[error("Please wait {remaining_secs}s before requesting a new code")]
    ResendTooSoon { remaining_secs: u64 },
    #[error("Verification already in progress")]
    VerificationInProgress,
    #[error("Code already verified")]
    AlreadyVerified,
}

#[derive(Debug, Clone)]
pub struct OtpStep {
    phase: OtpPhase,
    code_sent_at: Instant,
}

impl OtpStep {
    #[must_use]
    pub fn new(code_sent_at: Instant) -> Self {
        Self { phase: OtpPhase::AwaitingCode, code_sent_at }
    }

    #[must_use]
    pub fn phase(&self) -> OtpPhase {
        self.phase
    }

    /// Whole seconds left on the resend timer, rounded up.
    #[must_use]
    pub fn seconds_remaining(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.code_sent_at);
        let remaining = RESEND_COOLDOWN.saturating_sub(elapsed);
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    #[must_use]
    pub fn can_resend(&self, now: Instant) -> bool {
        self.seconds_remaining(now) == 0
    }

    /// Gate a resend request on the countdown.
    ///
    /// # Errors
    ///
    /// Returns `ResendTooSoon` while the timer is still running.
    pub fn request_resend(&self, now: Instant) -> Result<(), OtpStepError> {
        match self.seconds_remaining(now) {
            0 => Ok(()),
            remaining_secs => Err(OtpStepError::ResendTooSoon { remaining_secs }),
        }
    }

    /// Move to `Verifying` from `AwaitingCode` or `Failed`.
    ///
    /// # Errors
    ///
    /// Rejects overlapping submissions and submissions after success.
    pub fn begin_verify(&mut self) -> Result<(), OtpStepError> {
        match self.phase {
            OtpPhase::AwaitingCode | OtpPhase::Failed => {
                self.phase = OtpPhase::Verifying;
                Ok(())
            }
            OtpPhase::Verifying => Err(OtpStepError::VerificationInProgress),
            OtpPhase::Verified => Err(OtpStepError::AlreadyVerified),
        }
    }

    /// Record the outcome of a `Verifying` attempt. Ignored in any other phase.
    pub fn finish_verify(&mut self, verified: bool) {
        if self.phase == OtpPhase::Verifying {
            self.phase = if verified { OtpPhase::Verified } else { OtpPhase::Failed };
        }
    }

    /// A submission that never got an answer from the provider.
    pub fn abandon_verify(&mut self) {
        if self.phase == OtpPhase::Verifying {
            self.phase = OtpPhase::AwaitingCode;
        }
    }
}

#[cfg(test)]
#[path = "otp_test.rs"]
mod tests;
