//! Navigation intent: context handed from one screen to the next.

use crate::identity::ChallengeHandle;
use crate::services::otp::OtpStep;

/// Held per browser context; replaced by the next navigation.
#[derive(Debug, Clone)]
pub enum NavigationIntent {
    /// Back to login after a resend, prefilled with the local number.
    Login { phone_number: String },
    /// Code sent; the OTP screen needs the number shown and the challenge.
    Otp { phone_number: String, challenge: ChallengeHandle, step: OtpStep },
    /// Verified but no profile yet.
    Signup { phone_number: String, uid: String },
}

impl NavigationIntent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Otp { .. } => "otp",
            Self::Signup { .. } => "signup",
        }
    }
}
