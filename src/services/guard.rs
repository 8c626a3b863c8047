//! Route guard: decides which screen a request may see.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every screen handler resolves its guard decision before doing any work.
//! The guard is a pure function of the settled session and the requested
//! screen; the session observer owns the inputs, the guard owns the verdict.

use serde::Serialize;

/// Screens reachable by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Login,
    Otp,
    Signup,
    Home,
}

impl Screen {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Otp => "/otp",
            Self::Signup => "/signup",
            Self::Home => "/home",
        }
    }

    /// Login and OTP are reachable without a signed-in identity.
    #[must_use]
    pub fn is_public(self) -> bool {
        matches!(self, Self::Login | Self::Otp)
    }

    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/login" => Some(Self::Login),
            "/otp" => Some(Self::Otp),
            "/signup" => Some(Self::Signup),
            "/home" => Some(Self::Home),
            _ => None,
        }
    }
}

/// Snapshot of the session fields the guard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardInput {
    pub is_loading: bool,
    pub is_authenticated: bool,
    /// `None` until a profile lookup has completed for the current identity.
    pub user_exists: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    ShowSpinner,
    RedirectLogin,
    RedirectSignup,
    RedirectHome,
    ShowRequestedScreen,
}

impl GuardDecision {
    /// Redirect target, if the decision is a redirect.
    #[must_use]
    pub fn redirect_to(self) -> Option<Screen> {
        match self {
            Self::RedirectLogin => Some(Screen::Login),
            Self::RedirectSignup => Some(Screen::Signup),
            Self::RedirectHome => Some(Screen::Home),
            Self::ShowSpinner | Self::ShowRequestedScreen => None,
        }
    }
}

#[must_use]
pub fn resolve(input: GuardInput, requested: Screen) -> GuardDecision {
    if input.is_loading {
        return GuardDecision::ShowSpinner;
    }
    if !input.is_authenticated {
        return if requested.is_public() {
            GuardDecision::ShowRequestedScreen
        } else {
            GuardDecision::RedirectLogin
        };
    }
    match input.user_exists {
        Some(false) if requested != Screen::Signup => GuardDecision::RedirectSignup,
        Some(true) if requested.is_public() => GuardDecision::RedirectHome,
        _ => GuardDecision::ShowRequestedScreen,
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
