//! `GET /api/session`: JSON view of the settled session for one browser.

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use super::BrowserClient;
use crate::services::guard::{GuardDecision, Screen, resolve};
use crate::services::navigation::NavigationIntent;
use crate::services::observer::Session;
use crate::services::otp::OtpPhase;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    /// Screen name (`home`) or path (`/home`) to resolve the guard for.
    pub screen: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub phone_number: Option<String>,
    pub navigation: Option<&'static str>,
    pub otp: Option<OtpView>,
    pub screen: Option<Screen>,
    pub decision: Option<GuardDecision>,
}

/// Progress of the OTP step, present while the OTP intent is held.
#[derive(Debug, Serialize)]
pub struct OtpView {
    pub phase: OtpPhase,
    pub seconds_remaining: u64,
    pub can_resend: bool,
}

pub async fn snapshot(
    State(state): State<AppState>,
    client: BrowserClient,
    Query(query): Query<SessionQuery>,
) -> Response {
    let screen = match query.screen.as_deref() {
        Some(raw) => match Screen::from_path(&format!("/{}", raw.trim_start_matches('/'))) {
            Some(screen) => Some(screen),
            None => return client.respond((StatusCode::BAD_REQUEST, "unknown screen")).await,
        },
        None => None,
    };

    let session = client.ctx.session(state.config.session_settle).await;
    let (navigation, otp) = {
        let nav = client.ctx.nav().await;
        let otp = match nav.as_ref() {
            Some(NavigationIntent::Otp { step, .. }) => {
                let now = Instant::now();
                Some(OtpView {
                    phase: step.phase(),
                    seconds_remaining: step.seconds_remaining(now),
                    can_resend: step.can_resend(now),
                })
            }
            _ => None,
        };
        (nav.as_ref().map(NavigationIntent::name), otp)
    };
    let view = SessionView {
        phone_number: session.phone_number().map(str::to_owned),
        navigation,
        otp,
        screen,
        decision: screen.map(|screen| resolve(session.guard_input(), screen)),
        session,
    };
    client.respond(Json(view)).await
}
