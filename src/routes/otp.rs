//! OTP screen: confirm the code, or go back for a new one once the resend
//! timer runs out.

use std::sync::Arc;
use std::time::Instant;

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use super::{BrowserClient, guard, missing_state, pages};
use crate::error::{ExternalServiceError, FlowError};
use crate::services::clients::ClientContext;
use crate::services::guard::{GuardDecision, Screen, resolve};
use crate::services::navigation::NavigationIntent;
use crate::services::validation::{PHONE_DIGITS, normalize_phone_number, validate_otp};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OtpForm {
    #[serde(default)]
    pub code: String,
}

/// `GET /otp`
pub async fn show(State(state): State<AppState>, client: BrowserClient) -> Response {
    let response = match guard(&state, &client.ctx, Screen::Otp).await {
        Ok(_) => render(&client.ctx, None, StatusCode::OK).await,
        Err(response) => response,
    };
    client.respond(response).await
}

/// `POST /otp`: confirm the code, then route by profile existence.
pub async fn submit(State(state): State<AppState>, client: BrowserClient, Form(form): Form<OtpForm>) -> Response {
    let response = confirm(&state, &client.ctx, &form.code).await;
    client.respond(response).await
}

/// `POST /otp/resend`: once the timer is done, back to login prefilled.
pub async fn resend(State(state): State<AppState>, client: BrowserClient) -> Response {
    let response = request_resend(&state, &client.ctx).await;
    client.respond(response).await
}

async fn confirm(state: &AppState, ctx: &Arc<ClientContext>, code: &str) -> Response {
    if let Err(response) = guard(state, ctx, Screen::Otp).await {
        return response;
    }

    let code = match validate_otp(code) {
        Ok(code) => code,
        Err(e) => {
            let err = FlowError::from(e);
            return render(ctx, Some(&err.user_message()), err.status()).await;
        }
    };

    let begun = match ctx.nav().await.as_mut() {
        Some(NavigationIntent::Otp { phone_number, challenge, step }) => {
            Some(step.begin_verify().map(|()| (phone_number.clone(), challenge.clone())))
        }
        _ => None,
    };
    let (phone_number, challenge) = match begun {
        Some(Ok(pending)) => pending,
        Some(Err(e)) => return render(ctx, Some(&e.to_string()), StatusCode::CONFLICT).await,
        None => return missing_state(Screen::Otp),
    };

    let pending = PendingVerification(Some(Arc::clone(ctx)));
    let result = ctx.auth.confirm_code(&challenge, code).await;
    if let Some(NavigationIntent::Otp { step, .. }) = ctx.nav().await.as_mut() {
        step.finish_verify(result.is_ok());
    }
    pending.settle();

    let identity = match result {
        Ok(identity) => identity,
        Err(e) => {
            let err = FlowError::from(ExternalServiceError::ConfirmCode(e));
            tracing::warn!(error = %err, %phone_number, "otp verification failed");
            return render(ctx, Some(&err.user_message()), err.status()).await;
        }
    };
    tracing::info!(uid = %identity.uid, %phone_number, "phone number verified");

    let session = ctx.session(state.config.session_settle).await;
    match resolve(session.guard_input(), Screen::Otp) {
        GuardDecision::RedirectSignup => {
            let phone_number = normalize_phone_number(identity.phone_number.as_deref().unwrap_or(&phone_number));
            ctx.navigate(Some(NavigationIntent::Signup { phone_number, uid: identity.uid })).await;
            Redirect::to(Screen::Signup.path()).into_response()
        }
        GuardDecision::ShowSpinner => {
            ctx.navigate(None).await;
            pages::spinner_page(Screen::Home.path()).into_response()
        }
        decision => {
            ctx.navigate(None).await;
            Redirect::to(decision.redirect_to().unwrap_or(Screen::Home).path()).into_response()
        }
    }
}

async fn request_resend(state: &AppState, ctx: &ClientContext) -> Response {
    if let Err(response) = guard(state, ctx, Screen::Otp).await {
        return response;
    }

    let now = Instant::now();
    let outcome = match ctx.nav().await.as_ref() {
        Some(NavigationIntent::Otp { phone_number, step, .. }) => {
            Some(step.request_resend(now).map(|()| local_number(phone_number)))
        }
        _ => None,
    };

    match outcome {
        Some(Ok(phone_number)) => {
            ctx.navigate(Some(NavigationIntent::Login { phone_number })).await;
            Redirect::to(Screen::Login.path()).into_response()
        }
        Some(Err(e)) => render(ctx, Some(&e.to_string()), StatusCode::TOO_MANY_REQUESTS).await,
        None => missing_state(Screen::Otp),
    }
}

/// Held while a code is with the provider. If the request is dropped before
/// the outcome is recorded, the step goes back to awaiting the code.
struct PendingVerification(Option<Arc<ClientContext>>);

impl PendingVerification {
    fn settle(mut self) {
        self.0 = None;
    }
}

impl Drop for PendingVerification {
    fn drop(&mut self) {
        if let Some(ctx) = self.0.take() {
            tracing::debug!("otp verification dropped before completion");
            ctx.abandon_verification();
        }
    }
}

/// Render the OTP page from the current intent; missing intent goes to login.
async fn render(ctx: &ClientContext, error: Option<&str>, status: StatusCode) -> Response {
    let view = match ctx.nav().await.as_ref() {
        Some(NavigationIntent::Otp { phone_number, step, .. }) => {
            Some((phone_number.clone(), step.seconds_remaining(Instant::now())))
        }
        _ => None,
    };
    match view {
        Some((phone_number, remaining)) => (status, pages::otp_page(&phone_number, remaining, error)).into_response(),
        None => missing_state(Screen::Otp),
    }
}

/// Last ten digits of an E.164 number, as typed on the login screen.
fn local_number(phone_number: &str) -> String {
    let digits = normalize_phone_number(phone_number);
    digits[digits.len().saturating_sub(PHONE_DIGITS)..].to_owned()
}
