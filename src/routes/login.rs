//! Login screen: collect a 10-digit number and send the verification code.

use std::time::Instant;

use axum::Form;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use super::{BrowserClient, guard, pages};
use crate::error::{ExternalServiceError, FlowError};
use crate::services::guard::Screen;
use crate::services::navigation::NavigationIntent;
use crate::services::otp::OtpStep;
use crate::services::validation::{format_phone_number, validate_phone_number};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub phone_number: String,
    /// App-verifier token forwarded to the identity service.
    #[serde(default)]
    pub recaptcha_token: Option<String>,
}

/// `GET /login`
pub async fn show(State(state): State<AppState>, client: BrowserClient) -> Response {
    let response = match guard(&state, &client.ctx, Screen::Login).await {
        Ok(_) => {
            let prefill = match client.ctx.nav().await.as_ref() {
                Some(NavigationIntent::Login { phone_number }) => phone_number.clone(),
                _ => String::new(),
            };
            pages::login_page(&prefill, None).into_response()
        }
        Err(response) => response,
    };
    client.respond(response).await
}

/// `POST /login`: validate, send the code, continue to `/otp`.
pub async fn submit(State(state): State<AppState>, client: BrowserClient, Form(form): Form<LoginForm>) -> Response {
    let response = send_code(&state, &client, &form).await;
    client.respond(response).await
}

async fn send_code(state: &AppState, client: &BrowserClient, form: &LoginForm) -> Response {
    if let Err(response) = guard(state, &client.ctx, Screen::Login).await {
        return response;
    }

    let local = match validate_phone_number(&form.phone_number) {
        Ok(local) => local,
        Err(e) => return render_error(&form.phone_number, &FlowError::from(e)),
    };
    let phone_number = format_phone_number(&state.config.country_code, local);
    let app_verifier = form.recaptcha_token.as_deref().filter(|t| !t.is_empty());

    match client.ctx.auth.send_verification_code(&phone_number, app_verifier).await {
        Ok(challenge) => {
            tracing::info!(%phone_number, "verification code sent");
            client
                .ctx
                .navigate(Some(NavigationIntent::Otp { phone_number, challenge, step: OtpStep::new(Instant::now()) }))
                .await;
            Redirect::to(Screen::Otp.path()).into_response()
        }
        Err(e) => {
            let err = FlowError::from(ExternalServiceError::SendCode(e));
            tracing::warn!(error = %err, %phone_number, "send verification code failed");
            render_error(&form.phone_number, &err)
        }
    }
}

fn render_error(phone_number: &str, err: &FlowError) -> Response {
    (err.status(), pages::login_page(phone_number, Some(&err.user_message()))).into_response()
}
