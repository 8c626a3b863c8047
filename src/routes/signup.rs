//! Signup screen: first profile write for a verified number.

use axum::Form;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};

use super::{BrowserClient, guard, missing_state, pages};
use crate::error::{ExternalServiceError, FlowError};
use crate::services::clients::ClientContext;
use crate::services::guard::Screen;
use crate::services::navigation::NavigationIntent;
use crate::services::observer::Session;
use crate::services::profile::create_profile;
use crate::services::validation::{SignupForm, normalize_phone_number};
use crate::state::AppState;

/// `GET /signup`
pub async fn show(State(state): State<AppState>, client: BrowserClient) -> Response {
    let response = match guard(&state, &client.ctx, Screen::Signup).await {
        Ok(session) => match signup_target(&client.ctx, &session).await {
            Some((phone_number, _)) => pages::signup_page(&phone_number, &SignupForm::default(), None).into_response(),
            None => missing_state(Screen::Signup),
        },
        Err(response) => response,
    };
    client.respond(response).await
}

/// `POST /signup`: validate, write the profile, continue to `/home`.
pub async fn submit(State(state): State<AppState>, client: BrowserClient, Form(form): Form<SignupForm>) -> Response {
    let response = complete_signup(&state, &client.ctx, &form).await;
    client.respond(response).await
}

async fn complete_signup(state: &AppState, ctx: &ClientContext, form: &SignupForm) -> Response {
    let session = match guard(state, ctx, Screen::Signup).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    let Some((phone_number, uid)) = signup_target(ctx, &session).await else {
        return missing_state(Screen::Signup);
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(e) => return render_error(&phone_number, form, &FlowError::from(e)),
    };

    if let Err(e) = create_profile(state.store.as_ref(), &phone_number, &uid, &input).await {
        let err = FlowError::from(ExternalServiceError::ProfileWrite(e));
        tracing::error!(error = %err, %phone_number, "signup write failed");
        return render_error(&phone_number, form, &err);
    }

    ctx.navigate(None).await;
    // Re-run the profile lookup so the guard lets `/home` through.
    ctx.auth.reload();
    let _ = ctx.session(state.config.session_settle).await;
    Redirect::to(Screen::Home.path()).into_response()
}

/// Normalized phone and uid for the signup write: the intent from the
/// previous screen, or the signed-in identity when the guard redirected here.
async fn signup_target(ctx: &ClientContext, session: &Session) -> Option<(String, String)> {
    if let Some(NavigationIntent::Signup { phone_number, uid }) = ctx.nav().await.as_ref() {
        return Some((phone_number.clone(), uid.clone()));
    }
    Some((normalize_phone_number(session.phone_number()?), session.uid()?.to_owned()))
}

fn render_error(phone_number: &str, form: &SignupForm, err: &FlowError) -> Response {
    (err.status(), pages::signup_page(phone_number, form, Some(&err.user_message()))).into_response()
}
