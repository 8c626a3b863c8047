//! Home screen and sign-out.

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};

use super::{BrowserClient, guard, missing_state, pages};
use crate::error::{ExternalServiceError, FlowError};
use crate::services::clients::ClientContext;
use crate::services::guard::Screen;
use crate::services::navigation::NavigationIntent;
use crate::services::profile::lookup_profile;
use crate::services::validation::normalize_phone_number;
use crate::state::AppState;

/// `GET /home`
pub async fn show(State(state): State<AppState>, client: BrowserClient) -> Response {
    let response = welcome(&state, &client.ctx).await;
    client.respond(response).await
}

/// `POST /logout`: sign out and drop the browser context. The stale cookie
/// then resolves to nothing and the next visit starts detached.
pub async fn logout(State(state): State<AppState>, client: BrowserClient) -> Response {
    client.ctx.auth.sign_out();
    client.ctx.navigate(None).await;
    if state.clients.remove(&client.ctx.id).await {
        tracing::info!("signed out");
    }
    client.respond(Redirect::to(Screen::Login.path())).await
}

async fn welcome(state: &AppState, ctx: &ClientContext) -> Response {
    let session = match guard(state, ctx, Screen::Home).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    let (Some(phone_number), Some(uid)) = (session.phone_number(), session.uid()) else {
        return missing_state(Screen::Home);
    };

    match lookup_profile(state.store.as_ref(), phone_number).await {
        Ok(Some(profile)) => pages::home_page(Some(&profile), phone_number, None).into_response(),
        Ok(None) => {
            let phone_number = normalize_phone_number(phone_number);
            let intent = NavigationIntent::Signup { phone_number, uid: uid.to_owned() };
            ctx.navigate(Some(intent)).await;
            Redirect::to(Screen::Signup.path()).into_response()
        }
        Err(e) => {
            let err = FlowError::from(ExternalServiceError::ProfileRead(e));
            tracing::error!(error = %err, %phone_number, "profile load failed");
            (err.status(), pages::home_page(None, phone_number, Some(&err.user_message()))).into_response()
        }
    }
}
