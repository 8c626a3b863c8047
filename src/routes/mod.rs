//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each screen is a server-rendered page. A browser is tied to its
//! `ClientContext` by the `phonegate_client` cookie; every screen handler
//! first settles the context's session and runs the route guard, then does
//! its own work. All redirects are 303 so form posts turn into GETs.

pub mod home;
pub mod login;
pub mod otp;
pub mod pages;
pub mod session;
pub mod signup;

use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tower_http::trace::TraceLayer;

use crate::error::{FlowError, NavigationStateError};
use crate::services::clients::{ClientContext, ClientRegistry};
use crate::services::guard::{GuardDecision, Screen, resolve};
use crate::services::observer::Session;
use crate::state::AppState;

pub const CLIENT_COOKIE: &str = "phonegate_client";

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(redirect_to_login))
        .route("/login", get(login::show).post(login::submit))
        .route("/otp", get(otp::show).post(otp::submit))
        .route("/otp/resend", post(otp::resend))
        .route("/signup", get(signup::show).post(signup::submit))
        .route("/home", get(home::show))
        .route("/logout", post(home::logout))
        .route("/api/session", get(session::snapshot))
        .route("/healthz", get(healthz))
        .fallback(redirect_to_login)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn redirect_to_login() -> Redirect {
    Redirect::to(Screen::Login.path())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// BROWSER CLIENT EXTRACTOR
// =============================================================================

/// The browser context for this request. A missing or unknown cookie gets a
/// detached context; `respond` registers it and sets the cookie only when the
/// handler left state in it.
pub struct BrowserClient {
    pub ctx: Arc<ClientContext>,
    registry: ClientRegistry,
    registered: bool,
    secure: bool,
}

impl<S> FromRequestParts<S> for BrowserClient
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(CLIENT_COOKIE)
            .map(Cookie::value)
            .filter(|token| !token.is_empty());

        let known = match token {
            Some(token) => app_state.clients.get(token).await,
            None => None,
        };
        let registered = known.is_some();
        let ctx = known.unwrap_or_else(|| app_state.clients.detached());
        Ok(Self { ctx, registry: app_state.clients.clone(), registered, secure: app_state.config.cookie_secure })
    }
}

impl BrowserClient {
    /// Register a detached context that now holds state, and attach its cookie.
    pub async fn respond(self, response: impl IntoResponse) -> Response {
        if self.registered || !self.ctx.holds_state().await {
            return response.into_response();
        }
        let cookie = client_cookie(self.ctx.id.clone(), self.secure);
        self.registry.insert(self.ctx).await;
        (CookieJar::new().add(cookie), response).into_response()
    }
}

fn client_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CLIENT_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

// =============================================================================
// GUARD
// =============================================================================

/// Settle the session and run the route guard for `screen`.
///
/// # Errors
///
/// Returns the spinner page or a redirect when the screen may not be shown.
pub(crate) async fn guard(state: &AppState, ctx: &ClientContext, screen: Screen) -> Result<Session, Response> {
    let session = ctx.session(state.config.session_settle).await;
    match resolve(session.guard_input(), screen) {
        GuardDecision::ShowRequestedScreen => Ok(session),
        GuardDecision::ShowSpinner => Err(pages::spinner_page(screen.path()).into_response()),
        decision => {
            let target = decision.redirect_to().unwrap_or(Screen::Login);
            tracing::debug!(requested = screen.path(), target = target.path(), "route guard redirect");
            Err(Redirect::to(target.path()).into_response())
        }
    }
}

/// A screen reached without the navigation state it needs goes back to login.
pub(crate) fn missing_state(screen: Screen) -> Response {
    let err = FlowError::from(NavigationStateError { screen: screen.path() });
    tracing::debug!(error = %err, "redirecting to login");
    Redirect::to(Screen::Login.path()).into_response()
}

#[cfg(test)]
#[path = "flow_test.rs"]
mod tests;
