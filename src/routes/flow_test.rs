use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::*;
use crate::config::AppConfig;
use crate::identity::dev::DevIdentityService;
use crate::identity::{ChallengeHandle, Identity, IdentityError, IdentityService};
use crate::services::navigation::NavigationIntent;
use crate::services::otp::OtpStep;
use crate::services::profile::USERS_COLLECTION;
use crate::state::test_helpers::{FailingStore, TEST_CODE, TEST_PHONE, test_app_state, test_app_state_with_store};
use crate::store::{MemoryRecordStore, RecordStore};

/// Drives the router like a browser: keeps the client cookie between calls.
struct Browser {
    app: Router,
    cookie: Option<String>,
}

struct Page {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

impl Browser {
    fn new(state: AppState) -> Self {
        Self { app: app(state), cookie: None }
    }

    async fn get(&mut self, uri: &str) -> Page {
        self.send(Request::get(uri), Body::empty()).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Page {
        let builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(form.to_owned())).await
    }

    async fn send(&mut self, mut builder: axum::http::request::Builder, body: Body) -> Page {
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_owned();
            self.cookie = Some(pair);
        }
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_owned());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Page { status, location, body: String::from_utf8(bytes.to_vec()).unwrap() }
    }

    /// The registered context behind this browser's cookie.
    async fn context(&self, state: &AppState) -> Arc<ClientContext> {
        let cookie = self.cookie.as_deref().unwrap();
        let token = cookie.strip_prefix("phonegate_client=").unwrap();
        state.clients.get(token).await.unwrap()
    }

    async fn sign_in(&mut self) -> Page {
        let page = self.post("/login", "phone_number=9876543210").await;
        assert_eq!(page.location.as_deref(), Some("/otp"));
        self.post("/otp", &format!("code={TEST_CODE}")).await
    }
}

fn assert_redirect(page: &Page, to: &str) {
    assert_eq!(page.status, StatusCode::SEE_OTHER, "body: {}", page.body);
    assert_eq!(page.location.as_deref(), Some(to));
}

/// Dev identity whose code confirmation takes `delay`.
struct SlowConfirm {
    inner: DevIdentityService,
    delay: Duration,
}

#[async_trait::async_trait]
impl IdentityService for SlowConfirm {
    async fn send_verification_code(
        &self,
        phone_number: &str,
        app_verifier: Option<&str>,
    ) -> Result<ChallengeHandle, IdentityError> {
        self.inner.send_verification_code(phone_number, app_verifier).await
    }

    async fn confirm_code(&self, challenge: &ChallengeHandle, code: &str) -> Result<Identity, IdentityError> {
        tokio::time::sleep(self.delay).await;
        self.inner.confirm_code(challenge, code).await
    }
}

// =============================================================================
// plumbing
// =============================================================================

#[tokio::test]
async fn root_and_unknown_paths_redirect_to_login() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    assert_redirect(&browser.get("/").await, "/login");
    assert_redirect(&browser.get("/nowhere").await, "/login");
}

#[tokio::test]
async fn healthz_ok() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    assert_eq!(browser.get("/healthz").await.status, StatusCode::OK);
}

#[tokio::test]
async fn first_state_change_sets_http_only_cookie() {
    let (state, _) = test_app_state();
    let response = app(state)
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("phone_number=9876543210"))
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("phonegate_client="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn known_cookie_is_not_reissued() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state.clone());
    browser.post("/login", "phone_number=9876543210").await;
    assert_eq!(state.clients.len().await, 1);

    let response = browser
        .app
        .clone()
        .oneshot(
            Request::get("/login")
                .header(header::COOKIE, browser.cookie.clone().unwrap())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(state.clients.len().await, 1);
}

#[tokio::test]
async fn cookieless_requests_leave_no_context() {
    let (state, _) = test_app_state();
    let app = app(state.clone());
    for uri in ["/login", "/home", "/otp", "/api/session?screen=home"] {
        for _ in 0..25 {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.headers().get(header::SET_COOKIE).is_none(), "{uri}");
        }
    }
    assert_eq!(state.clients.len().await, 0);

    let mut browser = Browser::new(state.clone());
    assert_eq!(browser.post("/login", "phone_number=12").await.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(browser.cookie.is_none());
    assert_eq!(state.clients.len().await, 0);
}

// =============================================================================
// guard
// =============================================================================

#[tokio::test]
async fn protected_screens_redirect_to_login_when_signed_out() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    assert_redirect(&browser.get("/home").await, "/login");
    assert_redirect(&browser.get("/signup").await, "/login");
}

#[tokio::test]
async fn otp_without_sent_code_redirects_to_login() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    assert_redirect(&browser.get("/otp").await, "/login");
    assert_redirect(&browser.post("/otp", "code=123456").await, "/login");
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_rejects_invalid_phone() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    for input in ["12345", "98765432100", "98765abc10", ""] {
        let page = browser.post("/login", &format!("phone_number={input}")).await;
        assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(page.body.contains("Please enter a valid 10-digit phone number"), "input {input:?}");
    }
}

#[tokio::test]
async fn login_sends_code_and_shows_otp_screen() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    assert_redirect(&browser.post("/login", "phone_number=9876543210").await, "/otp");

    let page = browser.get("/otp").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("+919876543210"));
    assert!(page.body.contains("Resend code in"));
}

// =============================================================================
// otp
// =============================================================================

#[tokio::test]
async fn wrong_code_shows_inline_error_and_allows_retry() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    browser.post("/login", "phone_number=9876543210").await;

    let page = browser.post("/otp", "code=000000").await;
    assert_eq!(page.status, StatusCode::UNAUTHORIZED);
    assert!(page.body.contains("Invalid OTP. Please try again."));

    assert_redirect(&browser.post("/otp", &format!("code={TEST_CODE}")).await, "/signup");
}

#[tokio::test]
async fn malformed_code_is_rejected_before_provider() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    browser.post("/login", "phone_number=9876543210").await;

    let page = browser.post("/otp", "code=12").await;
    assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(page.body.contains("Please enter the 6-digit code"));
}

#[tokio::test]
async fn resend_before_timer_expires_is_rejected() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    browser.post("/login", "phone_number=9876543210").await;

    let page = browser.post("/otp/resend", "").await;
    assert_eq!(page.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(page.body.contains("Please wait"));
}

#[tokio::test]
async fn resend_after_timer_returns_to_prefilled_login() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state.clone());
    browser.post("/login", "phone_number=9876543210").await;

    let sent_at = Instant::now().checked_sub(Duration::from_secs(31)).unwrap();
    browser
        .context(&state)
        .await
        .navigate(Some(NavigationIntent::Otp {
            phone_number: TEST_PHONE.into(),
            challenge: ChallengeHandle::new("challenge"),
            step: OtpStep::new(sent_at),
        }))
        .await;

    assert_redirect(&browser.post("/otp/resend", "").await, "/login");
    let page = browser.get("/login").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains(r#"value="9876543210""#));
}

#[tokio::test]
async fn dropped_verification_does_not_block_retry() {
    let identity = SlowConfirm {
        inner: DevIdentityService::new().with_fixed_code(TEST_PHONE, TEST_CODE),
        delay: Duration::from_millis(300),
    };
    let config = AppConfig { session_settle: Duration::from_secs(2), ..AppConfig::default() };
    let state = AppState::new(config, Arc::new(identity), Arc::new(MemoryRecordStore::new()));
    let mut browser = Browser::new(state);
    browser.post("/login", "phone_number=9876543210").await;

    let form = format!("code={TEST_CODE}");
    let dropped = tokio::time::timeout(Duration::from_millis(50), browser.post("/otp", &form)).await;
    assert!(dropped.is_err());

    assert_redirect(&browser.post("/otp", &form).await, "/signup");
}

#[tokio::test]
async fn verified_user_with_profile_goes_home() {
    let (state, store) = test_app_state();
    store
        .set(
            USERS_COLLECTION,
            "919876543210",
            json!({ "phoneNumber": "919876543210", "firstName": "Asha", "lastName": "Rao", "email": "asha@example.com" }),
        )
        .await
        .unwrap();
    let mut browser = Browser::new(state);

    assert_redirect(&browser.sign_in().await, "/home");
    let page = browser.get("/home").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Welcome, Asha Rao!"));
    assert_redirect(&browser.get("/login").await, "/home");
}

// =============================================================================
// signup
// =============================================================================

#[tokio::test]
async fn signup_intent_carries_normalized_phone_and_uid() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state.clone());
    assert_redirect(&browser.sign_in().await, "/signup");

    let ctx = browser.context(&state).await;
    let uid = ctx.auth.current_user().unwrap().uid;
    let expect_intent = |nav: Option<&NavigationIntent>| match nav {
        Some(NavigationIntent::Signup { phone_number, uid: intent_uid }) => {
            assert_eq!(phone_number, "919876543210");
            assert_eq!(intent_uid, &uid);
        }
        other => panic!("unexpected intent: {other:?}"),
    };
    expect_intent(ctx.nav().await.as_ref());

    ctx.navigate(None).await;
    assert_redirect(&browser.get("/home").await, "/signup");
    expect_intent(ctx.nav().await.as_ref());
}

#[tokio::test]
async fn signup_requires_last_name_and_writes_nothing() {
    let (state, store) = test_app_state();
    let mut browser = Browser::new(state);
    assert_redirect(&browser.sign_in().await, "/signup");

    let page = browser
        .post("/signup", "first_name=Asha&last_name=&email=asha%40example.com")
        .await;
    assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(page.body.contains("Last name is required"));
    assert!(page.body.contains(r#"value="Asha""#));
    assert_eq!(store.count(USERS_COLLECTION).await, 0);
}

#[tokio::test]
async fn signup_writes_profile_and_welcomes_user() {
    let (state, store) = test_app_state();
    let mut browser = Browser::new(state);
    assert_redirect(&browser.sign_in().await, "/signup");
    assert_redirect(&browser.get("/home").await, "/signup");

    let page = browser
        .post("/signup", "first_name=+Asha+&last_name=Rao&email=asha%40example.com")
        .await;
    assert_redirect(&page, "/home");
    assert_eq!(store.count(USERS_COLLECTION).await, 1);

    let record: Value = store
        .get(USERS_COLLECTION, "919876543210")
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(record["firstName"], "Asha");
    assert!(record["uid"].is_string());
    assert!(record["createdAt"].is_string());

    let page = browser.get("/home").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Welcome, Asha Rao!"));
}

#[tokio::test]
async fn signup_write_failure_shows_message() {
    let state = test_app_state_with_store(Arc::new(FailingStore));
    let mut browser = Browser::new(state);
    assert_redirect(&browser.sign_in().await, "/signup");

    let page = browser
        .post("/signup", "first_name=Asha&last_name=Rao&email=asha%40example.com")
        .await;
    assert_eq!(page.status, StatusCode::BAD_GATEWAY);
    assert!(page.body.contains("Failed to complete signup. Please try again."));
}

// =============================================================================
// logout + session api
// =============================================================================

#[tokio::test]
async fn logout_signs_out() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state.clone());
    browser.sign_in().await;
    assert_eq!(state.clients.len().await, 1);

    assert_redirect(&browser.post("/logout", "").await, "/login");
    assert_eq!(state.clients.len().await, 0);
    assert_redirect(&browser.get("/home").await, "/login");
    assert_eq!(browser.get("/login").await.status, StatusCode::OK);
}

#[tokio::test]
async fn session_api_reports_guard_decision() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);

    let page = browser.get("/api/session?screen=home").await;
    assert_eq!(page.status, StatusCode::OK);
    let view: Value = serde_json::from_str(&page.body).unwrap();
    assert_eq!(view["is_authenticated"], false);
    assert_eq!(view["decision"], "redirect_login");

    browser.sign_in().await;
    let page = browser.get("/api/session?screen=/home").await;
    let view: Value = serde_json::from_str(&page.body).unwrap();
    assert_eq!(view["is_authenticated"], true);
    assert_eq!(view["user_exists"], false);
    assert_eq!(view["phone_number"], "+919876543210");
    assert_eq!(view["navigation"], "signup");
    assert_eq!(view["decision"], "redirect_signup");
    assert!(!page.body.contains("\"identity\""));
}

#[tokio::test]
async fn session_api_rejects_unknown_screen() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    assert_eq!(browser.get("/api/session?screen=admin").await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_api_reports_otp_progress() {
    let (state, _) = test_app_state();
    let mut browser = Browser::new(state);
    browser.post("/login", "phone_number=9876543210").await;
    browser.post("/otp", "code=000000").await;

    let page = browser.get("/api/session").await;
    let view: Value = serde_json::from_str(&page.body).unwrap();
    assert_eq!(view["navigation"], "otp");
    assert_eq!(view["otp"]["phase"], "failed");
    assert_eq!(view["otp"]["can_resend"], false);
    assert!(view["otp"]["seconds_remaining"].as_u64().unwrap() > 0);
    assert!(view["decision"].is_null());
}
