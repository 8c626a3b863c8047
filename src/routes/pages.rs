//! HTML rendering for the four screens and the loading spinner.
//!
//! Templates are compiled in with `include_str!` and filled by single-pass
//! `{{KEY}}` substitution, so a value that looks like a placeholder is shown
//! as typed. Every user-supplied value is escaped here.

use axum::response::Html;

use crate::services::profile::UserProfile;
use crate::services::validation::SignupForm;

const LAYOUT_TEMPLATE: &str = include_str!("../../templates/layout.html");
const LOGIN_TEMPLATE: &str = include_str!("../../templates/login.html");
const OTP_TEMPLATE: &str = include_str!("../../templates/otp.html");
const SIGNUP_TEMPLATE: &str = include_str!("../../templates/signup.html");
const HOME_TEMPLATE: &str = include_str!("../../templates/home.html");
const SPINNER_TEMPLATE: &str = include_str!("../../templates/spinner.html");

/// Seconds between spinner refreshes.
const SPINNER_REFRESH_SECS: u64 = 1;

#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn error_block(error: Option<&str>) -> String {
    error.map_or_else(String::new, |message| format!(r#"<p class="error" role="alert">{}</p>"#, escape_html(message)))
}

/// Replace each known `{{KEY}}` in `template`. Inserted values are never
/// rescanned; unknown placeholders are left as they are.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let found = tail[2..].find("}}").and_then(|end| {
            let key = &tail[2..2 + end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end + 4))
        });
        match found {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &tail[consumed..];
            }
            None => {
                out.push_str("{{");
                rest = &tail[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn layout(title: &str, head: &str, body: &str) -> Html<String> {
    Html(fill(LAYOUT_TEMPLATE, &[("HEAD", head), ("TITLE", &escape_html(title)), ("BODY", body)]))
}

#[must_use]
pub fn login_page(phone_number: &str, error: Option<&str>) -> Html<String> {
    let body = fill(LOGIN_TEMPLATE, &[("PHONE", &escape_html(phone_number)), ("ERROR", &error_block(error))]);
    layout("Sign in", "", &body)
}

#[must_use]
pub fn otp_page(phone_number: &str, seconds_remaining: u64, error: Option<&str>) -> Html<String> {
    let (disabled, label) = if seconds_remaining > 0 {
        ("disabled", format!("Resend code in {seconds_remaining}s"))
    } else {
        ("", "Resend code".to_owned())
    };
    let body = fill(
        OTP_TEMPLATE,
        &[
            ("PHONE", &escape_html(phone_number)),
            ("ERROR", &error_block(error)),
            ("RESEND_DISABLED", disabled),
            ("RESEND_LABEL", &label),
        ],
    );
    layout("Verify code", "", &body)
}

#[must_use]
pub fn signup_page(phone_number: &str, form: &SignupForm, error: Option<&str>) -> Html<String> {
    let body = fill(
        SIGNUP_TEMPLATE,
        &[
            ("PHONE", &escape_html(phone_number)),
            ("FIRST_NAME", &escape_html(&form.first_name)),
            ("LAST_NAME", &escape_html(&form.last_name)),
            ("EMAIL", &escape_html(&form.email)),
            ("ERROR", &error_block(error)),
        ],
    );
    layout("Sign up", "", &body)
}

#[must_use]
pub fn home_page(profile: Option<&UserProfile>, phone_number: &str, error: Option<&str>) -> Html<String> {
    let greeting = match profile {
        Some(profile) => format!("Welcome, {}!", profile.display_name()),
        None => "Welcome!".to_owned(),
    };
    let body = fill(
        HOME_TEMPLATE,
        &[
            ("GREETING", &escape_html(&greeting)),
            ("PHONE", &escape_html(phone_number)),
            ("ERROR", &error_block(error)),
        ],
    );
    layout("Home", "", &body)
}

/// Spinner that reloads `refresh_to` until the session settles.
#[must_use]
pub fn spinner_page(refresh_to: &str) -> Html<String> {
    let head = format!(
        r#"<meta http-equiv="refresh" content="{SPINNER_REFRESH_SECS};url={}">"#,
        escape_html(refresh_to)
    );
    layout("Loading", &head, SPINNER_TEMPLATE)
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
