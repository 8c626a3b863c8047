//! Runtime configuration parsed from environment variables.
//!
//! Optional backends fall back to in-process stand-ins: no `DATABASE_URL`
//! means the in-memory record store, no `FIREBASE_API_KEY` means the dev
//! identity provider.

use std::time::Duration;

use crate::identity::firebase::FirebaseConfig;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_COUNTRY_CODE: &str = "+91";
pub const DEFAULT_CLIENT_IDLE_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_CLIENT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_SESSION_SETTLE_MS: u64 = 1500;
pub const DEFAULT_DEV_CODE_TTL_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub firebase: Option<FirebaseConfig>,
    /// Prefix applied to the 10-digit number typed on the login screen.
    pub country_code: String,
    pub cookie_secure: bool,
    /// Browser contexts idle longer than this are torn down.
    pub client_idle_ttl: Duration,
    pub client_sweep_interval: Duration,
    /// Upper bound on waiting for the session observer before showing the spinner.
    pub session_settle: Duration,
    /// `(E.164 phone, code)` pairs the dev identity provider always issues.
    pub dev_fixed_codes: Vec<(String, String)>,
    pub dev_code_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            firebase: None,
            country_code: DEFAULT_COUNTRY_CODE.to_owned(),
            cookie_secure: false,
            client_idle_ttl: Duration::from_secs(DEFAULT_CLIENT_IDLE_TTL_SECS),
            client_sweep_interval: Duration::from_secs(DEFAULT_CLIENT_SWEEP_INTERVAL_SECS),
            session_settle: Duration::from_millis(DEFAULT_SESSION_SETTLE_MS),
            dev_fixed_codes: Vec::new(),
            dev_code_ttl: Duration::from_secs(DEFAULT_DEV_CODE_TTL_SECS),
        }
    }
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// - `PORT` (default 3000)
    /// - `DATABASE_URL`, `DB_MAX_CONNECTIONS` (default 5)
    /// - `FIREBASE_API_KEY`, `FIREBASE_AUTH_BASE_URL`
    /// - `PHONE_COUNTRY_CODE` (default `+91`)
    /// - `COOKIE_SECURE` (default false)
    /// - `CLIENT_IDLE_TTL_SECS`, `CLIENT_SWEEP_INTERVAL_SECS`
    /// - `SESSION_SETTLE_MS` (default 1500)
    /// - `DEV_FIXED_OTP`: comma-separated `+15550001111:123456` pairs
    /// - `DEV_CODE_TTL_SECS` (default 300)
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is set but not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        let country_code = std::env::var("PHONE_COUNTRY_CODE")
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_owned());

        Ok(Self {
            port,
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            firebase: FirebaseConfig::from_env(),
            country_code,
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            client_idle_ttl: Duration::from_secs(env_parse("CLIENT_IDLE_TTL_SECS", DEFAULT_CLIENT_IDLE_TTL_SECS)),
            client_sweep_interval: Duration::from_secs(env_parse(
                "CLIENT_SWEEP_INTERVAL_SECS",
                DEFAULT_CLIENT_SWEEP_INTERVAL_SECS,
            )),
            session_settle: Duration::from_millis(env_parse("SESSION_SETTLE_MS", DEFAULT_SESSION_SETTLE_MS)),
            dev_fixed_codes: std::env::var("DEV_FIXED_OTP")
                .map(|raw| parse_fixed_codes(&raw))
                .unwrap_or_default(),
            dev_code_ttl: Duration::from_secs(env_parse("DEV_CODE_TTL_SECS", DEFAULT_DEV_CODE_TTL_SECS)),
        })
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Parse `phone:code[,phone:code...]`, skipping malformed entries.
pub(crate) fn parse_fixed_codes(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (phone, code) = pair.split_once(':')?;
            let (phone, code) = (phone.trim(), code.trim());
            if phone.is_empty() || code.is_empty() {
                return None;
            }
            Some((phone.to_owned(), code.to_owned()))
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
