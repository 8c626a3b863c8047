//! In-process identity provider for local development and tests.
//!
//! Issues six-digit numeric codes, keeps only their SHA-256 hash, and echoes
//! the plain code to the log instead of texting it. Fixed codes can be
//! registered per phone number, mirroring provider-side test numbers.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{ChallengeHandle, Identity, IdentityError, IdentityService};

const CODE_LEN: usize = 6;
const MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_CODE_TTL: Duration = Duration::from_secs(5 * 60);

struct PendingChallenge {
    phone_number: String,
    code_hash: String,
    expires_at: Instant,
    attempts: u32,
}

#[derive(Default)]
struct DevState {
    challenges: HashMap<String, PendingChallenge>,
    /// Stable uid per phone number, assigned on first sign-in.
    uids: HashMap<String, String>,
}

pub struct DevIdentityService {
    state: Mutex<DevState>,
    fixed_codes: HashMap<String, String>,
    code_ttl: Duration,
}

impl Default for DevIdentityService {
    fn default() -> Self {
        Self::new()
    }
}

impl DevIdentityService {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(DevState::default()), fixed_codes: HashMap::new(), code_ttl: DEFAULT_CODE_TTL }
    }

    /// Always issue `code` for `phone_number` (E.164) instead of a random one.
    #[must_use]
    pub fn with_fixed_code(mut self, phone_number: impl Into<String>, code: impl Into<String>) -> Self {
        self.fixed_codes.insert(phone_number.into(), code.into());
        self
    }

    #[must_use]
    pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.state.lock().map(|state| state.challenges.len()).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DevState>, IdentityError> {
        self.state
            .lock()
            .map_err(|_| IdentityError::Transport("dev identity state poisoned".into()))
    }
}

#[must_use]
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[must_use]
pub fn hash_code(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    to_hex(&digest)
}

fn random_hex(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    to_hex(&bytes)
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// E.164: leading `+`, then 8 to 15 digits.
fn is_e164(phone_number: &str) -> bool {
    phone_number
        .strip_prefix('+')
        .is_some_and(|digits| (8..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()))
}

#[async_trait::async_trait]
impl IdentityService for DevIdentityService {
    async fn send_verification_code(
        &self,
        phone_number: &str,
        _app_verifier: Option<&str>,
    ) -> Result<ChallengeHandle, IdentityError> {
        if !is_e164(phone_number) {
            return Err(IdentityError::InvalidPhoneNumber);
        }

        let code = self
            .fixed_codes
            .get(phone_number)
            .cloned()
            .unwrap_or_else(generate_code);
        let challenge_id = random_hex(16);

        let now = Instant::now();
        let mut state = self.lock()?;
        // Challenges that were never confirmed are only dropped here.
        state.challenges.retain(|_, pending| pending.expires_at > now);
        state.challenges.insert(
            challenge_id.clone(),
            PendingChallenge {
                phone_number: phone_number.to_owned(),
                code_hash: hash_code(&code),
                expires_at: now + self.code_ttl,
                attempts: 0,
            },
        );
        drop(state);

        tracing::info!(%phone_number, %code, "dev identity issued verification code");
        Ok(ChallengeHandle::new(challenge_id))
    }

    async fn confirm_code(&self, challenge: &ChallengeHandle, code: &str) -> Result<Identity, IdentityError> {
        let mut state = self.lock()?;
        let Some(pending) = state.challenges.get_mut(challenge.as_str()) else {
            return Err(IdentityError::SessionExpired);
        };

        if pending.expires_at <= Instant::now() {
            state.challenges.remove(challenge.as_str());
            return Err(IdentityError::SessionExpired);
        }

        if pending.code_hash != hash_code(code.trim()) {
            pending.attempts += 1;
            if pending.attempts >= MAX_FAILED_ATTEMPTS {
                state.challenges.remove(challenge.as_str());
            }
            return Err(IdentityError::InvalidCode);
        }

        let Some(pending) = state.challenges.remove(challenge.as_str()) else {
            return Err(IdentityError::SessionExpired);
        };
        let uid = state
            .uids
            .entry(pending.phone_number.clone())
            .or_insert_with(|| Uuid::new_v4().simple().to_string())
            .clone();

        Ok(Identity { uid, phone_number: Some(pending.phone_number) })
    }
}

#[cfg(test)]
#[path = "dev_test.rs"]
mod tests;
