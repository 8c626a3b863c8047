//! User record lookup and signup write.
//!
//! Profiles live in the `users` collection keyed by the normalized (digits
//! only) phone number.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::services::validation::{ProfileInput, normalize_phone_number};
use crate::store::{RecordStore, StoreError};

pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_owned()
    }
}

/// Fetch the profile for `phone_number` (any format; normalized here).
///
/// # Errors
///
/// Returns an error if the store call fails or the stored document does not
/// decode as a profile.
pub async fn lookup_profile(store: &dyn RecordStore, phone_number: &str) -> Result<Option<UserProfile>, StoreError> {
    let key = normalize_phone_number(phone_number);
    if key.is_empty() {
        return Ok(None);
    }

    let snapshot = store.get(USERS_COLLECTION, &key).await?;
    let Some(data) = snapshot.data else {
        return Ok(None);
    };
    serde_json::from_value(data)
        .map(Some)
        .map_err(|e| StoreError::Malformed { key, reason: e.to_string() })
}

/// Whether a profile exists for `phone_number`.
///
/// Lookup failures count as "does not exist": they are logged and the
/// caller proceeds toward signup. No retry.
pub async fn profile_exists(store: &dyn RecordStore, phone_number: &str) -> bool {
    let key = normalize_phone_number(phone_number);
    if key.is_empty() {
        return false;
    }
    match store.get(USERS_COLLECTION, &key).await {
        Ok(snapshot) => snapshot.exists(),
        Err(e) => {
            tracing::warn!(error = %e, %key, "profile existence check failed; treating as missing");
            false
        }
    }
}

/// Write the signup profile for `phone_number`, replacing any existing one.
/// An existing record keeps its `createdAt`.
///
/// # Errors
///
/// Returns an error if reading the existing record or the write fails.
pub async fn create_profile(
    store: &dyn RecordStore,
    phone_number: &str,
    uid: &str,
    input: &ProfileInput,
) -> Result<UserProfile, StoreError> {
    let key = normalize_phone_number(phone_number);
    let now = now_rfc3339();
    let created_at = store
        .get(USERS_COLLECTION, &key)
        .await?
        .data
        .and_then(|data| data.get("createdAt")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| now.clone());
    let profile = UserProfile {
        phone_number: key.clone(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        email: input.email.clone(),
        uid: Some(uid.to_owned()),
        created_at: Some(created_at),
        updated_at: Some(now),
    };

    let data = serde_json::to_value(&profile).map_err(|e| StoreError::Malformed { key: key.clone(), reason: e.to_string() })?;
    store.set(USERS_COLLECTION, &key, data).await?;
    tracing::info!(%key, %uid, "user profile created");
    Ok(profile)
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
