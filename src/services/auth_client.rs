//! Per-browser auth client: current user plus change notifications.
//!
//! DESIGN
//! ======
//! Wraps the stateless `IdentityService` with the stateful half of an auth
//! SDK: who is signed in, a `watch` channel announcing every change, and
//! local sign-out. Each change bumps a revision so readers can tell whether
//! the session observer has caught up with the latest change.

use std::sync::Arc;

use tokio::sync::watch;

use crate::identity::{ChallengeHandle, Identity, IdentityError, IdentityService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    /// Incremented on every published change, starting at 0.
    pub revision: u64,
    pub user: Option<Identity>,
}

pub struct AuthClient {
    identity: Arc<dyn IdentityService>,
    state: watch::Sender<AuthState>,
}

impl AuthClient {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        let (state, _) = watch::channel(AuthState { revision: 0, user: None });
        Self { identity, state }
    }

    /// Receive every auth-state change. The current value is readable immediately.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<Identity> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.borrow().revision
    }

    /// Live subscriptions; drops to zero once every observer is torn down.
    #[cfg(test)]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Ask the provider to send a code to `phone_number` (E.164).
    ///
    /// # Errors
    ///
    /// Propagates provider failures unchanged.
    pub async fn send_verification_code(
        &self,
        phone_number: &str,
        app_verifier: Option<&str>,
    ) -> Result<ChallengeHandle, IdentityError> {
        self.identity
            .send_verification_code(phone_number, app_verifier)
            .await
    }

    /// Confirm a code; on success the returned identity becomes the current user.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; the current user is unchanged on error.
    pub async fn confirm_code(&self, challenge: &ChallengeHandle, code: &str) -> Result<Identity, IdentityError> {
        let identity = self.identity.confirm_code(challenge, code).await?;
        tracing::debug!(uid = %identity.uid, "auth client signed in");
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    pub fn sign_out(&self) {
        tracing::debug!("auth client signed out");
        self.publish(None);
    }

    /// Re-announce the current user so subscribers re-derive their state.
    pub fn reload(&self) {
        let user = self.current_user();
        self.publish(user);
    }

    fn publish(&self, user: Option<Identity>) {
        self.state.send_modify(|state| {
            state.revision += 1;
            state.user = user;
        });
    }
}

#[cfg(test)]
#[path = "auth_client_test.rs"]
mod tests;
