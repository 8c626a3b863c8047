//! Session observer: turns auth changes into route-guard inputs.
//!
//! ARCHITECTURE
//! ============
//! One task per browser context watches the auth client. For each change it
//! runs the profile lookup (when a phone identity is present) and publishes
//! a fresh `Session` through its own `watch` channel. Changes are handled
//! strictly one at a time: the next change is not read until the previous
//! lookup has finished and its session is published.
//!
//! Dropping the `SessionObserver` aborts the task, which unsubscribes from
//! the auth client. A lookup still in flight at that moment is discarded.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::identity::Identity;
use crate::services::auth_client::AuthState;
use crate::services::guard::GuardInput;
use crate::services::profile;
use crate::store::RecordStore;

/// Raw session fields. Written only by the observer task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub is_authenticated: bool,
    pub is_loading: bool,
    #[serde(skip)]
    pub identity: Option<Identity>,
    pub user_exists: Option<bool>,
    /// Auth revision this session reflects; `None` before the first event.
    pub revision: Option<u64>,
}

impl Session {
    #[must_use]
    pub fn loading() -> Self {
        Self { is_authenticated: false, is_loading: true, identity: None, user_exists: None, revision: None }
    }

    #[must_use]
    pub fn guard_input(&self) -> GuardInput {
        GuardInput {
            is_loading: self.is_loading,
            is_authenticated: self.is_authenticated,
            user_exists: self.user_exists,
        }
    }

    /// Signed-in phone number (E.164), if any.
    #[must_use]
    pub fn phone_number(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|i| i.phone_number.as_deref())
    }

    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.uid.as_str())
    }
}

pub struct SessionObserver {
    session: watch::Receiver<Session>,
    task: JoinHandle<()>,
}

impl SessionObserver {
    /// Subscribe to `auth` and start deriving sessions.
    #[must_use]
    pub fn spawn(auth: watch::Receiver<AuthState>, store: Arc<dyn RecordStore>) -> Self {
        let (tx, session) = watch::channel(Session::loading());
        let task = tokio::spawn(run(auth, store, tx));
        Self { session, task }
    }

    /// Latest published session, which may lag the auth client.
    #[must_use]
    pub fn current(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Wait up to `wait` for a session reflecting auth `revision`.
    ///
    /// On timeout the latest session is returned marked as loading, so the
    /// guard shows the spinner instead of acting on stale state.
    pub async fn settled(&self, revision: u64, wait: Duration) -> Session {
        let mut rx = self.session.clone();
        let caught_up = tokio::time::timeout(wait, rx.wait_for(|s| s.revision.is_some_and(|r| r >= revision))).await;
        match caught_up {
            Ok(Ok(session)) => Session::clone(&session),
            _ => Session { is_loading: true, ..self.current() },
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SessionObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(mut auth: watch::Receiver<AuthState>, store: Arc<dyn RecordStore>, tx: watch::Sender<Session>) {
    loop {
        let state = auth.borrow_and_update().clone();
        let session = derive_session(&state, store.as_ref()).await;
        tracing::debug!(
            revision = state.revision,
            authenticated = session.is_authenticated,
            user_exists = ?session.user_exists,
            "session updated"
        );
        if tx.send(session).is_err() {
            break;
        }
        if auth.changed().await.is_err() {
            break;
        }
    }
}

/// Derive the session for one auth state, running the profile lookup when a
/// phone identity is signed in.
pub async fn derive_session(state: &AuthState, store: &dyn RecordStore) -> Session {
    let signed_in = state
        .user
        .as_ref()
        .and_then(|user| user.phone_number.as_deref().map(|phone| (user, phone)));

    match signed_in {
        Some((user, phone)) => {
            let exists = profile::profile_exists(store, phone).await;
            Session {
                is_authenticated: true,
                is_loading: false,
                identity: Some(user.clone()),
                user_exists: Some(exists),
                revision: Some(state.revision),
            }
        }
        None => Session {
            is_authenticated: false,
            is_loading: false,
            identity: None,
            user_exists: None,
            revision: Some(state.revision),
        },
    }
}

#[cfg(test)]
#[path = "observer_test.rs"]
mod tests;
