//! Browser contexts: one auth client, observer and navigation slot per cookie.
//!
//! ARCHITECTURE
//! ============
//! The registry maps an opaque cookie token to a `ClientContext`. Creating
//! a context subscribes a fresh `SessionObserver`; removing it (explicitly
//! or via the idle sweeper) drops the observer, which unsubscribes.
//!
//! A request without a known cookie gets a detached context that is not in
//! the registry. It is inserted only once it holds state worth keeping (a
//! navigation intent or a signed-in user); otherwise it is dropped with the
//! request, so cookieless traffic leaves nothing behind.
//!
//! TRADE-OFFS
//! ==========
//! Contexts live in memory only: a restart signs every browser out. Unknown
//! cookie tokens are never adopted; a new context gets a new token.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::{MutexGuard, RwLock};
use tokio::task::JoinHandle;

use crate::identity::IdentityService;
use crate::services::auth_client::AuthClient;
use crate::services::navigation::NavigationIntent;
use crate::services::observer::{Session, SessionObserver};
use crate::store::RecordStore;

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

// =============================================================================
// CLIENT CONTEXT
// =============================================================================

pub struct ClientContext {
    pub id: String,
    pub auth: AuthClient,
    observer: SessionObserver,
    nav: tokio::sync::Mutex<Option<NavigationIntent>>,
    last_seen: Mutex<Instant>,
}

impl ClientContext {
    fn new(id: String, identity: Arc<dyn IdentityService>, store: Arc<dyn RecordStore>) -> Self {
        let auth = AuthClient::new(identity);
        let observer = SessionObserver::spawn(auth.subscribe(), store);
        Self { id, auth, observer, nav: tokio::sync::Mutex::new(None), last_seen: Mutex::new(Instant::now()) }
    }

    /// Session reflecting the latest auth change, or a loading session if the
    /// observer has not caught up within `wait`.
    pub async fn session(&self, wait: Duration) -> Session {
        self.observer.settled(self.auth.revision(), wait).await
    }

    /// Navigation slot. Do not hold the guard across external calls.
    pub async fn nav(&self) -> MutexGuard<'_, Option<NavigationIntent>> {
        self.nav.lock().await
    }

    pub async fn navigate(&self, intent: Option<NavigationIntent>) {
        *self.nav.lock().await = intent;
    }

    /// True once the context carries something a later request needs.
    pub async fn holds_state(&self) -> bool {
        self.auth.current_user().is_some() || self.nav.lock().await.is_some()
    }

    /// Put an in-flight OTP verification back to awaiting the code. Runs
    /// inline when the slot is free, otherwise on a spawned task.
    pub fn abandon_verification(self: &Arc<Self>) {
        if let Ok(mut nav) = self.nav.try_lock() {
            abandon_otp_step(&mut nav);
            return;
        }
        let ctx = Arc::clone(self);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { abandon_otp_step(&mut *ctx.nav.lock().await) });
        }
    }

    fn touch(&self) {
        if let Ok(mut seen) = self.last_seen.lock() {
            *seen = Instant::now();
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        self.last_seen
            .lock()
            .map(|seen| now.saturating_duration_since(*seen))
            .unwrap_or_default()
    }
}

fn abandon_otp_step(nav: &mut Option<NavigationIntent>) {
    if let Some(NavigationIntent::Otp { step, .. }) = nav.as_mut() {
        step.abandon_verify();
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Clone)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<String, Arc<ClientContext>>>>,
    identity: Arc<dyn IdentityService>,
    store: Arc<dyn RecordStore>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityService>, store: Arc<dyn RecordStore>) -> Self {
        Self { clients: Arc::new(RwLock::new(HashMap::new())), identity, store }
    }

    /// Look up a live context and mark it as seen.
    pub async fn get(&self, id: &str) -> Option<Arc<ClientContext>> {
        let client = self.clients.read().await.get(id).cloned()?;
        client.touch();
        Some(client)
    }

    /// A fresh context under a new token, not yet registered.
    #[must_use]
    pub fn detached(&self) -> Arc<ClientContext> {
        Arc::new(ClientContext::new(generate_token(), self.identity.clone(), self.store.clone()))
    }

    /// Register a detached context so its cookie resolves on later requests.
    pub async fn insert(&self, client: Arc<ClientContext>) {
        self.clients.write().await.insert(client.id.clone(), client);
        tracing::debug!("browser context registered");
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.clients.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Drop every context idle for at least `ttl`, and any whose observer has
    /// stopped. Returns how many were removed.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut clients = self.clients.write().await;
        let before = clients.len();
        clients.retain(|_, client| client.idle_for(now) < ttl && !client.observer.is_finished());
        before - clients.len()
    }
}

/// Spawn the idle-context sweeper. Returns a handle for shutdown.
pub fn spawn_client_sweeper(registry: ClientRegistry, ttl: Duration, interval: Duration) -> JoinHandle<()> {
    tracing::info!(ttl_secs = ttl.as_secs(), interval_secs = interval.as_secs(), "browser context sweeper configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let removed = registry.sweep_idle(ttl).await;
            if removed > 0 {
                let remaining = registry.len().await;
                tracing::info!(removed, remaining, "swept idle browser contexts");
            }
        }
    })
}

#[cfg(test)]
#[path = "clients_test.rs"]
mod tests;
