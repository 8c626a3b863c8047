//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the loaded config, the record store behind a trait object, and
//! the registry of live browser contexts. Each context owns its own auth
//! client (wrapping the shared identity service), session observer and
//! navigation slot.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::identity::IdentityService;
use crate::services::clients::ClientRegistry;
use crate::store::RecordStore;

/// Clone is required by Axum; every field is Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
    pub clients: ClientRegistry,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, identity: Arc<dyn IdentityService>, store: Arc<dyn RecordStore>) -> Self {
        let clients = ClientRegistry::new(identity, store.clone());
        Self { config: Arc::new(config), store, clients }
    }
}
