mod config;
mod db;
mod error;
mod identity;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::identity::IdentityService;
use crate::identity::dev::DevIdentityService;
use crate::identity::firebase::FirebaseIdentityService;
use crate::store::{MemoryRecordStore, PgRecordStore, RecordStore};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,phonegate=debug,sqlx=warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(database_url) => {
            let pool = db::init_pool(database_url, config.db_max_connections)
                .await
                .expect("database init failed");
            tracing::info!("using postgres record store");
            Arc::new(PgRecordStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory record store");
            Arc::new(MemoryRecordStore::new())
        }
    };

    let identity: Arc<dyn IdentityService> = match &config.firebase {
        Some(firebase) => {
            tracing::info!(base_url = %firebase.base_url, "using firebase identity service");
            Arc::new(FirebaseIdentityService::new(firebase.clone()).expect("identity client init failed"))
        }
        None => {
            tracing::warn!("FIREBASE_API_KEY not set; using dev identity service (codes are logged)");
            let dev = config
                .dev_fixed_codes
                .iter()
                .fold(DevIdentityService::new().with_code_ttl(config.dev_code_ttl), |dev, (phone, code)| {
                    dev.with_fixed_code(phone, code)
                });
            Arc::new(dev)
        }
    };

    let port = config.port;
    let (idle_ttl, sweep_interval) = (config.client_idle_ttl, config.client_sweep_interval);
    let state = state::AppState::new(config, identity, store);

    let _sweeper = services::clients::spawn_client_sweeper(state.clients.clone(), idle_ttl, sweep_interval);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "phonegate listening");
    axum::serve(listener, app).await.expect("server failed");
}
