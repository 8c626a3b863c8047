//! Record store adapters: keyed JSON documents grouped by collection.
//!
//! DESIGN
//! ======
//! The store is a document database seen through two operations: read one
//! document and overwrite one document. Postgres backs it in deployment; an
//! in-memory map backs it when no `DATABASE_URL` is configured and in tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

/// Errors produced by record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed record {key}: {reason}")]
    Malformed { key: String, reason: String },
}

/// Result of reading one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub key: String,
    pub data: Option<serde_json::Value>,
}

impl Snapshot {
    #[must_use]
    pub fn missing(key: &str) -> Self {
        Self { key: key.to_owned(), data: None }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the document stored under `key` in `collection`.
    async fn get(&self, collection: &str, key: &str) -> Result<Snapshot, StoreError>;

    /// Create or fully replace the document stored under `key` in `collection`.
    async fn set(&self, collection: &str, key: &str, data: serde_json::Value) -> Result<(), StoreError>;
}
