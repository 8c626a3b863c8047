//! In-memory record store.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{RecordStore, Snapshot, StoreError};

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<(String, String), serde_json::Value>>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored in `collection`.
    #[cfg(test)]
    pub async fn count(&self, collection: &str) -> usize {
        self.records
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Snapshot, StoreError> {
        let records = self.records.read().await;
        Ok(match records.get(&(collection.to_owned(), key.to_owned())) {
            Some(data) => Snapshot { key: key.to_owned(), data: Some(data.clone()) },
            None => Snapshot::missing(key),
        })
    }

    async fn set(&self, collection: &str, key: &str, data: serde_json::Value) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert((collection.to_owned(), key.to_owned()), data);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
