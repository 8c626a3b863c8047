//! Postgres-backed record store over the `records` table.

use sqlx::{PgPool, Row};

use super::{RecordStore, Snapshot, StoreError};

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Pool exhaustion and shutdown mean the store is unreachable, not that the
/// query was wrong.
fn classify(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(e.to_string()),
        other => StoreError::Db(other),
    }
}

#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Snapshot, StoreError> {
        let row = sqlx::query("SELECT data FROM records WHERE collection = $1 AND key = $2")
            .bind(collection)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;

        Ok(match row {
            Some(row) => Snapshot { key: key.to_owned(), data: Some(row.try_get("data")?) },
            None => Snapshot::missing(key),
        })
    }

    async fn set(&self, collection: &str, key: &str, data: serde_json::Value) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO records (collection, key, data)
              VALUES ($1, $2, $3)
              ON CONFLICT (collection, key) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
        )
        .bind(collection)
        .bind(key)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }
}
