// lookout/src/store/mod.rs
//
// Persistence seams for detection events and feature settings.
//
// Two backends implement both traits:
//   memory: DashMap-backed, process-local (tests, ephemeral runs)
//   sqlite: rusqlite, one serialized connection (production)
//
// Writers never coordinate at the application level; each insert/delete is
// one store operation.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::events::{ExtensionDetectionEvent, FeatureSettings, NewDetectionEvent};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait EventStore: Send + Sync {
    /// Insert one event; returns the generated id.
    fn insert_event(&self, event: NewDetectionEvent) -> Result<i64, StoreError>;

    /// Distinct fingerprint hashes with at least one event.
    fn unique_visitors(&self) -> Result<u64, StoreError>;

    /// extension_id → distinct fingerprint hashes.
    fn extension_counts(&self) -> Result<BTreeMap<String, u64>, StoreError>;

    fn events_for(&self, fingerprint_hash: &str) -> Result<Vec<ExtensionDetectionEvent>, StoreError>;

    /// Remove every event for the hash; returns rows removed.
    fn delete_by_fingerprint(&self, fingerprint_hash: &str) -> Result<u64, StoreError>;
}

pub trait FeatureStore: Send + Sync {
    fn get_feature(&self, name: &str) -> Result<Option<FeatureSettings>, StoreError>;

    /// Create or update the row for `name`.
    fn upsert_feature(
        &self,
        name: &str,
        enabled: bool,
        modified_by: &str,
        disabled_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<FeatureSettings, StoreError>;

    fn list_features(&self) -> Result<Vec<FeatureSettings>, StoreError>;
}
