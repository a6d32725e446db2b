// lookout/src/store/sqlite.rs
//
// SQLite backend. One connection behind a mutex; SQLite serializes writers
// itself, so the mutex only guards the rusqlite handle.
//
// Schema (versioned, applied in order on open):
//   v1  extension_detection_events: autoincrement id, non-unique indexes on
//       fingerprint_hash, extension_id, detected_at
//       feature_settings: autoincrement id, UNIQUE feature_name

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{EventStore, FeatureStore, StoreError};
use crate::events::{ExtensionDetectionEvent, FeatureSettings, NewDetectionEvent};

const SCHEMA_VERSION: i64 = 1;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened sqlite store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        migrate(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

// ── Migrations ────────────────────────────────────────────────────────────────

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    if version < 1 {
        info!("applying store migration 001: events + feature settings");
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS extension_detection_events (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                fingerprint_hash TEXT NOT NULL,
                extension_id     TEXT NOT NULL,
                extension_name   TEXT NOT NULL,
                detected_at      TEXT NOT NULL,
                user_agent       TEXT NOT NULL,
                ip_address_hash  TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_fingerprint_hash
                ON extension_detection_events(fingerprint_hash);
            CREATE INDEX IF NOT EXISTS idx_events_extension_id
                ON extension_detection_events(extension_id);
            CREATE INDEX IF NOT EXISTS idx_events_detected_at
                ON extension_detection_events(detected_at);

            CREATE TABLE IF NOT EXISTS feature_settings (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                feature_name     TEXT NOT NULL UNIQUE,
                is_enabled       INTEGER NOT NULL DEFAULT 0,
                last_modified_at TEXT NOT NULL,
                last_modified_by TEXT NOT NULL,
                disabled_reason  TEXT
            );",
        )?;
        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![SCHEMA_VERSION, Utc::now()],
        )?;
    }
    Ok(())
}

// ── Row mapping ───────────────────────────────────────────────────────────────

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ExtensionDetectionEvent> {
    Ok(ExtensionDetectionEvent {
        id:               row.get(0)?,
        fingerprint_hash: row.get(1)?,
        extension_id:     row.get(2)?,
        extension_name:   row.get(3)?,
        detected_at:      row.get(4)?,
        user_agent:       row.get(5)?,
        ip_address_hash:  row.get(6)?,
    })
}

fn feature_from_row(row: &Row<'_>) -> rusqlite::Result<FeatureSettings> {
    Ok(FeatureSettings {
        id:               row.get(0)?,
        feature_name:     row.get(1)?,
        is_enabled:       row.get(2)?,
        last_modified_at: row.get(3)?,
        last_modified_by: row.get(4)?,
        disabled_reason:  row.get(5)?,
    })
}

const FEATURE_COLUMNS: &str =
    "id, feature_name, is_enabled, last_modified_at, last_modified_by, disabled_reason";

fn select_feature(conn: &Connection, name: &str) -> rusqlite::Result<Option<FeatureSettings>> {
    conn.query_row(
        &format!("SELECT {} FROM feature_settings WHERE feature_name = ?1", FEATURE_COLUMNS),
        [name],
        feature_from_row,
    )
    .optional()
}

// ── Trait impls ───────────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
    fn insert_event(&self, event: NewDetectionEvent) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO extension_detection_events (
                fingerprint_hash, extension_id, extension_name,
                detected_at, user_agent, ip_address_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.fingerprint_hash,
                event.extension_id,
                event.extension_name,
                event.detected_at,
                event.user_agent,
                event.ip_address_hash,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn unique_visitors(&self) -> Result<u64, StoreError> {
        let n: i64 = self.conn.lock().query_row(
            "SELECT COUNT(DISTINCT fingerprint_hash) FROM extension_detection_events",
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    fn extension_counts(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT extension_id, COUNT(DISTINCT fingerprint_hash)
             FROM extension_detection_events
             GROUP BY extension_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (ext, n) = row?;
            counts.insert(ext, n as u64);
        }
        Ok(counts)
    }

    fn events_for(&self, fingerprint_hash: &str) -> Result<Vec<ExtensionDetectionEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, fingerprint_hash, extension_id, extension_name,
                    detected_at, user_agent, ip_address_hash
             FROM extension_detection_events
             WHERE fingerprint_hash = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map([fingerprint_hash], event_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn delete_by_fingerprint(&self, fingerprint_hash: &str) -> Result<u64, StoreError> {
        let n = self.conn.lock().execute(
            "DELETE FROM extension_detection_events WHERE fingerprint_hash = ?1",
            [fingerprint_hash],
        )?;
        Ok(n as u64)
    }
}

impl FeatureStore for SqliteStore {
    fn get_feature(&self, name: &str) -> Result<Option<FeatureSettings>, StoreError> {
        Ok(select_feature(&self.conn.lock(), name)?)
    }

    fn upsert_feature(
        &self,
        name: &str,
        enabled: bool,
        modified_by: &str,
        disabled_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<FeatureSettings, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO feature_settings (
                feature_name, is_enabled, last_modified_at, last_modified_by, disabled_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(feature_name) DO UPDATE SET
                is_enabled       = excluded.is_enabled,
                last_modified_at = excluded.last_modified_at,
                last_modified_by = excluded.last_modified_by,
                disabled_reason  = excluded.disabled_reason",
            params![name, enabled, at, modified_by, disabled_reason],
        )?;
        select_feature(&conn, name)?
            .ok_or_else(|| StoreError::Unavailable(format!("feature {} vanished after upsert", name)))
    }

    fn list_features(&self) -> Result<Vec<FeatureSettings>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feature_settings ORDER BY feature_name",
            FEATURE_COLUMNS
        ))?;
        let rows = stmt.query_map([], feature_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
