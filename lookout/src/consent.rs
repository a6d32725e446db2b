// lookout/src/consent.rs
//
// Consent gate: the visitor's tracking decision, persisted client-side.
//
// One key in client-local storage holds the decision:
//   absent   → Undecided (no banner answer yet)
//   "false"  → Declined
//   "true"   → Accepted
//
// Nothing is collected, probed or sent unless the state is Accepted. The
// gate itself does not call the detector; `TrackingPipeline` sequences the
// check before any collection happens.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const CONSENT_KEY: &str = "extension-tracking-consent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentState {
    Undecided,
    Declined,
    Accepted,
}

impl ConsentState {
    fn from_stored(value: Option<&str>) -> Self {
        match value {
            None          => Self::Undecided,
            Some("true")  => Self::Accepted,
            Some("false") => Self::Declined,
            Some(other) => {
                warn!(value = other, "unrecognised consent value, treating as undecided");
                Self::Undecided
            }
        }
    }
}

// ── Storage ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage contents unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Client-local key/value storage (localStorage in a browser).
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON object on disk; a missing file is an empty store.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(HashMap::new()),
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling temp file, then rename over the old one. Readers
    /// see either the previous map or the new one, never a partial file.
    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(entries)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _g = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

// ── Gate ──────────────────────────────────────────────────────────────────────

pub struct ConsentGate<S: KeyValueStorage> {
    storage: S,
}

impl<S: KeyValueStorage> ConsentGate<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Unreadable storage reads as Undecided so the visitor is asked again.
    pub fn state(&self) -> ConsentState {
        match self.storage.get(CONSENT_KEY) {
            Ok(v)  => ConsentState::from_stored(v.as_deref()),
            Err(e) => {
                warn!(error = %e, "consent storage unreadable");
                ConsentState::Undecided
            }
        }
    }

    pub fn has_decision_been_made(&self) -> bool {
        self.state() != ConsentState::Undecided
    }

    pub fn has_consented(&self) -> bool {
        self.state() == ConsentState::Accepted
    }

    pub fn record_decision(&self, consented: bool) -> Result<(), StorageError> {
        self.storage.set(CONSENT_KEY, if consented { "true" } else { "false" })
    }

    /// Forget the decision; the visitor is asked again next visit.
    pub fn reset(&self) -> Result<(), StorageError> {
        self.storage.remove(CONSENT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_storage_is_undecided() {
        let gate = ConsentGate::new(MemoryStorage::new());
        assert_eq!(gate.state(), ConsentState::Undecided);
        assert!(!gate.has_decision_been_made());
        assert!(!gate.has_consented());
    }

    #[test]
    fn accepting_records_decision_and_consent() {
        let gate = ConsentGate::new(MemoryStorage::new());
        gate.record_decision(true).unwrap();
        assert!(gate.has_decision_been_made());
        assert!(gate.has_consented());
        assert_eq!(gate.state(), ConsentState::Accepted);
    }

    #[test]
    fn declining_is_a_decision_without_consent() {
        let gate = ConsentGate::new(MemoryStorage::new());
        gate.record_decision(false).unwrap();
        assert!(gate.has_decision_been_made());
        assert!(!gate.has_consented());
    }

    #[test]
    fn reset_returns_to_undecided() {
        let gate = ConsentGate::new(MemoryStorage::new());
        gate.record_decision(true).unwrap();
        gate.reset().unwrap();
        assert_eq!(gate.state(), ConsentState::Undecided);
    }

    #[test]
    fn garbage_value_reads_as_undecided() {
        let storage = MemoryStorage::new();
        storage.set(CONSENT_KEY, "maybe").unwrap();
        let gate = ConsentGate::new(storage);
        assert_eq!(gate.state(), ConsentState::Undecided);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("storage.json");

        ConsentGate::new(FileStorage::new(&path)).record_decision(true).unwrap();
        let reopened = ConsentGate::new(FileStorage::new(&path));
        assert!(reopened.has_consented());
    }

    #[test]
    fn file_storage_replaces_whole_file() {
        let dir     = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage.json"));
        storage.set("theme", "dark").unwrap();

        let gate = ConsentGate::new(storage);
        gate.record_decision(false).unwrap();
        gate.record_decision(true).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("storage.json")]);

        let reopened = FileStorage::new(dir.path().join("storage.json"));
        let raw = std::fs::read_to_string(reopened.path()).unwrap();
        let map: HashMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(map.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(map.get(CONSENT_KEY).map(String::as_str), Some("true"));
    }

    #[test]
    fn corrupt_file_reads_as_undecided() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();
        let gate = ConsentGate::new(FileStorage::new(&path));
        assert_eq!(gate.state(), ConsentState::Undecided);
    }
}
