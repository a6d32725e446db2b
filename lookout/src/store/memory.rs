// lookout/src/store/memory.rs
//
// Process-local store. DashMap = sharded concurrent HashMap, safe across
// tokio tasks without a global mutex.
//
// Layout mirrors the SQL tables:
//   events:   id → event
//   fp_idx:   fingerprint_hash → event ids (erasure + per-visitor reads)
//   features: feature_name → settings (unique by key)

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{EventStore, FeatureStore, StoreError};
use crate::events::{ExtensionDetectionEvent, FeatureSettings, NewDetectionEvent};

pub struct MemoryStore {
    events:       DashMap<i64, ExtensionDetectionEvent>,
    fp_idx:       DashMap<String, BTreeSet<i64>>,
    features:     DashMap<String, FeatureSettings>,
    next_event:   AtomicI64,
    next_feature: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            events:       DashMap::new(),
            fp_idx:       DashMap::new(),
            features:     DashMap::new(),
            next_event:   AtomicI64::new(1),
            next_feature: AtomicI64::new(1),
        }
    }

    pub fn n_events(&self) -> usize {
        self.events.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new() }
}

impl EventStore for MemoryStore {
    fn insert_event(&self, event: NewDetectionEvent) -> Result<i64, StoreError> {
        let id = self.next_event.fetch_add(1, Ordering::Relaxed);
        // Index guard held across both writes; erasure takes the same shard
        // lock, so it sees either neither write or both.
        let mut ids = self.fp_idx.entry(event.fingerprint_hash.clone()).or_default();
        self.events.insert(id, event.into_event(id));
        ids.insert(id);
        Ok(id)
    }

    fn unique_visitors(&self) -> Result<u64, StoreError> {
        let visitors: HashSet<String> = self.events.iter()
            .map(|e| e.fingerprint_hash.clone())
            .collect();
        Ok(visitors.len() as u64)
    }

    fn extension_counts(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        let mut visitors: BTreeMap<String, HashSet<String>> = BTreeMap::new();
        for e in self.events.iter() {
            visitors.entry(e.extension_id.clone())
                .or_default()
                .insert(e.fingerprint_hash.clone());
        }
        Ok(visitors.into_iter().map(|(ext, fps)| (ext, fps.len() as u64)).collect())
    }

    fn events_for(&self, fingerprint_hash: &str) -> Result<Vec<ExtensionDetectionEvent>, StoreError> {
        let ids: Vec<i64> = self.fp_idx.get(fingerprint_hash)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        Ok(ids.into_iter()
            .filter_map(|id| self.events.get(&id).map(|e| e.clone()))
            .collect())
    }

    fn delete_by_fingerprint(&self, fingerprint_hash: &str) -> Result<u64, StoreError> {
        let ids = match self.fp_idx.remove(fingerprint_hash) {
            Some((_, ids)) => ids,
            None           => return Ok(0),
        };
        let removed = ids.iter().filter(|id| self.events.remove(*id).is_some()).count();
        Ok(removed as u64)
    }
}

impl FeatureStore for MemoryStore {
    fn get_feature(&self, name: &str) -> Result<Option<FeatureSettings>, StoreError> {
        Ok(self.features.get(name).map(|f| f.clone()))
    }

    fn upsert_feature(
        &self,
        name: &str,
        enabled: bool,
        modified_by: &str,
        disabled_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<FeatureSettings, StoreError> {
        let mut entry = self.features.entry(name.to_string()).or_insert_with(|| FeatureSettings {
            id:               self.next_feature.fetch_add(1, Ordering::Relaxed),
            feature_name:     name.to_string(),
            is_enabled:       enabled,
            last_modified_at: at,
            last_modified_by: modified_by.to_string(),
            disabled_reason:  None,
        });
        entry.is_enabled       = enabled;
        entry.last_modified_at = at;
        entry.last_modified_by = modified_by.to_string();
        entry.disabled_reason  = disabled_reason.map(str::to_string);
        Ok(entry.clone())
    }

    fn list_features(&self) -> Result<Vec<FeatureSettings>, StoreError> {
        let mut all: Vec<FeatureSettings> = self.features.iter().map(|f| f.clone()).collect();
        all.sort_by(|a, b| a.feature_name.cmp(&b.feature_name));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[test]
    fn ids_are_generated() {
        contract::ids_are_generated(&MemoryStore::new());
    }

    #[test]
    fn aggregates_are_distinct_visitor_counts() {
        contract::aggregates_are_distinct_visitor_counts(&MemoryStore::new());
    }

    #[test]
    fn delete_is_scoped_and_idempotent() {
        let store = MemoryStore::new();
        contract::delete_is_scoped_and_idempotent(&store);
        assert_eq!(store.n_events(), 1);
    }

    #[test]
    fn features_upsert() {
        contract::features_upsert(&MemoryStore::new());
    }

    #[test]
    fn concurrent_inserts_get_distinct_ids() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8).map(|i| {
            let s = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    s.insert_event(contract::event(&format!("fp{}", i), "honey")).unwrap();
                }
            })
        }).collect();
        for h in handles { h.join().unwrap(); }

        assert_eq!(store.n_events(), 400);
        assert_eq!(store.unique_visitors().unwrap(), 8);
        assert_eq!(store.extension_counts().unwrap()["honey"], 8);
    }

    #[test]
    fn erasure_racing_inserts_leaves_nothing_behind() {
        for _ in 0..10 {
            let store = std::sync::Arc::new(MemoryStore::new());
            let writers: Vec<_> = (0..4).map(|_| {
                let s = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..5_000 {
                        s.insert_event(contract::event("fp", "honey")).unwrap();
                    }
                })
            }).collect();
            let eraser = {
                let s = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        s.delete_by_fingerprint("fp").unwrap();
                    }
                })
            };
            for w in writers { w.join().unwrap(); }
            eraser.join().unwrap();

            store.delete_by_fingerprint("fp").unwrap();
            assert_eq!(store.n_events(), 0);
            assert_eq!(store.unique_visitors().unwrap(), 0);
            assert!(store.events_for("fp").unwrap().is_empty());
        }
    }
}
