// lookout/src/tracking.rs
//
// Server-side tracking: ingest, statistics, erasure.
//
// Ingest is fire-and-forget from the visitor's side:
//   1. ExtensionTracking toggle off      → no-op
//   2. no extensions (or no fingerprint) → no-op
//   3. caller IP hashed with the fingerprint digest
//   4. one independent insert per extension; a failed insert is logged and
//      counted, earlier inserts stay
//
// Statistics and erasure are admin/visitor-facing and propagate store
// errors to the caller.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::events::{
    DeleteDataResponse, DetectedExtension, NewDetectionEvent, TrackingStatistics,
    EXTENSION_TRACKING,
};
use crate::features::FeatureToggles;
use crate::fingerprint::hash_ip;
use crate::store::{EventStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOutcome {
    Disabled,
    NoExtensions,
    NoFingerprint,
    Recorded { inserted: usize, failed: usize },
}

#[derive(Clone)]
pub struct TrackingService {
    events:  Arc<dyn EventStore>,
    toggles: FeatureToggles,
}

impl TrackingService {
    pub fn new(events: Arc<dyn EventStore>, toggles: FeatureToggles) -> Self {
        Self { events, toggles }
    }

    pub fn toggles(&self) -> &FeatureToggles {
        &self.toggles
    }

    pub fn track(
        &self,
        fingerprint_hash: &str,
        extensions: &[DetectedExtension],
        user_agent: &str,
        client_ip: &str,
    ) -> TrackOutcome {
        if !self.toggles.is_enabled(EXTENSION_TRACKING) {
            debug!("extension tracking disabled, dropping report");
            return TrackOutcome::Disabled;
        }
        if extensions.is_empty() {
            return TrackOutcome::NoExtensions;
        }
        let fingerprint_hash = fingerprint_hash.trim();
        if fingerprint_hash.is_empty() {
            debug!("tracking report without fingerprint, dropping");
            return TrackOutcome::NoFingerprint;
        }

        let ip_address_hash = hash_ip(client_ip);
        let detected_at     = Utc::now();
        let mut seen        = HashSet::new();
        let (mut inserted, mut failed) = (0usize, 0usize);

        for ext in extensions.iter().filter(|e| seen.insert(e.id.as_str())) {
            let event = NewDetectionEvent {
                fingerprint_hash: fingerprint_hash.to_string(),
                extension_id:     ext.id.clone(),
                extension_name:   ext.name.clone(),
                detected_at,
                user_agent:       user_agent.to_string(),
                ip_address_hash:  ip_address_hash.clone(),
            };
            match self.events.insert_event(event) {
                Ok(_)  => inserted += 1,
                Err(e) => {
                    failed += 1;
                    warn!(extension = %ext.id, error = %e, "failed to store detection event");
                }
            }
        }

        let short: String = fingerprint_hash.chars().take(12).collect();
        info!(
            fingerprint = %short,
            inserted,
            failed,
            "extension detections recorded"
        );
        TrackOutcome::Recorded { inserted, failed }
    }

    pub fn total_unique_visitors_with_extensions(&self) -> Result<u64, StoreError> {
        self.events.unique_visitors()
    }

    pub fn extension_counts(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        self.events.extension_counts()
    }

    pub fn statistics(&self) -> Result<TrackingStatistics, StoreError> {
        Ok(TrackingStatistics {
            total_unique_visitors: self.total_unique_visitors_with_extensions()?,
            extension_counts:      self.extension_counts()?,
        })
    }

    /// Erasure request. Deleting nothing is a success.
    pub fn delete_all_data(&self, fingerprint_hash: &str) -> Result<DeleteDataResponse, StoreError> {
        let deleted = self.events.delete_by_fingerprint(fingerprint_hash)?;
        info!(deleted, "erasure request processed");
        let message = if deleted == 0 {
            "No tracking data was stored for this browser.".to_string()
        } else {
            format!("Deleted {} tracking record(s) for this browser.", deleted)
        };
        Ok(DeleteDataResponse { deleted_records: deleted, message })
    }
}
