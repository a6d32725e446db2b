// lookout/src/events.rs
//
// Shared domain types flowing between the browser-side pipeline, the HTTP
// API and the stores.
//
// Wire shapes use camelCase field names to match what browser clients send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feature toggle that gates tracking ingestion.
pub const EXTENSION_TRACKING: &str = "ExtensionTracking";

// ── Browser fingerprint ───────────────────────────────────────────────────────

/// Device/browser signals gathered once per visit. Immutable once collected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserFingerprint {
    pub canvas_hash:          String,
    pub webgl_renderer:       String,
    pub screen_resolution:    String,
    pub color_depth:          i32,
    pub timezone:             String,
    pub language:             String,
    pub platform:             String,
    pub hardware_concurrency: i32,
}

impl BrowserFingerprint {
    /// Stable digest over the eight fields. See [`crate::fingerprint::compute_hash`].
    pub fn hash(&self) -> String {
        crate::fingerprint::compute_hash(self)
    }
}

// ── Extensions ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedExtension {
    pub id:              String,
    pub name:            String,
    #[serde(default)]
    pub is_harmful:      bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_message: Option<String>,
}

/// One stored observation of an extension for a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDetectionEvent {
    pub id:               i64,
    pub fingerprint_hash: String,
    pub extension_id:     String,
    pub extension_name:   String,
    pub detected_at:      DateTime<Utc>,
    pub user_agent:       String,
    pub ip_address_hash:  String,
}

/// An event before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDetectionEvent {
    pub fingerprint_hash: String,
    pub extension_id:     String,
    pub extension_name:   String,
    pub detected_at:      DateTime<Utc>,
    pub user_agent:       String,
    pub ip_address_hash:  String,
}

impl NewDetectionEvent {
    pub fn into_event(self, id: i64) -> ExtensionDetectionEvent {
        ExtensionDetectionEvent {
            id,
            fingerprint_hash: self.fingerprint_hash,
            extension_id:     self.extension_id,
            extension_name:   self.extension_name,
            detected_at:      self.detected_at,
            user_agent:       self.user_agent,
            ip_address_hash:  self.ip_address_hash,
        }
    }
}

// ── Feature settings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSettings {
    pub id:               i64,
    pub feature_name:     String,
    pub is_enabled:       bool,
    pub last_modified_at: DateTime<Utc>,
    pub last_modified_by: String,
    pub disabled_reason:  Option<String>,
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackRequest {
    pub fingerprint_hash: String,
    pub extensions:       Vec<DetectedExtension>,
    pub user_agent:       String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteDataRequest {
    pub fingerprint_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDataResponse {
    pub deleted_records: u64,
    pub message:         String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStatistics {
    pub total_unique_visitors: u64,
    pub extension_counts:      BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeatureRequest {
    pub is_enabled: bool,
    #[serde(default)]
    pub reason:     Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEnabledResponse {
    pub is_enabled: bool,
}
