// lookout/src/features.rs
//
// Feature toggles: named boolean switches, persisted and admin-controlled.
//
// The toggle store is injected wherever a gate is needed; there is no global
// toggle state. `is_enabled` sits on the ingest hot path and is a single
// point lookup. A feature that was never configured is off.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::events::FeatureSettings;
use crate::store::{FeatureStore, StoreError};

#[derive(Clone)]
pub struct FeatureToggles {
    store: Arc<dyn FeatureStore>,
}

impl FeatureToggles {
    pub fn new(store: Arc<dyn FeatureStore>) -> Self {
        Self { store }
    }

    /// Store failures read as disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        match self.store.get_feature(name) {
            Ok(settings) => settings.map(|s| s.is_enabled).unwrap_or(false),
            Err(e) => {
                warn!(feature = name, error = %e, "feature lookup failed, treating as disabled");
                false
            }
        }
    }

    pub fn get_settings(&self, name: &str) -> Result<Option<FeatureSettings>, StoreError> {
        self.store.get_feature(name)
    }

    /// Upsert. The reason is kept only when the feature is being disabled.
    pub fn set_enabled(
        &self,
        name: &str,
        enabled: bool,
        modified_by: &str,
        reason: Option<&str>,
    ) -> Result<FeatureSettings, StoreError> {
        let reason = if enabled { None } else { reason.filter(|r| !r.trim().is_empty()) };
        let settings = self.store.upsert_feature(name, enabled, modified_by, reason, Utc::now())?;
        info!(
            feature = name,
            enabled,
            by = modified_by,
            reason = reason.unwrap_or(""),
            "feature toggled"
        );
        Ok(settings)
    }

    pub fn list(&self) -> Result<Vec<FeatureSettings>, StoreError> {
        self.store.list_features()
    }

    /// Writes `enabled` only when `name` has never been configured, so a
    /// stored admin decision survives restarts. Returns whether it wrote.
    pub fn seed(&self, name: &str, enabled: bool, modified_by: &str) -> Result<bool, StoreError> {
        if let Some(existing) = self.store.get_feature(name)? {
            info!(
                feature = name,
                enabled = existing.is_enabled,
                by = %existing.last_modified_by,
                "feature already configured, keeping stored state"
            );
            return Ok(false);
        }
        self.set_enabled(name, enabled, modified_by, None)?;
        Ok(true)
    }
}
