// lookout/src/detector.rs
//
// Extension detector: probes the browser for every catalog entry.
//
// Per entry, signals are tried in priority order and the first positive one
// wins:
//   1. DOM selector probe: any configured selector matches
//   2. Resource probe: a fetch of an extension-scheme URL for the
//      runtime's browser family does not fail
//
// The resource probe is a heuristic: engines differ in whether a missing
// extension resource errors or silently succeeds, so false positives and
// negatives are expected.
//
// Entries are probed concurrently. A probe that errors for any reason other
// than "resource unreachable" marks that entry Failed (logged, treated as not
// detected); other entries are unaffected.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::debug;

use crate::browser::{BrowserEnvironment, BrowserFamily, ProbeError};
use crate::catalog::{self, KnownExtension};
use crate::events::DetectedExtension;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "probe")]
pub enum Signal {
    Selector(String),
    Resource(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Detected(Signal),
    NotDetected,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub extension_id: &'static str,
    pub outcome:      ProbeOutcome,
}

pub struct ExtensionDetector {
    env:     Arc<dyn BrowserEnvironment>,
    catalog: &'static [KnownExtension],
}

impl ExtensionDetector {
    pub fn new(env: Arc<dyn BrowserEnvironment>) -> Self {
        Self { env, catalog: catalog::known_harmful_extensions() }
    }

    pub fn with_catalog(mut self, catalog: &'static [KnownExtension]) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn known_harmful_extensions(&self) -> &'static [KnownExtension] {
        self.catalog
    }

    /// Extensions with a positive signal, in catalog order, each at most once.
    pub async fn detect_extensions(&self) -> Vec<DetectedExtension> {
        let reports = self.probe_all().await;
        self.catalog.iter()
            .zip(reports)
            .filter(|(_, r)| matches!(r.outcome, ProbeOutcome::Detected(_)))
            .map(|(ext, _)| ext.to_detected())
            .collect()
    }

    /// Per-entry outcome for every catalog entry, in catalog order.
    pub async fn probe_all(&self) -> Vec<EntryReport> {
        let family = self.env.family();
        let probes = self.catalog.iter().map(|ext| self.probe_entry(ext, family));
        join_all(probes).await
    }

    async fn probe_entry(&self, ext: &'static KnownExtension, family: BrowserFamily) -> EntryReport {
        let outcome = match self.run_probes(ext, family).await {
            Ok(Some(signal)) => ProbeOutcome::Detected(signal),
            Ok(None)         => ProbeOutcome::NotDetected,
            Err(e) => {
                debug!(extension = ext.id, error = %e, "extension probe failed");
                ProbeOutcome::Failed(e.to_string())
            }
        };
        EntryReport { extension_id: ext.id, outcome }
    }

    async fn run_probes(
        &self,
        ext: &KnownExtension,
        family: BrowserFamily,
    ) -> Result<Option<Signal>, ProbeError> {
        for selector in ext.selectors {
            if self.env.query_selector(selector)? {
                return Ok(Some(Signal::Selector(selector.to_string())));
            }
        }

        for probe in ext.resources_for(family) {
            match self.env.probe_resource(probe.url).await {
                Ok(())                          => return Ok(Some(Signal::Resource(probe.url.to_string()))),
                Err(ProbeError::Unreachable(_)) => continue,
                Err(e)                          => return Err(e),
            }
        }

        Ok(None)
    }
}
