// lookout/src/browser.rs
//
// The browser surface the client pipeline runs against.
//
// A host (WASM page, headless harness, test double) implements
// `BrowserEnvironment` to hand over collected signals and to answer DOM and
// extension-resource probes. `StaticEnvironment` is the in-process
// implementation used by the CLI and tests.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::BrowserFingerprint;

// ── Browser family ────────────────────────────────────────────────────────────

/// Coarse vendor guess used to pick which extension URL scheme to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserFamily {
    Chromium, // Chrome, Edge, Brave, Opera: chrome-extension://
    Firefox,  // moz-extension://
    Safari,   // safari-web-extension://
    Unknown,
}

impl BrowserFamily {
    /// Guess from `navigator.vendor` with the user agent as tie-breaker.
    pub fn guess(vendor: &str, user_agent: &str) -> Self {
        let vendor = vendor.to_lowercase();
        let ua     = user_agent.to_lowercase();
        if vendor.contains("google") || vendor.contains("opera") {
            return Self::Chromium;
        }
        if vendor.contains("apple") {
            return Self::Safari;
        }
        if ua.contains("firefox/") {
            return Self::Firefox;
        }
        if ua.contains("chrome/") || ua.contains("chromium/") || ua.contains("edg/") {
            return Self::Chromium;
        }
        Self::Unknown
    }

    pub fn extension_scheme(&self) -> Option<&'static str> {
        match self {
            Self::Chromium => Some("chrome-extension://"),
            Self::Firefox  => Some("moz-extension://"),
            Self::Safari   => Some("safari-web-extension://"),
            Self::Unknown  => None,
        }
    }
}

impl std::fmt::Display for BrowserFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chromium => write!(f, "chromium"),
            Self::Firefox  => write!(f, "firefox"),
            Self::Safari   => write!(f, "safari"),
            Self::Unknown  => write!(f, "unknown"),
        }
    }
}

// ── Host contract ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    #[error("resource unreachable: {0}")]
    Unreachable(String),
    #[error("host error: {0}")]
    Host(String),
}

#[async_trait]
pub trait BrowserEnvironment: Send + Sync {
    /// `navigator.vendor`
    fn vendor(&self) -> String;

    fn user_agent(&self) -> String;

    /// Gather the eight fingerprint signals.
    fn collect_fingerprint(&self) -> BrowserFingerprint;

    /// True when at least one element matches `selector`.
    fn query_selector(&self, selector: &str) -> Result<bool, ProbeError>;

    /// HEAD-like fetch of an extension-scheme URL. `Ok` means the request did
    /// not fail, which is all the detector looks at.
    async fn probe_resource(&self, url: &str) -> Result<(), ProbeError>;

    fn family(&self) -> BrowserFamily {
        BrowserFamily::guess(&self.vendor(), &self.user_agent())
    }
}

// ── Static environment ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pub vendor:      String,
    pub user_agent:  String,
    pub fingerprint: BrowserFingerprint,
    pub selectors:   HashSet<String>, // selectors that match
    pub resources:   HashSet<String>, // urls that load
    pub broken:      HashSet<String>, // selectors/urls whose probe errors
}

impl StaticEnvironment {
    pub fn new(vendor: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self { vendor: vendor.into(), user_agent: user_agent.into(), ..Default::default() }
    }

    pub fn with_fingerprint(mut self, fp: BrowserFingerprint) -> Self {
        self.fingerprint = fp;
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selectors.insert(selector.into());
        self
    }

    pub fn with_resource(mut self, url: impl Into<String>) -> Self {
        self.resources.insert(url.into());
        self
    }

    pub fn with_broken(mut self, probe: impl Into<String>) -> Self {
        self.broken.insert(probe.into());
        self
    }
}

#[async_trait]
impl BrowserEnvironment for StaticEnvironment {
    fn vendor(&self) -> String { self.vendor.clone() }

    fn user_agent(&self) -> String { self.user_agent.clone() }

    fn collect_fingerprint(&self) -> BrowserFingerprint { self.fingerprint.clone() }

    fn query_selector(&self, selector: &str) -> Result<bool, ProbeError> {
        if self.broken.contains(selector) {
            return Err(ProbeError::InvalidSelector(selector.to_string()));
        }
        Ok(self.selectors.contains(selector))
    }

    async fn probe_resource(&self, url: &str) -> Result<(), ProbeError> {
        if self.broken.contains(url) {
            return Err(ProbeError::Host(format!("probe aborted: {}", url)));
        }
        if self.resources.contains(url) {
            Ok(())
        } else {
            Err(ProbeError::Unreachable(url.to_string()))
        }
    }
}
