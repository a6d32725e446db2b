// lookout/src/client.rs
//
// Browser-side tracking: HTTP sender and the consent-gated pipeline.
//
//   consent? ──no──▶ NoConsent
//      │yes
//   collect fingerprint → hash → detect extensions
//      │none                         │some
//   NothingDetected           POST /track ──err──▶ SendFailed
//                                    │ok
//                                   Sent
//
// Nothing here panics or hands a transport error back to the page; the
// pipeline reports what happened and logs the rest.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::browser::BrowserEnvironment;
use crate::config::ClientConfig;
use crate::consent::{ConsentGate, KeyValueStorage};
use crate::detector::ExtensionDetector;
use crate::events::{
    DeleteDataRequest, DeleteDataResponse, DetectedExtension, FeatureEnabledResponse, TrackRequest,
};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(StatusCode),
    #[error("invalid base url {0}")]
    InvalidUrl(String),
}

// ── Sender ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TrackingClient {
    http: reqwest::Client,
    base: Url,
}

impl TrackingClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self, SendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        let base = Url::parse(&cfg.base_url)
            .map_err(|e| SendError::InvalidUrl(format!("{}: {}", cfg.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(SendError::InvalidUrl(cfg.base_url.clone()));
        }
        Ok(Self { http, base })
    }

    /// Appends percent-encoded path segments to the base url, keeping any
    /// path prefix it already has.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SendError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn track(&self, req: &TrackRequest) -> Result<(), SendError> {
        let resp = self.http
            .post(self.endpoint(&["api", "extensiontracking", "track"])?)
            .json(req)
            .send()
            .await?;
        check(resp.status())
    }

    pub async fn delete_my_data(&self, fingerprint_hash: &str) -> Result<DeleteDataResponse, SendError> {
        let resp = self.http
            .post(self.endpoint(&["api", "extensiontracking", "delete-my-data"])?)
            .json(&DeleteDataRequest { fingerprint_hash: fingerprint_hash.to_string() })
            .send()
            .await?;
        check(resp.status())?;
        Ok(resp.json().await?)
    }

    pub async fn feature_enabled(&self, name: &str) -> Result<bool, SendError> {
        let resp = self.http
            .get(self.endpoint(&["api", "admin", "features", name, "enabled"])?)
            .send()
            .await?;
        check(resp.status())?;
        let body: FeatureEnabledResponse = resp.json().await?;
        Ok(body.is_enabled)
    }
}

fn check(status: StatusCode) -> Result<(), SendError> {
    if status.is_success() { Ok(()) } else { Err(SendError::Status(status)) }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PipelineOutcome {
    NoConsent,
    NothingDetected,
    Sent { fingerprint_hash: String, extensions: Vec<DetectedExtension> },
    SendFailed { reason: String },
}

pub struct TrackingPipeline<S: KeyValueStorage> {
    consent:  ConsentGate<S>,
    env:      Arc<dyn BrowserEnvironment>,
    detector: ExtensionDetector,
    client:   TrackingClient,
}

impl<S: KeyValueStorage> TrackingPipeline<S> {
    pub fn new(consent: ConsentGate<S>, env: Arc<dyn BrowserEnvironment>, client: TrackingClient) -> Self {
        let detector = ExtensionDetector::new(env.clone());
        Self { consent, env, detector, client }
    }

    pub fn consent(&self) -> &ConsentGate<S> {
        &self.consent
    }

    /// Probes and sends only after an explicit accept.
    pub async fn run(&self) -> PipelineOutcome {
        if !self.consent.has_consented() {
            debug!(state = ?self.consent.state(), "no tracking consent, skipping detection");
            return PipelineOutcome::NoConsent;
        }

        let fingerprint_hash = self.env.collect_fingerprint().hash();
        let extensions       = self.detector.detect_extensions().await;
        if extensions.is_empty() {
            return PipelineOutcome::NothingDetected;
        }

        let req = TrackRequest {
            fingerprint_hash: fingerprint_hash.clone(),
            extensions:       extensions.clone(),
            user_agent:       self.env.user_agent(),
        };
        match self.client.track(&req).await {
            Ok(()) => PipelineOutcome::Sent { fingerprint_hash, extensions },
            Err(e) => {
                warn!(error = %e, "tracking report not delivered");
                PipelineOutcome::SendFailed { reason: e.to_string() }
            }
        }
    }

    /// Erasure for this browser's fingerprint.
    pub async fn forget_me(&self) -> Result<DeleteDataResponse, SendError> {
        let hash = self.env.collect_fingerprint().hash();
        self.client.delete_my_data(&hash).await
    }
}
