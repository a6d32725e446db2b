// lookout/src/lib.rs
//
// Lookout: browser fingerprint hashing, harmful-extension detection and
// consent-gated tracking with GDPR erasure.
//
//   browser side   browser → detector → consent → client
//   server side    api → tracking → features → store

pub mod api;
pub mod browser;
pub mod catalog;
pub mod client;
pub mod config;
pub mod consent;
pub mod detector;
pub mod events;
pub mod features;
pub mod fingerprint;
pub mod store;
pub mod tracking;
