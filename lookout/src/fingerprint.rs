// lookout/src/fingerprint.rs
//
// Fingerprint digest: the pseudo-identifier for a visitor.
//
// The eight collected fields are joined in a fixed order with `|`, hashed
// with SHA-256 and rendered as lowercase hex. No salt, no randomness: the
// same tuple always maps to the same 64-char digest. Empty fields stay empty
// components rather than failing.
//
// Caller IP addresses go through the same digest so that raw addresses are
// never stored.

use sha2::{Digest, Sha256};

use crate::events::BrowserFingerprint;

const DELIMITER: &str = "|";

pub fn compute_hash(fp: &BrowserFingerprint) -> String {
    let color_depth = fp.color_depth.to_string();
    let cores       = fp.hardware_concurrency.to_string();
    let canonical = [
        fp.canvas_hash.as_str(),
        fp.webgl_renderer.as_str(),
        fp.screen_resolution.as_str(),
        color_depth.as_str(),
        fp.timezone.as_str(),
        fp.language.as_str(),
        fp.platform.as_str(),
        cores.as_str(),
    ]
    .join(DELIMITER);
    sha256_hex(canonical.as_bytes())
}

pub fn hash_ip(ip: &str) -> String {
    sha256_hex(ip.as_bytes())
}

fn sha256_hex(data: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(data);
    hex::encode(h.finalize())
}
