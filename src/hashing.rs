//! Integrity Digests for Feature Vectors
//!
//! Two schemes coexist. New templates carry a SHA-256 digest over the whole
//! vector, prefixed `sha256:`. Records written by earlier deployments carry a
//! bare 16-character digest computed from only the first ten elements; those
//! stay verifiable, and their blind spot beyond index 10 is a documented
//! limitation of that scheme, not of this engine.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Elements covered by the legacy scheme.
pub const LEGACY_SAMPLE_LEN: usize = 10;
/// Length the legacy base64 digest is truncated to.
pub const LEGACY_DIGEST_LEN: usize = 16;
/// Prefix marking a full-vector SHA-256 digest.
pub const SHA256_PREFIX: &str = "sha256:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestScheme {
    /// First ten elements, 6-decimal formatting, base64, truncated.
    Legacy,
    /// SHA-256 over the 6-decimal formatting of the entire vector.
    Sha256,
}

/// Compute SHA-256 hash of bytes, return hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Canonical text form shared by both schemes: each element rendered to six
/// decimal places, comma-joined.
fn canonical_elements(data: &[f64]) -> String {
    data.iter()
        .map(|v| format!("{v:.6}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn legacy_vector_digest(data: &[f64]) -> String {
    let sample = &data[..data.len().min(LEGACY_SAMPLE_LEN)];
    let canonical = canonical_elements(sample);
    let mut encoded = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        canonical.as_bytes(),
    );
    encoded.truncate(LEGACY_DIGEST_LEN);
    encoded
}

fn sha256_vector_digest(data: &[f64]) -> String {
    let canonical = canonical_elements(data);
    format!("{SHA256_PREFIX}{}", sha256_hex(canonical.as_bytes()))
}

/// Compute the integrity digest for a feature vector under `scheme`.
pub fn compute_vector_digest(scheme: DigestScheme, data: &[f64]) -> String {
    match scheme {
        DigestScheme::Legacy => legacy_vector_digest(data),
        DigestScheme::Sha256 => sha256_vector_digest(data),
    }
}

/// Scheme a stored digest declares itself under.
pub fn scheme_of(digest: &str) -> DigestScheme {
    if digest.starts_with(SHA256_PREFIX) {
        DigestScheme::Sha256
    } else {
        DigestScheme::Legacy
    }
}

/// Recompute under the stored digest's own scheme and compare.
pub fn verify_vector_digest(stored: &str, data: &[f64]) -> bool {
    compute_vector_digest(scheme_of(stored), data) == stored
}

// We need hex encoding
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"test data";
        let h1 = sha256_hex(data);
        let h2 = sha256_hex(data);
        assert_eq!(h1, h2);
    }

    #[test]
    fn legacy_digest_is_sixteen_chars() {
        let v: Vec<f64> = (0..128).map(|i| i as f64 / 128.0).collect();
        let digest = compute_vector_digest(DigestScheme::Legacy, &v);
        assert_eq!(digest.len(), LEGACY_DIGEST_LEN);
        assert!(!digest.starts_with(SHA256_PREFIX));
    }

    #[test]
    fn legacy_digest_ignores_tail_elements() {
        let mut v: Vec<f64> = (0..128).map(|i| i as f64 / 128.0).collect();
        let before = compute_vector_digest(DigestScheme::Legacy, &v);
        v[127] += 1.0;
        let after = compute_vector_digest(DigestScheme::Legacy, &v);
        assert_eq!(before, after);
    }

    #[test]
    fn legacy_digest_sees_leading_elements() {
        let mut v: Vec<f64> = (0..128).map(|i| i as f64 / 128.0).collect();
        let before = compute_vector_digest(DigestScheme::Legacy, &v);
        v[0] += 1.0;
        let after = compute_vector_digest(DigestScheme::Legacy, &v);
        assert_ne!(before, after);
    }

    #[test]
    fn sha256_digest_covers_whole_vector() {
        let mut v: Vec<f64> = (0..128).map(|i| i as f64 / 128.0).collect();
        let before = compute_vector_digest(DigestScheme::Sha256, &v);
        v[127] += 1.0;
        let after = compute_vector_digest(DigestScheme::Sha256, &v);
        assert_ne!(before, after);
    }

    #[test]
    fn verification_dispatches_on_prefix() {
        let v: Vec<f64> = (0..32).map(|i| i as f64).collect();

        let legacy = compute_vector_digest(DigestScheme::Legacy, &v);
        let modern = compute_vector_digest(DigestScheme::Sha256, &v);

        assert_eq!(scheme_of(&legacy), DigestScheme::Legacy);
        assert_eq!(scheme_of(&modern), DigestScheme::Sha256);
        assert!(verify_vector_digest(&legacy, &v));
        assert!(verify_vector_digest(&modern, &v));
        assert!(!verify_vector_digest(&modern, &v[..31]));
    }

    #[test]
    fn short_vector_digest_uses_available_elements() {
        let v = vec![0.5, 0.25];
        let digest = compute_vector_digest(DigestScheme::Legacy, &v);
        assert!(!digest.is_empty());
        assert!(verify_vector_digest(&digest, &v));
    }
}
