//! Hashing - SHA-256 Digests for Manifests and Snapshots
//!
//! The manifest digest tells the router whether the authoritative manifest
//! changed since the last load. The pack fingerprint identifies the accepted
//! content itself, independent of key order or whitespace in the source.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::model::StickerPack;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Digest of the raw manifest bytes as read from the source.
pub fn manifest_digest(bytes: &[u8]) -> String {
    sha256_hex(bytes)
}

/// Digest of the accepted packs, in display order.
pub fn pack_fingerprint(packs: &[StickerPack]) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(&packs)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
