//! Facts derived from an opaque manifest document.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Collection fields probed, in priority order, when counting items.
pub const ITEM_COLLECTION_FIELDS: [&str; 8] = [
    "items", "events", "concerts", "assets", "images", "photos", "media", "entries",
];

/// Serialization used for fingerprinting and size accounting.
///
/// `serde_json` keeps object keys in a sorted map, so identical content always
/// produces identical bytes.
pub fn canonical_bytes(document: &Value) -> Vec<u8> {
    document.to_string().into_bytes()
}

/// Length of the first array-valued collection field, or zero.
pub fn item_count(document: &Value) -> usize {
    ITEM_COLLECTION_FIELDS
        .iter()
        .find_map(|field| document.get(field).and_then(Value::as_array))
        .map_or(0, Vec::len)
}

/// Quoted content digest sent as the `ETag` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(document: &Value) -> Self {
        let digest = Sha256::digest(canonical_bytes(document));
        Self(format!("\"{}\"", hex::encode(digest.as_slice())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact byte comparison; weak validators are not distinguished.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}
