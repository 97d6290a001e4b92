//! Response bodies exchanged between manifestd and its clients.
//!
//! Field names follow the camelCase convention the embedded widgets already
//! consume, so every struct here renames its fields on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Full body returned by `GET /manifests/{type}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEnvelope {
    #[serde(rename = "type")]
    pub manifest_type: String,
    pub data: Value,
    pub meta: ManifestMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMeta {
    /// RFC 3339 retrieval timestamp.
    pub timestamp: String,
    pub cached: bool,
}

/// Body of `GET /manifests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestIndex {
    pub manifests: Vec<ManifestIndexEntry>,
    pub cache: CacheStatsBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestIndexEntry {
    #[serde(rename = "type")]
    pub manifest_type: String,
    pub endpoint: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsBody {
    pub backend: String,
    pub connected: bool,
    pub key_count: usize,
    pub default_ttl_seconds: u64,
}

/// Body of `GET /admin/cache`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInspectionBody {
    pub success: bool,
    pub cache: CacheStatsBody,
    pub items: Vec<CacheItemBody>,
    pub timestamp: String,
}

/// One row of the administrative listing; failed keys carry only `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheItemBody {
    Entry(CacheEntryBody),
    Failed(CacheItemFailure),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryBody {
    pub key: String,
    pub item_count: usize,
    pub size_bytes: u64,
    /// Remaining lifetime; `None` when the entry has no expiry.
    pub ttl_seconds: Option<u64>,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheItemFailure {
    pub key: String,
    pub error: String,
}

/// Body of an authorized cache clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearBody {
    pub message: String,
    pub cleared_count: usize,
    /// Keys that are still cached because their delete failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<CacheItemFailure>,
    pub timestamp: String,
}

/// Structured error payload shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}
