//! Logical manifest identifiers and their durable locations.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Namespace shared by every manifest entry in the cache backend.
pub const MANIFEST_KEY_PREFIX: &str = "manifest:";

/// A catalog the service knows how to serve.
///
/// Each variant maps to exactly one relative path under the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestType {
    Concert,
    Events,
    Universal,
}

impl ManifestType {
    pub const ALL: [ManifestType; 3] = [
        ManifestType::Concert,
        ManifestType::Events,
        ManifestType::Universal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ManifestType::Concert => "concert",
            ManifestType::Events => "events",
            ManifestType::Universal => "universal",
        }
    }

    /// Path of the producer-written document, relative to the storage root.
    pub fn relative_path(self) -> &'static str {
        match self {
            ManifestType::Concert => "concert/manifest.json",
            ManifestType::Events => "events/manifest.json",
            ManifestType::Universal => "universal/manifest.json",
        }
    }

    pub fn cache_key(self) -> String {
        format!("{MANIFEST_KEY_PREFIX}{}", self.as_str())
    }

    pub fn endpoint(self) -> String {
        format!("/manifests/{}", self.as_str())
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|ty| ty.as_str().to_string()).collect()
    }
}

impl FromStr for ManifestType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == value)
            .ok_or_else(|| DomainError::unknown_manifest_type(value))
    }
}

impl fmt::Display for ManifestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
