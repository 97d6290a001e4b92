//! Cache configuration.
//!
//! Mirrors the `[cache]` section of `manifestd.toml`.

use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 3600;
const DEFAULT_MAX_ENTRY_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Runtime cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Use the in-process backend; when false every lookup is a miss.
    pub enabled: bool,
    /// Lifetime given to entries written on a miss.
    pub default_ttl: Duration,
    /// Documents serializing larger than this are served but never cached.
    pub max_entry_bytes: usize,
    /// Upper bound for a single backend round-trip.
    pub operation_timeout: Duration,
    /// Cadence of the expired-entry sweep.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            default_ttl: settings.default_ttl,
            max_entry_bytes: settings.max_entry_bytes.get(),
            operation_timeout: settings.operation_timeout,
            sweep_interval: settings.sweep_interval,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl_seconds(&self) -> u64 {
        self.default_ttl.as_secs()
    }
}
