//! Manifest cache subsystem.
//!
//! - [`CacheBackend`]: the key/value contract (get/set/delete, prefix scan,
//!   TTL and memory introspection).
//! - [`MemoryBackend`]: the in-process backend with lazy expiry.
//! - [`ManifestCache`]: typed, timeout-bounded access used by the resolver and
//!   the administration service.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! default_ttl_seconds = 3600
//! max_entry_bytes = 5242880
//! operation_timeout_ms = 250
//! sweep_interval_seconds = 60
//! ```

mod backend;
mod config;
mod memory;
mod store;

pub use backend::{CacheBackend, CacheError, DisabledBackend};
pub use config::CacheConfig;
pub use memory::MemoryBackend;
pub use store::{ManifestCache, StoreOutcome};
