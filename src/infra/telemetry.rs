use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "manifestd_cache_hit_total",
            Unit::Count,
            "Manifest resolutions answered from the cache."
        );
        describe_counter!(
            "manifestd_cache_miss_total",
            Unit::Count,
            "Manifest resolutions that fell through to durable storage."
        );
        describe_counter!(
            "manifestd_cache_error_total",
            Unit::Count,
            "Cache backend faults absorbed by the resolver, labelled by operation."
        );
        describe_counter!(
            "manifestd_cache_skip_oversize_total",
            Unit::Count,
            "Manifests served uncached because they exceed the entry size limit."
        );
        describe_counter!(
            "manifestd_not_modified_total",
            Unit::Count,
            "Conditional requests answered with 304 Not Modified."
        );
        describe_histogram!(
            "manifestd_storage_read_ms",
            Unit::Milliseconds,
            "Durable manifest read latency in milliseconds."
        );
    });
}
