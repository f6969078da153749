use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const POST_STORE_HIT_TOTAL: &str = "buzzit_post_store_hit_total";
pub const POST_STORE_REFRESH_TOTAL: &str = "buzzit_post_store_refresh_total";
pub const POST_STORE_STALE_TOTAL: &str = "buzzit_post_store_stale_total";
pub const POST_STORE_FETCH_FAILURE_TOTAL: &str = "buzzit_post_store_fetch_failure_total";
pub const EDGE_REWRITE_TOTAL: &str = "buzzit_edge_rewrite_total";
pub const EDGE_PASSTHROUGH_TOTAL: &str = "buzzit_edge_passthrough_total";

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
            POST_STORE_HIT_TOTAL,
            Unit::Count,
            "Post collection reads served from a fresh cache."
        );
        describe_counter!(
            POST_STORE_REFRESH_TOTAL,
            Unit::Count,
            "Successful upstream fetches of the post collection."
        );
        describe_counter!(
            POST_STORE_STALE_TOTAL,
            Unit::Count,
            "Reads answered with a stale collection after a failed refresh."
        );
        describe_counter!(
            POST_STORE_FETCH_FAILURE_TOTAL,
            Unit::Count,
            "Failed upstream fetches of the post collection."
        );
        describe_counter!(
            EDGE_REWRITE_TOTAL,
            Unit::Count,
            "Documents served with injected route metadata."
        );
        describe_counter!(
            EDGE_PASSTHROUGH_TOTAL,
            Unit::Count,
            "Origin responses passed through unmodified."
        );
    });
}
