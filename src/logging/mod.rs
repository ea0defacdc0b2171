use std::sync::Once;

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::DEFAULT_LOG_FILTER;

static INIT: Once = Once::new();

/// Installs the global subscriber with the default `info` filter.
pub fn init_logging() {
    init_logging_with(DEFAULT_LOG_FILTER);
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Only the first call has an effect; later calls, or a subscriber installed
/// by someone else, are tolerated.
pub fn init_logging_with(default_filter: &str) {
    INIT.call_once(|| {
        let filter: EnvFilter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        let formatting_layer = fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_target(true)
            .compact();

        let subscriber = Registry::default().with(filter).with(formatting_layer);

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!("global subscriber already installed");
        }
    });
}
