use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::constants::SERVICE_NAME;

/// Installs the global subscriber.
///
/// `filter` follows `EnvFilter` directive syntax; `RUST_LOG`, when set, takes precedence.
/// `json` swaps the human-readable formatter for newline-delimited JSON.
pub fn init_subscriber(filter: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let pretty = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
    });

    let structured = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(structured)
        .init();

    tracing::debug!(
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        json,
        "subscriber registered"
    );
}
