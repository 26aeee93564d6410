//! Structured logging initializers (§10.2).
//!
//! Every orchestration boundary in the runtime (Context tick start/end, Scheduler dispatch,
//! Exchange mediator subscribe/unsubscribe/disconnect, Storage transaction commit/rollback,
//! worker-thread start/stop) emits a `tracing` event at `debug` or `trace`; faults are logged
//! at `warn` or `error` with the strategy/order/account id attached as structured fields,
//! never interpolated into the message string.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes human-readable logging for interactive use. `RUST_LOG` overrides the default
/// `INFO` directive.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init()
}

/// Initializes JSON logging for production log shipping, flattening the event fields into
/// the top-level JSON object.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}
