//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Emit the per-request access log line
//!
//! # Design Decisions
//! - Log level comes from `RUST_LOG`, with a crate-scoped default

use axum::http::{Method, Uri};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::http::ClientAddress;

const DEFAULT_FILTER: &str = "watchman_proxy=info,watchman=info,tower_http=info";

/// Install the global subscriber. Call once, before anything logs.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Access log entry for an authenticated request.
pub fn access(user: &str, client: &ClientAddress, method: &Method, uri: &Uri) {
    tracing::info!(
        user = %user,
        client = %client.address,
        source = %client.source,
        method = %method,
        url = %uri,
        "request from client '{}@{}'",
        user,
        client.address
    );
}
