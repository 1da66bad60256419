//! Watchman library: an HTTP reverse proxy that admits only requests with
//! valid Basic credentials and forwards them to a single upstream.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use auth::{CredentialStore, HtpasswdStore};
pub use config::{ConfigResolver, EffectiveConfig};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
