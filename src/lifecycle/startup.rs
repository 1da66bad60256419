//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the credential store and start its watcher
//! - Build the gateway from the resolved configuration
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, so traffic only arrives once everything is ready
//! - A watcher that cannot start only disables hot reload

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::auth::{CredentialError, CredentialWatcher, HtpasswdStore};
use crate::config::EffectiveConfig;
use crate::http::{GatewayServer, ServerError};
use crate::lifecycle::shutdown::Shutdown;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Run the gateway for `config` until `shutdown` is triggered.
pub async fn run(config: EffectiveConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let store = Arc::new(HtpasswdStore::open(config.credential_file())?);
    if store.is_empty() {
        tracing::warn!(
            path = %store.path().display(),
            "Credential file has no users, every request will be rejected"
        );
    }

    let _watcher = match CredentialWatcher::new(store.clone()).run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Credential hot reload disabled");
            None
        }
    };

    let bind_address = config.bind_address();
    let server = GatewayServer::new(config, store)?;

    let listener = TcpListener::bind(bind_address.as_str())
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;

    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}
