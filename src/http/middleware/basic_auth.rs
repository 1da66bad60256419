//! Basic authentication middleware.
//! Rejects every request that does not carry valid credentials.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{BasicAuthError, BasicCredentials, CredentialStore};

/// State required for authentication.
#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<dyn CredentialStore>,
    /// Prebuilt `WWW-Authenticate` value.
    pub challenge: HeaderValue,
}

/// Username attached to authenticated requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

pub async fn basic_auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let credentials = match BasicCredentials::from_headers(req.headers()) {
        Ok(c) => c,
        Err(BasicAuthError::MissingHeader) => {
            tracing::debug!(uri = %req.uri(), "No credentials supplied");
            return unauthorized(&state);
        }
        Err(e) => {
            tracing::debug!(uri = %req.uri(), error = %e, "Malformed Authorization header");
            return unauthorized(&state);
        }
    };

    // Digest checks (bcrypt in particular) are CPU-bound.
    let store = state.store.clone();
    let username = credentials.username.clone();
    let verified = tokio::task::spawn_blocking(move || {
        store.verify(&credentials.username, &credentials.password)
    })
    .await;

    match verified {
        Ok(true) => {
            req.extensions_mut().insert(AuthenticatedUser(username));
            next.run(req).await
        }
        Ok(false) => {
            tracing::warn!(user = %username, uri = %req.uri(), "Invalid credentials");
            unauthorized(&state)
        }
        Err(e) => {
            tracing::error!(user = %username, error = %e, "Credential check aborted");
            unauthorized(&state)
        }
    }
}

fn unauthorized(state: &AuthState) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, state.challenge.clone())],
        "401 Unauthorized\n",
    )
        .into_response()
}
