//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create the Axum router; every path goes through one forwarding handler
//! - Wire up middleware (tracing span per request, Basic authentication)
//! - Bind server to listener with peer-address info
//! - Forward authenticated requests to the upstream and stream the reply back

use axum::{
    body::Body,
    extract::{ConnectInfo, Extension, State},
    http::{
        header::InvalidHeaderValue,
        uri::{Authority, InvalidUri},
        HeaderValue, Request, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{challenge, CredentialStore};
use crate::config::EffectiveConfig;
use crate::http::client_addr::resolve_client_address;
use crate::http::director::{rewrite, strip_hop_by_hop};
use crate::http::middleware::{basic_auth_middleware, AuthState, AuthenticatedUser};
use crate::observability::logging;

/// Configuration that cannot be turned into a running gateway.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid destination address '{address}': {source}")]
    Destination {
        address: String,
        #[source]
        source: InvalidUri,
    },
    #[error("realm cannot be used in a WWW-Authenticate header: {0}")]
    Realm(#[source] InvalidHeaderValue),
}

/// Failure while relaying a request. Surfaces as `502 Bad Gateway`.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build upstream request: {0}")]
    Rewrite(#[from] axum::http::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_GATEWAY, "502 Bad Gateway\n").into_response()
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub destination: Authority,
    pub client: Client<HttpConnector, Body>,
}

/// Authenticating reverse proxy in front of a single upstream.
pub struct GatewayServer {
    router: Router,
    config: Arc<EffectiveConfig>,
}

impl GatewayServer {
    /// Create a gateway for `config`, checking credentials against `store`.
    pub fn new(
        config: EffectiveConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ServerError> {
        let destination = Authority::from_str(config.destination_address()).map_err(|source| {
            ServerError::Destination {
                address: config.destination_address().to_string(),
                source,
            }
        })?;
        let challenge =
            HeaderValue::from_str(&challenge(config.realm())).map_err(ServerError::Realm)?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState { destination, client };
        let auth = AuthState { store, challenge };

        Ok(Self {
            router: Self::build_router(state, auth),
            config: Arc::new(config),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, auth: AuthState) -> Router {
        Router::new()
            .fallback(forward_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(auth, basic_auth_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }))
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            destination = %self.config.destination_address(),
            realm = %self.config.realm(),
            "Gateway listening"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Forward an authenticated request upstream and relay the reply.
async fn forward_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Extension(user): Extension<AuthenticatedUser>,
    request: Request<Body>,
) -> Result<Response, ForwardError> {
    let client = resolve_client_address(request.headers(), &peer.to_string());
    logging::access(&user.0, &client, request.method(), request.uri());

    let uri = request.uri().clone();
    let outbound = rewrite(request, &state.destination).inspect_err(|e| {
        tracing::error!(user = %user.0, url = %uri, error = %e, "Failed to rewrite request");
    })?;

    match state.client.request(outbound).await {
        Ok(response) => Ok(relay(response)),
        Err(e) => {
            tracing::error!(user = %user.0, url = %uri, error = ?e, "Upstream error");
            Err(ForwardError::Upstream(e))
        }
    }
}

/// Hand the upstream response back without buffering the body.
fn relay(response: hyper::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::header;
    use base64::{engine::general_purpose, Engine as _};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Accepts `user`/`pass` and counts every lookup.
    struct FixedStore {
        calls: AtomicUsize,
    }

    impl CredentialStore for FixedStore {
        fn verify(&self, username: &str, secret: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            username == "user" && secret == "pass"
        }
    }

    fn config(destination: &str, realm: &str) -> EffectiveConfig {
        EffectiveConfig::new(
            "127.0.0.1:0".into(),
            destination.into(),
            realm.into(),
            PathBuf::from("/dev/null"),
        )
    }

    fn app(destination: &str) -> (Router, Arc<FixedStore>) {
        let store = Arc::new(FixedStore {
            calls: AtomicUsize::new(0),
        });
        let server = GatewayServer::new(config(destination, "Test Realm"), store.clone()).unwrap();
        let router = server
            .router
            .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));
        (router, store)
    }

    fn basic(raw: &str) -> String {
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }

    #[tokio::test]
    async fn missing_credentials_get_challenge() {
        let (router, store) = app("127.0.0.1:1");
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"Test Realm\""
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (router, store) = app("127.0.0.1:1");
        let response = router
            .oneshot(
                Request::get("/")
                    .header(header::AUTHORIZATION, basic("user:nope"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forwarding_headers_do_not_bypass_auth() {
        let (router, _) = app("127.0.0.1:1");
        let response = router
            .oneshot(
                Request::get("/")
                    .header("x-forwarded-for", "127.0.0.1")
                    .header("x-real-ip", "127.0.0.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        // Reserve a port, then free it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (router, _) = app(&addr.to_string());
        let response = router
            .oneshot(
                Request::get("/")
                    .header(header::AUTHORIZATION, basic("user:pass"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn rejects_unusable_realm() {
        let store = Arc::new(FixedStore {
            calls: AtomicUsize::new(0),
        });
        let result = GatewayServer::new(config("127.0.0.1:8080", "bad\nrealm"), store);
        assert!(matches!(result, Err(ServerError::Realm(_))));
    }
}
