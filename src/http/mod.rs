//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request span)
//!     → middleware/basic_auth.rs (401 challenge or AuthenticatedUser)
//!     → client_addr.rs (advisory client address, logged only)
//!     → director.rs (scheme/authority rewrite, hop-by-hop strip)
//!     → upstream via hyper client
//!     → response streamed back unchanged
//! ```
//!
//! # Per-request states
//! `Received → Authenticating → {Rejected(401) | Forwarding → Completed}`.
//! A failed forward still completes, with `502 Bad Gateway`.

pub mod client_addr;
pub mod director;
pub mod middleware;
pub mod server;

pub use client_addr::{resolve_client_address, AddressSource, ClientAddress};
pub use server::{ForwardError, GatewayServer, ServerError};
