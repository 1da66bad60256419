//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization header
//!     → basic.rs (decode Basic credentials)
//!     → CredentialStore::verify
//!         → htpasswd.rs (username → digest table, swapped atomically)
//!         → digest.rs (bcrypt / {SHA} / apr1 comparison)
//!
//! On file change:
//!     watcher.rs detects change → htpasswd.rs reloads → table swapped
//! ```

pub mod basic;
pub mod digest;
pub mod htpasswd;
pub mod watcher;

pub use basic::{challenge, BasicAuthError, BasicCredentials};
pub use htpasswd::{CredentialError, HtpasswdStore};
pub use watcher::CredentialWatcher;

/// Verifies a username/secret pair.
///
/// Implementations are shared across all request tasks and must tolerate
/// concurrent calls.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, secret: &str) -> bool;
}
