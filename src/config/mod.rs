//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults (schema.rs)
//!     → env.rs (WATCHMAN_* overrides, ENV:<NAME> redirection)
//!     → loader.rs (optional TOML file, highest precedence)
//!     → validation.rs (port ranges, derived addresses, passwd path)
//!     → EffectiveConfig (validated, immutable)
//!     → shared by reference with the gateway
//! ```
//!
//! # Design Decisions
//! - Config is immutable once resolved; there is no reload
//! - A missing file is a warning, a malformed one is fatal
//! - Environment access goes through `EnvSource` so tests never mutate
//!   the process environment

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::{EnvSource, ProcessEnv};
pub use loader::{ConfigError, ConfigResolver};
pub use schema::{EffectiveConfig, FileConfig, Settings};
