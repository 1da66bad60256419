//! Configuration validation.
//!
//! # Responsibilities
//! - Validate value ranges (ports in `1..=65535`)
//! - Reject empty fields that the gateway cannot run without
//! - Derive `host:port` addresses and the absolute credential path
//!
//! # Design Decisions
//! - Returns all field errors, not just first
//! - Field validation is a pure function: `&Settings → Result<(), Vec<ValidationError>>`
//! - Only the credential path check touches the filesystem

use std::fmt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::config::schema::Settings;

pub const MIN_PORT: i64 = 1;
pub const MAX_PORT: i64 = 65535;

/// A single semantic problem with the resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listen port: {0}")]
    ListenPort(i64),
    #[error("invalid destination port: {0}")]
    DestinationPort(i64),
    #[error("destination host must not be empty")]
    EmptyDestinationHost,
    #[error("description must not be empty")]
    EmptyDescription,
    #[error("passwd file path must not be empty")]
    EmptyPasswdFile,
}

/// Wrapper so a list of errors renders as one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

pub fn is_valid_port(port: i64) -> bool {
    (MIN_PORT..=MAX_PORT).contains(&port)
}

/// Check field-level invariants.
pub fn validate_settings(settings: &Settings) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if !is_valid_port(settings.listen_port) {
        errors.push(ValidationError::ListenPort(settings.listen_port));
    }
    if !is_valid_port(settings.destination_port) {
        errors.push(ValidationError::DestinationPort(settings.destination_port));
    }
    if settings.destination_host.trim().is_empty() {
        errors.push(ValidationError::EmptyDestinationHost);
    }
    if settings.description.is_empty() {
        errors.push(ValidationError::EmptyDescription);
    }
    if settings.passwd_file.trim().is_empty() {
        errors.push(ValidationError::EmptyPasswdFile);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

/// Join host and port. IPv6 literals are bracketed so the result stays a
/// valid authority.
pub fn format_address(host: &str, port: i64) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Make the credential path absolute and lexically clean.
///
/// Relative paths are resolved against `lookup_dir`, then against `cwd` if
/// the lookup directory is itself relative.
pub fn absolute_credential_path(raw: &str, lookup_dir: &Path, cwd: &Path) -> PathBuf {
    let mut path = PathBuf::from(raw);
    if path.is_relative() {
        path = lookup_dir.join(path);
    }
    if path.is_relative() {
        path = cwd.join(path);
    }
    clean_path(&path)
}

/// Remove `.` components and fold `..` into its parent without touching
/// the filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
