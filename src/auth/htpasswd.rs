//! Credential store backed by an htpasswd file.
//!
//! The parsed table lives behind an [`ArcSwap`], so a reload swaps the
//! whole table in one step while concurrent lookups keep reading the old one.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::auth::digest::PasswordDigest;
use crate::auth::CredentialStore;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credential file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

type Table = HashMap<String, PasswordDigest>;

/// Username → digest table loaded from `path`.
#[derive(Debug)]
pub struct HtpasswdStore {
    path: PathBuf,
    entries: ArcSwap<Table>,
}

impl HtpasswdStore {
    /// Load the file at `path`. An empty file yields a store with no users.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let table = read_table(&path)?;
        tracing::info!(path = %path.display(), users = table.len(), "Credential file loaded");
        Ok(Self {
            path,
            entries: ArcSwap::from_pointee(table),
        })
    }

    /// Re-read the file. On failure the current table stays in place.
    pub fn reload(&self) -> Result<usize, CredentialError> {
        let table = read_table(&self.path)?;
        let users = table.len();
        self.entries.store(Arc::new(table));
        Ok(users)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of users currently loaded.
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for HtpasswdStore {
    fn verify(&self, username: &str, secret: &str) -> bool {
        match self.entries.load().get(username) {
            Some(digest) => digest.verify(secret),
            None => false,
        }
    }
}

fn read_table(path: &Path) -> Result<Table, CredentialError> {
    let content = fs::read_to_string(path).map_err(|source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_htpasswd(&content))
}

/// Parse `user:digest` lines. Blank lines and `#` comments are skipped;
/// lines that cannot be used are logged and skipped. Later entries for the
/// same user replace earlier ones.
pub fn parse_htpasswd(content: &str) -> Table {
    let mut table = HashMap::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((user, raw)) = line.split_once(':') else {
            tracing::warn!(line = index + 1, "Skipping credential line without ':'");
            continue;
        };
        if user.is_empty() {
            tracing::warn!(line = index + 1, "Skipping credential line with empty user");
            continue;
        }

        match PasswordDigest::parse(raw) {
            Ok(digest) => {
                table.insert(user.to_string(), digest);
            }
            Err(e) => {
                tracing::warn!(
                    line = index + 1,
                    user = %user,
                    error = %e,
                    "Skipping credential entry"
                );
            }
        }
    }

    table
}
