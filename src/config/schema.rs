//! Configuration schema definitions.
//!
//! Three shapes flow through resolution:
//! - [`Settings`]: the working values, seeded from built-in defaults and
//!   overwritten layer by layer.
//! - [`FileConfig`]: the optional TOML document; every key is optional.
//! - [`EffectiveConfig`]: the validated, frozen result handed to the gateway.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default listen port.
pub const DEFAULT_LISTEN_PORT: i64 = 80;

/// Default upstream host.
pub const DEFAULT_DESTINATION_HOST: &str = "127.0.0.1";

/// Default upstream port.
pub const DEFAULT_DESTINATION_PORT: i64 = 8080;

/// Default Basic-Auth realm.
pub const DEFAULT_DESCRIPTION: &str = "Secured Area";

/// Default credential file name, relative to the lookup directory.
pub const DEFAULT_PASSWD_FILE: &str = "watchman.passwd";

/// Working configuration values before validation.
///
/// Ports are kept signed and wide so that out-of-range values coming from
/// the environment or the file survive until validation reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub listen_host: String,
    pub listen_port: i64,
    pub destination_host: String,
    pub destination_port: i64,
    pub description: String,
    pub passwd_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_host: String::new(),
            listen_port: DEFAULT_LISTEN_PORT,
            destination_host: DEFAULT_DESTINATION_HOST.to_string(),
            destination_port: DEFAULT_DESTINATION_PORT,
            description: DEFAULT_DESCRIPTION.to_string(),
            passwd_file: DEFAULT_PASSWD_FILE.to_string(),
        }
    }
}

impl Settings {
    /// Overwrite every field the file sets.
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.listen_host {
            self.listen_host = v;
        }
        if let Some(v) = file.listen_port {
            self.listen_port = v;
        }
        if let Some(v) = file.destination_host {
            self.destination_host = v;
        }
        if let Some(v) = file.destination_port {
            self.destination_port = v;
        }
        if let Some(v) = file.description {
            self.description = v;
        }
        if let Some(v) = file.passwd_file {
            self.passwd_file = v;
        }
    }
}

/// On-disk configuration document (TOML).
///
/// ```toml
/// ListenHost = "0.0.0.0"
/// ListenPort = 8000
/// DestinationHost = "10.0.0.5"
/// DestinationPort = 3000
/// Description = "Staging"
/// PasswdFile = "/etc/watchman/users.passwd"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileConfig {
    pub listen_host: Option<String>,
    pub listen_port: Option<i64>,
    pub destination_host: Option<String>,
    pub destination_port: Option<i64>,
    pub description: Option<String>,
    pub passwd_file: Option<String>,
}

/// Validated runtime configuration. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    listen_address: String,
    destination_address: String,
    realm: String,
    credential_file: PathBuf,
}

impl EffectiveConfig {
    pub(crate) fn new(
        listen_address: String,
        destination_address: String,
        realm: String,
        credential_file: PathBuf,
    ) -> Self {
        Self {
            listen_address,
            destination_address,
            realm,
            credential_file,
        }
    }

    /// `host:port` to listen on; the host part may be empty.
    pub fn listen_address(&self) -> &str {
        &self.listen_address
    }

    /// Socket address suitable for binding. An empty host binds all interfaces.
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }

    /// `host:port` of the upstream.
    pub fn destination_address(&self) -> &str {
        &self.destination_address
    }

    /// Realm shown in the Basic-Auth challenge.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Absolute path of the credential file.
    pub fn credential_file(&self) -> &Path {
        &self.credential_file
    }
}
