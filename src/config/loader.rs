//! Layered configuration resolution.
//!
//! Precedence, lowest to highest: built-in defaults, environment, file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::env::{
    apply_env, lookup, EnvSource, ProcessEnv, ENV_CONFIG_FILE, ENV_LOOKUP_DIR,
};
use crate::config::schema::{EffectiveConfig, FileConfig, Settings};
use crate::config::validation::{
    absolute_credential_path, clean_path, format_address, validate_settings, ValidationErrors,
};

/// Config file name used when neither the flag nor the environment names one.
pub const DEFAULT_CONFIG_NAME: &str = "watchman.conf";

/// Startup configuration failure. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to load config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("passwd file '{}' is missing", .0.display())]
    MissingPasswdFile(PathBuf),
    #[error("failed to determine working directory: {0}")]
    WorkingDir(#[source] io::Error),
}

/// Merges defaults, environment and file into an [`EffectiveConfig`].
#[derive(Debug, Clone)]
pub struct ConfigResolver<E = ProcessEnv> {
    env: E,
    lookup_dir: PathBuf,
}

impl ConfigResolver<ProcessEnv> {
    /// Resolver over the process environment.
    pub fn from_process_env() -> Self {
        Self::with_env(ProcessEnv)
    }
}

impl<E: EnvSource> ConfigResolver<E> {
    /// Resolver over `env`. The lookup directory comes from `WATCHMAN_DIR`,
    /// defaulting to the working directory.
    pub fn with_env(env: E) -> Self {
        let lookup_dir = lookup(&env, ENV_LOOKUP_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { env, lookup_dir }
    }

    /// Path of the config file: `explicit` if given, else `WATCHMAN_CONFIG`,
    /// else [`DEFAULT_CONFIG_NAME`]. Relative paths land in the lookup directory.
    pub fn config_path(&self, explicit: Option<&Path>) -> PathBuf {
        let name = explicit
            .map(Path::to_path_buf)
            .or_else(|| lookup(&self.env, ENV_CONFIG_FILE).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME));

        if name.is_absolute() {
            clean_path(&name)
        } else {
            clean_path(&self.lookup_dir.join(name))
        }
    }

    /// Resolve and validate the configuration, reading `file_path` if it exists.
    pub fn resolve(&self, file_path: &Path) -> Result<EffectiveConfig, ConfigError> {
        let mut settings = Settings::default();
        apply_env(&mut settings, &self.env);

        match read_config_file(file_path)? {
            Some(file) => {
                tracing::debug!(path = %file_path.display(), "Applying config file");
                settings.apply_file(file);
            }
            None => {
                tracing::warn!(
                    path = %file_path.display(),
                    "No config file found, using defaults and environment"
                );
            }
        }

        validate_settings(&settings).map_err(ConfigError::Validation)?;

        let cwd = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        let credential_file =
            absolute_credential_path(&settings.passwd_file, &self.lookup_dir, &cwd);
        match fs::metadata(&credential_file) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::MissingPasswdFile(credential_file));
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: credential_file,
                    source,
                });
            }
        }

        Ok(EffectiveConfig::new(
            format_address(&settings.listen_host, settings.listen_port),
            format_address(&settings.destination_host, settings.destination_port),
            settings.description,
            credential_file,
        ))
    }
}

/// `Ok(None)` when the file does not exist; decode errors are fatal.
fn read_config_file(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
