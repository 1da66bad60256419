//! Environment variable layer.
//!
//! Every variable may redirect to another one with the `ENV:<NAME>` form.
//! Empty values (direct or redirected) leave the prior value in place.

use std::collections::HashMap;

use crate::config::schema::Settings;

pub const ENV_LISTEN_HOST: &str = "WATCHMAN_LISTEN_HOST";
pub const ENV_LISTEN_PORT: &str = "WATCHMAN_LISTEN_PORT";
pub const ENV_DESTINATION_HOST: &str = "WATCHMAN_DEST_HOST";
pub const ENV_DESTINATION_PORT: &str = "WATCHMAN_DEST_PORT";
pub const ENV_DESCRIPTION: &str = "WATCHMAN_DESC";
pub const ENV_PASSWD_FILE: &str = "WATCHMAN_PASSWD";
pub const ENV_LOOKUP_DIR: &str = "WATCHMAN_DIR";
pub const ENV_CONFIG_FILE: &str = "WATCHMAN_CONFIG";

const REDIRECT_PREFIX: &str = "ENV:";

/// Source of environment variables.
pub trait EnvSource {
    /// Raw value of `name`, if set.
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
}

/// Resolve `name`, following a single `ENV:` redirection.
///
/// Returns `None` when the variable, or its redirection target, is unset or empty.
pub fn lookup<E: EnvSource + ?Sized>(env: &E, name: &str) -> Option<String> {
    let value = env.get(name).filter(|v| !v.is_empty())?;
    match value.strip_prefix(REDIRECT_PREFIX) {
        Some(target) => env.get(target).filter(|v| !v.is_empty()),
        None => Some(value),
    }
}

/// Overwrite `settings` with every variable that resolves to a value.
pub fn apply_env<E: EnvSource + ?Sized>(settings: &mut Settings, env: &E) {
    override_string(env, ENV_LISTEN_HOST, &mut settings.listen_host);
    override_port(env, ENV_LISTEN_PORT, &mut settings.listen_port);
    override_string(env, ENV_DESTINATION_HOST, &mut settings.destination_host);
    override_port(env, ENV_DESTINATION_PORT, &mut settings.destination_port);
    override_string(env, ENV_DESCRIPTION, &mut settings.description);
    override_string(env, ENV_PASSWD_FILE, &mut settings.passwd_file);
}

fn override_string<E: EnvSource + ?Sized>(env: &E, name: &str, slot: &mut String) {
    if let Some(value) = lookup(env, name) {
        *slot = value;
    }
}

fn override_port<E: EnvSource + ?Sized>(env: &E, name: &str, slot: &mut i64) {
    let Some(value) = lookup(env, name) else {
        return;
    };
    match value.trim().parse::<i64>() {
        Ok(port) => *slot = port,
        Err(_) => {
            tracing::warn!(variable = name, value = %value, "Ignoring non-numeric port");
        }
    }
}
