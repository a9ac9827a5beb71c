//! Sync layer configuration loaded from environment variables.
//!
//! Every setting has a default, so an unconfigured process runs against the
//! local store only.

use std::path::PathBuf;
use std::time::Duration;

use dormglide_remote::RemoteConfig;
use dormglide_shared::constants::{
    DEFAULT_REMOTE_COOLDOWN_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_REMOTE_COOLDOWN_SECS,
};
use dormglide_shared::AuthMode;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote project URL and anon key.
    /// Env: `DORMGLIDE_SUPABASE_URL`, `DORMGLIDE_SUPABASE_ANON_KEY`
    /// Default: empty (remote not configured).
    pub remote: RemoteConfig,

    /// Whether writes may fall back to the local store.
    /// Env: `DORMGLIDE_AUTH_MODE` (`hybrid` | `supabase-only`)
    /// Default: `hybrid`
    pub auth_mode: AuthMode,

    /// How long a backend family stays disabled after a connectivity failure.
    /// Env: `DORMGLIDE_REMOTE_COOLDOWN_SECS`
    /// Default: 30 seconds, at most one day.
    pub cooldown: Duration,

    /// Directory holding the local database.
    /// Env: `DORMGLIDE_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::new("", ""),
            auth_mode: AuthMode::Hybrid,
            cooldown: Duration::from_secs(DEFAULT_REMOTE_COOLDOWN_SECS),
            data_dir: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SyncConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("DORMGLIDE_SUPABASE_URL") {
            config.remote.url = url.trim().to_string();
        }

        if let Some(key) = lookup("DORMGLIDE_SUPABASE_ANON_KEY") {
            config.remote.anon_key = key.trim().to_string();
        }

        if let Some(mode) = lookup("DORMGLIDE_AUTH_MODE") {
            match mode.parse::<AuthMode>() {
                Ok(parsed) => config.auth_mode = parsed,
                Err(e) => tracing::warn!(error = %e, "Invalid DORMGLIDE_AUTH_MODE, using hybrid"),
            }
        }

        if let Some(val) = lookup("DORMGLIDE_REMOTE_COOLDOWN_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs <= MAX_REMOTE_COOLDOWN_SECS => {
                    config.cooldown = Duration::from_secs(secs)
                }
                _ => tracing::warn!(
                    value = %val,
                    max = MAX_REMOTE_COOLDOWN_SECS,
                    "Invalid DORMGLIDE_REMOTE_COOLDOWN_SECS, using default"
                ),
            }
        }

        if let Some(val) = lookup("DORMGLIDE_REQUEST_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.remote.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    default = DEFAULT_REQUEST_TIMEOUT_SECS,
                    "Invalid DORMGLIDE_REQUEST_TIMEOUT_SECS, using default"
                ),
            }
        }

        if let Some(dir) = lookup("DORMGLIDE_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if !config.remote.url.is_empty() && !config.remote.is_configured() {
            tracing::warn!(
                url = %config.remote.url,
                "Remote backend not configured (https URL and anon key required), using local store"
            );
        }

        config
    }

    pub fn remote_configured(&self) -> bool {
        self.remote.is_configured()
    }
}
