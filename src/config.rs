//! Cache configuration
//!
//! The cache root and headroom policy are passed explicitly to `FileCache`
//! instead of living in process-wide state. `from_env` is how the binary
//! builds one.

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::cache::space::{Accounting, HeadroomPolicy, DEFAULT_MIN_FREE_RATIO};

/// Environment variable overriding the cache root
pub const ENV_ROOT: &str = "CACHEDFILE_ROOT";
/// Environment variable with the minimum free space, in percent of capacity
pub const ENV_MIN_FREE_PERCENT: &str = "CACHEDFILE_MIN_FREE_PERCENT";
/// Environment variable selecting `after-write` or `before-write` accounting
pub const ENV_ACCOUNTING: &str = "CACHEDFILE_ACCOUNTING";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var} ({value:?}): {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid config document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for a `FileCache`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Directory holding one cached file per id
    pub cache_root: PathBuf,
    /// Fraction of filesystem capacity that must stay free
    pub min_free_ratio: f64,
    /// Whether the entry size counts against the free space
    pub accounting: Accounting,
}

impl CacheConfig {
    /// Config with the default policy and the given root
    pub fn with_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }

    /// Build from `CACHEDFILE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Parse a JSON config document; missing fields take defaults
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(root) = lookup(ENV_ROOT).filter(|v| !v.is_empty()) {
            config.cache_root = PathBuf::from(root);
        }

        if let Some(value) = lookup(ENV_MIN_FREE_PERCENT) {
            let percent: f64 = value.trim().parse().map_err(|e| ConfigError::Invalid {
                var: ENV_MIN_FREE_PERCENT,
                value: value.clone(),
                reason: format!("{}", e),
            })?;
            if !(0.0..=100.0).contains(&percent) {
                return Err(ConfigError::Invalid {
                    var: ENV_MIN_FREE_PERCENT,
                    value,
                    reason: "must be between 0 and 100".to_string(),
                });
            }
            config.min_free_ratio = percent / 100.0;
        }

        if let Some(value) = lookup(ENV_ACCOUNTING) {
            config.accounting = value
                .trim()
                .parse()
                .map_err(|reason| ConfigError::Invalid {
                    var: ENV_ACCOUNTING,
                    value: value.clone(),
                    reason,
                })?;
        }

        Ok(config)
    }

    /// Headroom policy derived from this config
    pub fn headroom(&self) -> HeadroomPolicy {
        HeadroomPolicy::new(self.min_free_ratio, self.accounting)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            min_free_ratio: DEFAULT_MIN_FREE_RATIO,
            accounting: Accounting::default(),
        }
    }
}

/// Platform cache directory, e.g. `~/.cache/cachedfile`
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("cachedfile")
}
