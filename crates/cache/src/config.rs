//! Cache configuration
//!
//! Values come from, in increasing precedence: built-in defaults, a
//! serialized config (any serde format), `FILESTASH_*` environment variables
//! and explicit builder calls.

use crate::errors::{CacheError, RecoveryHint, Result};
use crate::streaming::DEFAULT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DIR: &str = "FILESTASH_DIR";
pub const ENV_STAGING_GRACE_SECS: &str = "FILESTASH_STAGING_GRACE_SECS";
pub const ENV_GC_INTERVAL_SECS: &str = "FILESTASH_GC_INTERVAL_SECS";
pub const ENV_BUFFER_SIZE: &str = "FILESTASH_BUFFER_SIZE";

const DEFAULT_STAGING_GRACE: Duration = Duration::from_secs(15 * 60);

/// Configuration for a [`FileCache`](crate::FileCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding all epochs. Must be exclusive to one cache.
    pub base_dir: PathBuf,
    /// Staging files older than this are considered abandoned
    pub staging_grace: Duration,
    /// Period of the background collector; `None` disables it
    pub gc_interval: Option<Duration>,
    /// Copy buffer size in bytes
    pub buffer_size: usize,
    /// `fsync` staged content before it is committed
    pub sync_on_commit: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let base_dir = match dirs::cache_dir() {
            Some(dir) => dir.join("filestash"),
            None => std::env::temp_dir().join("filestash"),
        };
        Self {
            base_dir,
            staging_grace: DEFAULT_STAGING_GRACE,
            gc_interval: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            sync_on_commit: false,
        }
    }
}

impl CacheConfig {
    /// Defaults with a specific base directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// Defaults overlaid with `FILESTASH_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup(ENV_DIR) {
            self.base_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup(ENV_STAGING_GRACE_SECS) {
            self.staging_grace = Duration::from_secs(parse_env(ENV_STAGING_GRACE_SECS, &value)?);
        }
        if let Some(value) = lookup(ENV_GC_INTERVAL_SECS) {
            let secs: u64 = parse_env(ENV_GC_INTERVAL_SECS, &value)?;
            // Zero turns the background collector off
            self.gc_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(value) = lookup(ENV_BUFFER_SIZE) {
            self.buffer_size = parse_env(ENV_BUFFER_SIZE, &value)?;
        }
        Ok(())
    }

    /// Reject configurations the cache cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(CacheError::Configuration {
                message: "base directory must not be empty".to_string(),
                recovery_hint: RecoveryHint::UpdateConfiguration,
            });
        }
        if self.buffer_size == 0 {
            return Err(CacheError::Configuration {
                message: "buffer size must be greater than zero".to_string(),
                recovery_hint: RecoveryHint::UpdateConfiguration,
            });
        }
        if self.gc_interval == Some(Duration::ZERO) {
            return Err(CacheError::Configuration {
                message: "garbage collection interval must be greater than zero".to_string(),
                recovery_hint: RecoveryHint::UpdateConfiguration,
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(CacheError::Configuration {
            message: format!("{name} has invalid value '{value}'"),
            recovery_hint: RecoveryHint::Manual {
                instructions: format!("Set {name} to a non-negative integer or unset it"),
            },
        }),
    }
}

/// Builder for [`CacheConfig`]
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = base_dir.into();
        self
    }

    pub fn with_staging_grace(mut self, grace: Duration) -> Self {
        self.config.staging_grace = grace;
        self
    }

    pub fn with_gc_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.gc_interval = interval;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn with_sync_on_commit(mut self, sync: bool) -> Self {
        self.config.sync_on_commit = sync;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<CacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = CacheConfig::default();
        assert!(config.base_dir.ends_with("filestash"));
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.gc_interval, None);
        config.validate().unwrap();
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::builder()
            .with_base_dir("/tmp/cache")
            .with_staging_grace(Duration::ZERO)
            .with_gc_interval(Some(Duration::from_secs(30)))
            .with_buffer_size(4096)
            .with_sync_on_commit(true)
            .build()
            .unwrap();

        assert_eq!(config.base_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(config.staging_grace, Duration::ZERO);
        assert_eq!(config.gc_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.buffer_size, 4096);
        assert!(config.sync_on_commit);
    }

    #[test]
    fn test_builder_rejects_invalid() {
        let err = CacheConfig::builder().with_buffer_size(0).build().unwrap_err();
        assert!(matches!(err, CacheError::Configuration { .. }));

        let err = CacheConfig::builder().with_base_dir("").build().unwrap_err();
        assert_eq!(err.recovery_hint(), &RecoveryHint::UpdateConfiguration);

        assert!(CacheConfig::builder()
            .with_gc_interval(Some(Duration::ZERO))
            .build()
            .is_err());
    }

    #[test]
    fn test_env_overlay() {
        let mut config = CacheConfig::new("/default");
        config
            .apply_env(env(&[
                (ENV_DIR, "/from/env"),
                (ENV_STAGING_GRACE_SECS, "5"),
                (ENV_GC_INTERVAL_SECS, "60"),
                (ENV_BUFFER_SIZE, " 8192 "),
            ]))
            .unwrap();

        assert_eq!(config.base_dir, PathBuf::from("/from/env"));
        assert_eq!(config.staging_grace, Duration::from_secs(5));
        assert_eq!(config.gc_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.buffer_size, 8192);
    }

    #[test]
    fn test_env_zero_interval_disables_collector() {
        let mut config = CacheConfig::new("/default");
        config.gc_interval = Some(Duration::from_secs(10));
        config.apply_env(env(&[(ENV_GC_INTERVAL_SECS, "0")])).unwrap();
        assert_eq!(config.gc_interval, None);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut config = CacheConfig::new("/default");
        let err = config
            .apply_env(env(&[(ENV_BUFFER_SIZE, "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_BUFFER_SIZE));
    }

    #[test]
    fn test_partial_serialized_config_uses_defaults() {
        let config: CacheConfig =
            serde_json::from_str(r#"{ "base_dir": "/srv/cache", "sync_on_commit": true }"#).unwrap();

        assert_eq!(config.base_dir, PathBuf::from("/srv/cache"));
        assert!(config.sync_on_commit);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.staging_grace, DEFAULT_STAGING_GRACE);
    }
}
