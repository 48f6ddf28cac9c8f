//! Configuration for the email-opened pipeline.

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::retry::{BackoffStrategy, ReadRetryPolicy, SessionRetryPolicy};
use crate::store::StoreOptions;

const CONFIG_FILE: &str = "bounce-reset.toml";
const ENV_PREFIX: &str = "BOUNCE_RESET_";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Pipeline configuration with defaults, file, and environment overrides.
///
/// Sources in priority order:
/// 1. Environment variables prefixed with `BOUNCE_RESET_`
///    (e.g. `BOUNCE_RESET_READ_RETRY_COUNT`)
/// 2. `bounce-reset.toml` in the working directory
/// 3. Built-in defaults
///
/// ```no_run
/// use bounce_reset::config::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
/// println!("Reading up to {} times", config.read_retry_count);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Read retry
    /// Wait between two lookups of a contact that is not visible yet, in
    /// milliseconds. Negative values are treated as zero.
    #[serde(default = "default_read_retry_delay_ms")]
    pub read_retry_delay_ms: i64,

    /// Total number of lookups, the first one included.
    #[serde(default = "default_read_retry_count")]
    pub read_retry_count: u32,

    // Session retry
    #[serde(default = "default_session_max_attempts")]
    pub session_max_attempts: u32,

    #[serde(default = "default_session_base_delay_ms")]
    pub session_base_delay_ms: u64,

    #[serde(default = "default_session_max_delay_ms")]
    pub session_max_delay_ms: u64,

    #[serde(default = "default_session_backoff")]
    pub session_backoff: BackoffStrategy,

    // Store
    /// Deadline for a single store call in milliseconds; `0` disables it.
    #[serde(default)]
    pub operation_timeout_ms: u64,

    #[serde(default = "default_store_buffer_size")]
    pub store_buffer_size: usize,

    /// How long a written contact stays invisible to readers, in milliseconds.
    #[serde(default)]
    pub replication_lag_ms: u64,
}

impl Config {
    /// Loads from defaults, `bounce-reset.toml`, and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Same as [`Config::load`] with an explicit configuration file.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "session_max_attempts must be greater than 0".into(),
            ));
        }
        if self.store_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "store_buffer_size must be greater than 0".into(),
            ));
        }
        if self.session_max_delay_ms < self.session_base_delay_ms {
            return Err(ConfigError::Invalid(
                "session_max_delay_ms cannot be lower than session_base_delay_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn to_read_retry_policy(&self) -> ReadRetryPolicy {
        ReadRetryPolicy::new(self.read_retry_delay_ms, self.read_retry_count)
    }

    pub fn to_session_retry_policy(&self) -> SessionRetryPolicy {
        SessionRetryPolicy {
            max_attempts: self.session_max_attempts,
            base_delay: Duration::from_millis(self.session_base_delay_ms),
            max_delay: Duration::from_millis(self.session_max_delay_ms),
            backoff_strategy: self.session_backoff,
        }
    }

    pub fn to_store_options(&self) -> StoreOptions {
        StoreOptions {
            buffer_size: self.store_buffer_size,
            replication_lag: Duration::from_millis(self.replication_lag_ms),
            operation_timeout: match self.operation_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_retry_delay_ms: default_read_retry_delay_ms(),
            read_retry_count: default_read_retry_count(),
            session_max_attempts: default_session_max_attempts(),
            session_base_delay_ms: default_session_base_delay_ms(),
            session_max_delay_ms: default_session_max_delay_ms(),
            session_backoff: default_session_backoff(),
            operation_timeout_ms: 0,
            store_buffer_size: default_store_buffer_size(),
            replication_lag_ms: 0,
        }
    }
}

fn default_read_retry_delay_ms() -> i64 {
    500
}

fn default_read_retry_count() -> u32 {
    6
}

fn default_session_max_attempts() -> u32 {
    3
}

fn default_session_base_delay_ms() -> u64 {
    200
}

fn default_session_max_delay_ms() -> u64 {
    5_000
}

fn default_session_backoff() -> BackoffStrategy {
    BackoffStrategy::Exponential
}

fn default_store_buffer_size() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct TestEnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        originals: HashMap<String, Option<String>>,
    }

    impl TestEnvGuard {
        fn new() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Self {
                _lock: lock,
                originals: HashMap::new(),
            }
        }

        fn set_var(&mut self, key: &str, value: &str) {
            self.originals
                .entry(key.to_string())
                .or_insert_with(|| env::var(key).ok());
            env::set_var(key, value);
        }
    }

    impl Drop for TestEnvGuard {
        fn drop(&mut self) {
            for (key, original) in &self.originals {
                match original {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }

    fn temp_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(format!("bounce-reset-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.to_read_retry_policy(), ReadRetryPolicy::default());
        assert_eq!(config.to_session_retry_policy(), SessionRetryPolicy::default());
        assert_eq!(config.to_store_options().operation_timeout, None);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let _guard = TestEnvGuard::new();
        let config = Config::load_from("does-not-exist.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_then_env_overrides() {
        let mut guard = TestEnvGuard::new();
        let path = temp_config(
            "overrides",
            r#"
read_retry_delay_ms = -20
read_retry_count = 3
session_backoff = "linear"
operation_timeout_ms = 750
"#,
        );
        guard.set_var("BOUNCE_RESET_READ_RETRY_COUNT", "9");
        guard.set_var("BOUNCE_RESET_REPLICATION_LAG_MS", "40");

        let config = Config::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.read_retry_count, 9);
        assert_eq!(config.session_backoff, BackoffStrategy::Linear);

        let read = config.to_read_retry_policy();
        assert_eq!(read.delay(), Duration::ZERO);
        assert_eq!(read.max_attempts(), 9);

        let store = config.to_store_options();
        assert_eq!(store.replication_lag, Duration::from_millis(40));
        assert_eq!(store.operation_timeout, Some(Duration::from_millis(750)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("BOUNCE_RESET_SESSION_MAX_ATTEMPTS", "0");
        let result = Config::load_from("does-not-exist.toml");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let config = Config {
            session_base_delay_ms: 1_000,
            session_max_delay_ms: 10,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_value_is_a_load_error() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("BOUNCE_RESET_READ_RETRY_COUNT", "many");
        let result = Config::load_from("does-not-exist.toml");
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
