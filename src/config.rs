use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub jobs: JobConfig,
    /// Maximum request body size in bytes for uploads
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Directory holding the redb document store
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory for raw uploads and generated thumbnails
    pub folder_path: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_seconds: u64,
    /// How often expired sessions are swept from the cache
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Run background workers inside this process
    pub run_workers: bool,
    /// Workers per queue
    pub concurrency: usize,
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            folder_path: "/tmp/files_manager".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 24 * 60 * 60,
            sweep_interval_seconds: 60,
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            run_workers: true,
            concurrency: 1,
            max_attempts: 3,
            poll_interval_ms: 1000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            jobs: JobConfig::default(),
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl JobConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup, applying defaults
    /// for anything missing or unparseable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let bind_address = lookup("BIND_ADDRESS").unwrap_or(defaults.server.bind_address);
        let data_dir = lookup("DATA_DIR").unwrap_or(defaults.server.data_dir);
        let folder_path = lookup("FOLDER_PATH").unwrap_or(defaults.storage.folder_path);

        let max_upload_size =
            parsed(&lookup, "MAX_UPLOAD_SIZE").unwrap_or(defaults.max_upload_size);

        let ttl_seconds =
            parsed(&lookup, "SESSION_TTL_SECONDS").unwrap_or(defaults.session.ttl_seconds);
        let sweep_interval_seconds = parsed(&lookup, "SESSION_SWEEP_INTERVAL_SECONDS")
            .unwrap_or(defaults.session.sweep_interval_seconds);

        let run_workers = lookup("RUN_WORKERS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.jobs.run_workers);
        let concurrency =
            parsed(&lookup, "WORKER_CONCURRENCY").unwrap_or(defaults.jobs.concurrency);
        let max_attempts =
            parsed(&lookup, "JOB_MAX_ATTEMPTS").unwrap_or(defaults.jobs.max_attempts);
        let poll_interval_ms =
            parsed(&lookup, "JOB_POLL_INTERVAL_MS").unwrap_or(defaults.jobs.poll_interval_ms);

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig { folder_path },
            session: SessionConfig {
                ttl_seconds,
                sweep_interval_seconds,
            },
            jobs: JobConfig {
                run_workers,
                concurrency,
                max_attempts,
                poll_interval_ms,
            },
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_address.is_empty() {
            return Err(ConfigError::ValidationError(
                "BIND_ADDRESS cannot be empty".to_string(),
            ));
        }

        if self.session.ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "SESSION_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.session.sweep_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "SESSION_SWEEP_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.jobs.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "WORKER_CONCURRENCY must be greater than 0".to_string(),
            ));
        }

        if self.jobs.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "JOB_MAX_ATTEMPTS must be greater than 0".to_string(),
            ));
        }

        if self.jobs.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "JOB_POLL_INTERVAL_MS must be greater than 0".to_string(),
            ));
        }

        if !self.jobs.run_workers {
            tracing::warn!(
                "RUN_WORKERS is disabled. Thumbnail and welcome jobs will queue up \
                 until a worker process drains them."
            );
        }

        Ok(())
    }
}

/// Parse `key` from `lookup`, treating unparseable values as missing.
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:5000");
        assert_eq!(config.storage.folder_path, "/tmp/files_manager");
        assert_eq!(config.session.ttl_seconds, 86_400);
        assert_eq!(config.jobs.max_attempts, 3);
        assert!(config.jobs.run_workers);
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("FOLDER_PATH", "/srv/files"),
            ("SESSION_TTL_SECONDS", "60"),
            ("WORKER_CONCURRENCY", "4"),
            ("RUN_WORKERS", "false"),
        ])
        .unwrap();
        assert_eq!(config.storage.folder_path, "/srv/files");
        assert_eq!(config.session.ttl(), Duration::from_secs(60));
        assert_eq!(config.jobs.concurrency, 4);
        assert!(!config.jobs.run_workers);
    }

    #[test]
    fn test_every_numeric_setting_parses() {
        let config = from_map(&[
            ("MAX_UPLOAD_SIZE", "1024"),
            ("SESSION_TTL_SECONDS", "120"),
            ("SESSION_SWEEP_INTERVAL_SECONDS", "5"),
            ("WORKER_CONCURRENCY", " 3 "),
            ("JOB_MAX_ATTEMPTS", "7"),
            ("JOB_POLL_INTERVAL_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.max_upload_size, 1024);
        assert_eq!(config.session.ttl_seconds, 120);
        assert_eq!(config.session.sweep_interval(), Duration::from_secs(5));
        assert_eq!(config.jobs.concurrency, 3);
        assert_eq!(config.jobs.max_attempts, 7);
        assert_eq!(config.jobs.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_unparseable_falls_back_to_default() {
        let config = from_map(&[("JOB_MAX_ATTEMPTS", "lots")]).unwrap();
        assert_eq!(config.jobs.max_attempts, 3);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(from_map(&[("SESSION_TTL_SECONDS", "0")]).is_err());
        assert!(from_map(&[("WORKER_CONCURRENCY", "0")]).is_err());
        assert!(from_map(&[("JOB_MAX_ATTEMPTS", "0")]).is_err());
        assert!(from_map(&[("JOB_POLL_INTERVAL_MS", "0")]).is_err());
    }
}
