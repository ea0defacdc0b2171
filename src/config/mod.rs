use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_QUEUE_TYPE: &str = "RAM";
pub const DEFAULT_QUEUE_VERSION: &str = "1.0";
pub const DEFAULT_MAX_ENTRIES: u64 = 1000;
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Limits and plugin selection of one failsafe queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub queue_type: String,
    pub version: String,
    pub max_entries: u64,
    pub max_bytes: u64,
    /// Whether entries may be persisted at all. The RAM queue ignores it.
    pub persistent: bool,
    /// Whether entries receive `added`/`removed` lifecycle callbacks.
    pub notify_add_remove: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_type: DEFAULT_QUEUE_TYPE.to_string(),
            version: DEFAULT_QUEUE_VERSION.to_string(),
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_BYTES,
            persistent: true,
            notify_add_remove: false,
        }
    }
}

impl QueueConfig {
    pub fn with_limits(max_entries: u64, max_bytes: u64) -> Self {
        Self {
            max_entries,
            max_bytes,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub queue: QueueConfig,
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
struct FileConfig {
    pub queue: Option<FileQueueConfig>,
    pub log_filter: Option<String>,
}

impl FileConfig {
    /// Lays file values over the built-in defaults.
    fn into_config(self) -> Config {
        let mut config = Config::default();
        if let Some(q) = self.queue {
            let queue = &mut config.queue;
            if let Some(v) = q.queue_type {
                queue.queue_type = v;
            }
            if let Some(v) = q.version {
                queue.version = v;
            }
            if let Some(v) = q.max_entries {
                queue.max_entries = v;
            }
            if let Some(v) = q.max_bytes {
                queue.max_bytes = v;
            }
            if let Some(v) = q.persistent {
                queue.persistent = v;
            }
            if let Some(v) = q.notify_add_remove {
                queue.notify_add_remove = v;
            }
        }
        if let Some(v) = self.log_filter {
            config.log_filter = v;
        }
        config
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
struct FileQueueConfig {
    #[serde(rename = "type")]
    pub queue_type: Option<String>,
    pub version: Option<String>,
    pub max_entries: Option<u64>,
    pub max_bytes: Option<u64>,
    pub persistent: Option<bool>,
    pub notify_add_remove: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config parse error: {0}")]
    Parse(String),
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_env<T>(name: &str, v: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    v.trim()
        .parse()
        .map_err(|e| ConfigError::Parse(format!("{name}: {e}")))
}

impl Config {
    fn load_file<P: AsRef<Path>>(path: P) -> Result<FileConfig, ConfigError> {
        let path_ref = path.as_ref();
        let raw = fs::read_to_string(path_ref)?;
        let ext = path_ref
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("toml")
            .to_ascii_lowercase();

        if ext == "yaml" || ext == "yml" {
            let cfg: FileConfig = serde_yaml::from_str(&raw)?;
            Ok(cfg)
        } else {
            let cfg: FileConfig = toml::from_str(&raw)?;
            Ok(cfg)
        }
    }

    /// Load configuration from an optional file path and environment variables.
    ///
    /// Precedence: built-in defaults, then file values, then environment
    /// variables. Without an explicit path `FAILSAFE_CONFIG` is consulted.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let env_path = env::var("FAILSAFE_CONFIG").ok();
        let effective_path = path.map(|s| s.to_string()).or(env_path);

        let file_cfg = if let Some(p) = effective_path {
            Self::load_file(p)?
        } else {
            FileConfig::default()
        };

        let mut config = file_cfg.into_config();

        // Env overrides.
        if let Ok(v) = env::var("FAILSAFE_QUEUE_TYPE") {
            config.queue.queue_type = v;
        }

        if let Ok(v) = env::var("FAILSAFE_QUEUE_VERSION") {
            config.queue.version = v;
        }

        if let Ok(v) = env::var("FAILSAFE_QUEUE_MAX_ENTRIES") {
            config.queue.max_entries = parse_env("FAILSAFE_QUEUE_MAX_ENTRIES", &v)?;
        }

        if let Ok(v) = env::var("FAILSAFE_QUEUE_MAX_BYTES") {
            config.queue.max_bytes = parse_env("FAILSAFE_QUEUE_MAX_BYTES", &v)?;
        }

        if let Ok(v) = env::var("FAILSAFE_QUEUE_PERSISTENT") {
            config.queue.persistent = parse_bool(&v);
        }

        if let Ok(v) = env::var("FAILSAFE_QUEUE_NOTIFY_ADD_REMOVE") {
            config.queue.notify_add_remove = parse_bool(&v);
        }

        if let Ok(v) = env::var("FAILSAFE_LOG") {
            config.log_filter = v;
        }

        Ok(config)
    }
}

/// Reads a TOML file without consulting the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, anyhow::Error> {
    let raw: String = fs::read_to_string(path)?;
    let file_cfg: FileConfig = toml::from_str(&raw)?;
    Ok(file_cfg.into_config())
}
