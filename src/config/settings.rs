use serde::Deserialize;

use crate::domain::EvictionPolicy;

/// Cache configuration, loaded from files and environment
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CacheSettings {
    /// Per-domain cache policies
    #[serde(default)]
    pub policies: Vec<PolicySettings>,
    /// Configured store clients, in resolution order
    #[serde(default)]
    pub clients: Vec<ClientSettings>,
    /// Client key used when callers do not name one
    #[serde(default)]
    pub default_client: Option<String>,
    #[serde(default)]
    pub invalidation: InvalidationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicySettings {
    pub domain: String,
    pub key_prefix: String,
    #[serde(default)]
    pub key_suffix: Option<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default)]
    pub eviction: EvictionPolicy,
    #[serde(default)]
    pub hit_threshold_alert: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    /// Redis connection URL; clients without one rely on the in-memory
    /// fallback
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvalidationSettings {
    /// Delay between the two deletes of an invalidation
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Distributed lock hold duration
    #[serde(default = "default_lock_duration_ms")]
    pub lock_duration_ms: u64,
    /// Fail the invalidation when the notification publish fails
    #[serde(default)]
    pub notification_critical: bool,
    /// Base pub/sub channel for cache events
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for InvalidationSettings {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            lock_duration_ms: default_lock_duration_ms(),
            notification_critical: false,
            channel: default_channel(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

fn default_separator() -> String {
    ":".to_string()
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_delay_ms() -> u64 {
    500
}

fn default_lock_duration_ms() -> u64 {
    10_000
}

fn default_channel() -> String {
    "cache:events".to_string()
}

impl CacheSettings {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("CACHE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
