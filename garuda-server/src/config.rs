//! Configuration management: TOML file plus environment variable overrides,
//! validated at load. Structure and validation style follow the
//! `Config`/`validate_schema`/`apply_env_overrides` split this crate's
//! gateway ancestor used, generalized from gateway/provider settings to
//! SDK bundles, channels, and plugins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which SDK bundles to load and which one is the default.
    pub sdks: SdksConfig,
    /// Session/event-queue store backend.
    pub redis: RedisConfig,
    /// Channels to start, by identifier.
    pub channels: Vec<ChannelConfig>,
    /// Plugins to load, by kind and identifier.
    pub plugins: Vec<PluginConfig>,
    /// Additional, host-application-specific controller classes to attach
    /// alongside the core five (mirrors `additional_controller_classes` in
    /// the original system; this implementation treats the list as purely
    /// descriptive metadata since controller composition is static in Rust).
    #[serde(default)]
    pub additional_controllers: Vec<String>,
    pub logging: LoggingConfig,
    pub runloop: RunloopConfig,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdksConfig {
    pub default_bundle: String,
    #[serde(default)]
    pub bundles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(with = "duration_secs")]
    pub default_session_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub identifier: String,
    pub kind: String,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    pub kind: PluginKind,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    Authentication,
    Storage,
    Permissions,
    Logic,
    Channel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunloopConfig {
    /// How long the Logic Controller waits for a delegate before treating it
    /// as failed.
    #[serde(with = "duration_secs")]
    pub delegate_timeout: Duration,
    /// Timeout passed to `PushController::get_next_event` when the channel
    /// doesn't override it.
    #[serde(with = "duration_secs")]
    pub push_poll_timeout: Duration,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(url) = env::var("GARUDA_REDIS_URL") {
            if !url.is_empty() {
                self.redis.url = url;
            }
        }
        if let Ok(level) = env::var("GARUDA_LOG_LEVEL") {
            let valid = ["trace", "debug", "info", "warn", "error"];
            if !valid.contains(&level.as_str()) {
                return Err(anyhow::anyhow!(
                    "invalid GARUDA_LOG_LEVEL: {level}. use one of {valid:?}"
                ));
            }
            self.logging.level = level;
        }
        if let Ok(debug) = env::var("GARUDA_DEBUG") {
            self.debug = debug.parse().unwrap_or(false);
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sdks.default_bundle.is_empty() {
            return Err(anyhow::anyhow!("sdks.default_bundle cannot be empty"));
        }
        if self.redis.url.is_empty() {
            return Err(anyhow::anyhow!("redis.url cannot be empty"));
        }
        if !self.redis.url.starts_with("redis://") && !self.redis.url.starts_with("rediss://") {
            return Err(anyhow::anyhow!(
                "redis.url must start with redis:// or rediss://, got {}",
                self.redis.url
            ));
        }
        if self.redis.default_session_ttl.as_secs() == 0 {
            return Err(anyhow::anyhow!("redis.default_session_ttl cannot be 0"));
        }
        if self.channels.is_empty() {
            return Err(anyhow::anyhow!("at least one channel must be configured"));
        }
        let mut seen = std::collections::HashSet::new();
        for channel in &self.channels {
            if channel.identifier.is_empty() {
                return Err(anyhow::anyhow!("channel identifier cannot be empty"));
            }
            if !seen.insert(&channel.identifier) {
                return Err(anyhow::anyhow!(
                    "duplicate channel identifier: {}",
                    channel.identifier
                ));
            }
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "invalid logging.level: {}. use one of {:?}",
                self.logging.level,
                valid_levels
            ));
        }
        if self.runloop.delegate_timeout.as_secs() == 0 {
            return Err(anyhow::anyhow!("runloop.delegate_timeout cannot be 0"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sdks: SdksConfig {
                default_bundle: "reference".to_string(),
                bundles: vec!["reference".to_string()],
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
                default_session_ttl: Duration::from_secs(3600),
            },
            channels: vec![ChannelConfig {
                identifier: "loopback".to_string(),
                kind: "loopback".to_string(),
                config: HashMap::new(),
            }],
            plugins: vec![],
            additional_controllers: vec![],
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            runloop: RunloopConfig {
                delegate_timeout: Duration::from_secs(2),
                push_poll_timeout: Duration::from_secs(30),
            },
            banner: None,
            debug: false,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_channel_list() {
        let mut config = Config::default();
        config.channels.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_channel_identifiers() {
        let mut config = Config::default();
        config.channels.push(config.channels[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_redis_url() {
        let mut config = Config::default();
        config.redis.url = "http://localhost".to_string();
        assert!(config.validate().is_err());
    }
}
