//! Application configuration structs
//!
//! Loads configuration from an optional `config/totalk.yaml` file layered under
//! `TOTALK__*` environment variables (e.g. `TOTALK__GATEWAY__PORT=8081`).

use serde::Deserialize;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub gateway: ServerConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub hubs: HubSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    /// PostgreSQL checkpointing; in-memory repositories are used when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Redis pub/sub event source; disabled when absent
    #[serde(default)]
    pub redis: Option<RedisConfig>,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: Environment::default(),
        }
    }
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-session transport limits and keepalive timing
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Capacity of each session's outbound buffer
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// Silence allowed on the inbound side before the session is torn down
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Join pending outbound messages into one newline-separated frame
    #[serde(default)]
    pub coalesce: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: default_outbound_buffer(),
            ping_interval_ms: default_ping_interval_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            max_message_size: default_max_message_size(),
            coalesce: false,
        }
    }
}

impl SessionSettings {
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Check the keepalive timing is coherent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "session.outbound_buffer",
                "must be greater than zero".to_string(),
            ));
        }
        if self.ping_interval_ms == 0 || self.read_timeout_ms <= self.ping_interval_ms {
            return Err(ConfigError::InvalidValue(
                "session.read_timeout_ms",
                format!(
                    "must exceed a non-zero ping interval ({} <= {})",
                    self.read_timeout_ms, self.ping_interval_ms
                ),
            ));
        }
        Ok(())
    }
}

/// Which key a hub registers sessions under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// At most one live session per user; a reconnect replaces the old one
    PerUser,
    /// Every connection is its own key; a user may hold several
    PerConnection,
}

/// Hub wiring options
#[derive(Debug, Clone, Deserialize)]
pub struct HubSettings {
    #[serde(default = "default_notify_key_policy")]
    pub notify_key_policy: KeyPolicy,
    #[serde(default = "default_chat_key_policy")]
    pub chat_key_policy: KeyPolicy,
    /// Messages replayed into a chat session before it is registered
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Capacity of the dispatcher's inbound event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            notify_key_policy: default_notify_key_policy(),
            chat_key_policy: default_chat_key_policy(),
            history_limit: default_history_limit(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Stored notification delivery
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    /// How often scheduled notifications are checked for being due
    #[serde(default = "default_schedule_interval_ms")]
    pub schedule_interval_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            schedule_interval_ms: default_schedule_interval_ms(),
        }
    }
}

impl NotificationSettings {
    #[must_use]
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_millis(self.schedule_interval_ms)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Directory of SQL migrations applied at startup
    #[serde(default)]
    pub migrations_dir: Option<String>,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_channel")]
    pub channel: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

// Default value functions
fn default_app_name() -> String {
    "totalk".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_ping_interval_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    60_000
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_max_message_size() -> usize {
    512
}

fn default_notify_key_policy() -> KeyPolicy {
    KeyPolicy::PerUser
}

fn default_chat_key_policy() -> KeyPolicy {
    KeyPolicy::PerConnection
}

fn default_history_limit() -> usize {
    100
}

fn default_event_buffer() -> usize {
    1024
}

fn default_schedule_interval_ms() -> u64 {
    60_000
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_redis_channel() -> String {
    "totalk:events".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

impl AppConfig {
    /// Load configuration from `config/totalk.*` and the environment
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or a value is out of range
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/totalk").required(false))
            .add_source(
                config::Environment::with_prefix("TOTALK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        if self.hubs.history_limit > self.session.outbound_buffer {
            return Err(ConfigError::InvalidValue(
                "hubs.history_limit",
                format!(
                    "must not exceed session.outbound_buffer ({})",
                    self.session.outbound_buffer
                ),
            ));
        }
        if self.hubs.event_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "hubs.event_buffer",
                "must be greater than zero".to_string(),
            ));
        }
        if self.notifications.schedule_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "notifications.schedule_interval_ms",
                "must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
