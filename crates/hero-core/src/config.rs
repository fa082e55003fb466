use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const RATE_LIMIT_SECS: u64 = 10; // per connection, per event class
pub const CHAT_HISTORY_LIMIT: usize = 100;
pub const CHAT_MAX_CHARS: usize = 500;
pub const MAX_PASSENGERS: u8 = 8;
pub const RECONNECT_DELAY_SECS: u64 = 5;
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;
/// Frames buffered per connection before it is dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Top-level config (hero.toml + HERO_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeroConfig {
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            auth: AuthConfig::default(),
        }
    }
}

/// The privileged credential. Removal frames are only honored on
/// connections that presented it at upgrade time. There is no default
/// password: until one is configured nobody can remove anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_mode")]
    pub mode: AuthMode,
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Credential,
            username: default_admin_username(),
            password: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Removals require a privileged connection.
    Credential,
    /// Any connection may remove. No server-side authorization at all.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_chat_history")]
    pub chat_history: usize,
    #[serde(default = "default_chat_max_chars")]
    pub chat_max_chars: usize,
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: RATE_LIMIT_SECS,
            chat_history: CHAT_HISTORY_LIMIT,
            chat_max_chars: CHAT_MAX_CHARS,
            outbound_queue: OUTBOUND_QUEUE_CAPACITY,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
        }
    }
}

impl LimitsConfig {
    pub fn cooldown(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cooldown_secs)
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_auth_mode() -> AuthMode {
    AuthMode::Credential
}
fn default_admin_username() -> String {
    "admin".to_string()
}
fn default_cooldown_secs() -> u64 {
    RATE_LIMIT_SECS
}
fn default_chat_history() -> usize {
    CHAT_HISTORY_LIMIT
}
fn default_chat_max_chars() -> usize {
    CHAT_MAX_CHARS
}
fn default_outbound_queue() -> usize {
    OUTBOUND_QUEUE_CAPACITY
}
fn default_max_payload_bytes() -> usize {
    MAX_PAYLOAD_BYTES
}

impl HeroConfig {
    /// Load config from a TOML file with HERO_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.hero/hero.toml
    ///
    /// Nested env keys use a double underscore: `HERO_HUB__PORT=9000`,
    /// `HERO_LIMITS__COOLDOWN_SECS=5`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(path = %path, "loading config");

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::HeroError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(HeroConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("HERO_").split("__"))
    }

    /// Socket address string the hub binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.hub.bind, self.hub.port)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.hero/hero.toml", home)
}
