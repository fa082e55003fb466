use std::time::Duration;

use hero_core::config::{DEFAULT_PORT, RATE_LIMIT_SECS, RECONNECT_DELAY_SECS};
use url::Url;

use crate::error::ClientError;

/// Reconnect attempts after this many are logged at debug instead of info.
/// Retrying itself never stops.
pub const MAX_LOGGED_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `ws://` or `wss://` address of the hub.
    pub url: String,
    /// Author name on outgoing chat messages; the hub substitutes "Anonymous".
    pub display_name: Option<String>,
    /// Privileged credential, sent on the upgrade request when both are set.
    pub username: Option<String>,
    pub password: Option<String>,
    pub reconnect_delay: Duration,
    /// Local submit cooldown per domain. Mirrors the hub's rate limit.
    pub cooldown: Duration,
    pub max_logged_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: format!("ws://localhost:{}/ws", DEFAULT_PORT),
            display_name: None,
            username: None,
            password: None,
            reconnect_delay: Duration::from_secs(RECONNECT_DELAY_SECS),
            cooldown: Duration::from_secs(RATE_LIMIT_SECS),
            max_logged_retries: MAX_LOGGED_RETRIES,
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// The upgrade URL, with `username`/`password` query parameters when
    /// a credential is configured.
    pub fn connect_url(&self) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            url.query_pairs_mut()
                .append_pair("username", username)
                .append_pair("password", password);
        }
        Ok(url)
    }
}
