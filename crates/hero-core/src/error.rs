use thiserror::Error;

use crate::types::{EventClass, ItemId};

#[derive(Debug, Error)]
pub enum HeroError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or unrecognized frame. Logged and dropped; the connection stays open.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Valid creation frame arriving inside the class cooldown.
    #[error("Rate limited ({class}): retry in {wait_secs}s")]
    RateLimited { class: EventClass, wait_secs: u64 },

    /// Removal of an id that is not in the collection. Treated as success.
    #[error("{class} item not found: {id}")]
    NotFound { class: EventClass, id: ItemId },

    #[error("Not authorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HeroError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            HeroError::Config(_) => "CONFIG_ERROR",
            HeroError::Protocol(_) => "PROTOCOL_ERROR",
            HeroError::RateLimited { .. } => "RATE_LIMITED",
            HeroError::NotFound { .. } => "NOT_FOUND",
            HeroError::Unauthorized { .. } => "UNAUTHORIZED",
            HeroError::ConnectionLost(_) => "CONNECTION_LOST",
            HeroError::Serialization(_) => "SERIALIZATION_ERROR",
            HeroError::Io(_) => "IO_ERROR",
            HeroError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            HeroError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Text for the private `error` frame, or `None` when the error is
    /// never reported back to the sender.
    pub fn client_message(&self) -> Option<String> {
        match self {
            HeroError::RateLimited { class, wait_secs } => Some(format!(
                "Please wait {} seconds before {}",
                wait_secs,
                class.action()
            )),
            HeroError::Unauthorized { reason } => Some(format!("Not authorized: {}", reason)),
            _ => None,
        }
    }

    /// Event class the error refers to, if any.
    pub fn class(&self) -> Option<EventClass> {
        match self {
            HeroError::RateLimited { class, .. } | HeroError::NotFound { class, .. } => {
                Some(*class)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HeroError>;
