use hero_core::EventClass;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No open connection. Nothing is queued for later.
    #[error("Not connected to the hub")]
    Disconnected,

    /// Local cooldown still running; nothing was sent.
    #[error("Please wait {wait_secs} seconds before {}", .class.action())]
    CoolingDown { class: EventClass, wait_secs: u64 },

    /// The hub would drop this draft; nothing was sent or shown.
    #[error("Invalid {class} draft: {reason}")]
    InvalidDraft { class: EventClass, reason: String },

    #[error("Invalid hub URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Disconnected => "DISCONNECTED",
            ClientError::CoolingDown { .. } => "COOLING_DOWN",
            ClientError::InvalidDraft { .. } => "INVALID_DRAFT",
            ClientError::InvalidUrl(_) => "INVALID_URL",
            ClientError::Transport(_) => "TRANSPORT_ERROR",
            ClientError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
