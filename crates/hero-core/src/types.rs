use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Per-connection identifier (random UUID, not persisted).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of a record inside one collection. Unique within that collection only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unit of rate limiting. Each class has its own cooldown per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    Chat,
    Hazard,
    Ride,
    FirstAid,
}

impl EventClass {
    pub const ALL: [EventClass; 4] = [
        EventClass::Chat,
        EventClass::Hazard,
        EventClass::Ride,
        EventClass::FirstAid,
    ];

    /// Phrase completing "Please wait N seconds before ...".
    pub fn action(&self) -> &'static str {
        match self {
            EventClass::Chat => "sending another message",
            EventClass::Hazard => "reporting another obstacle",
            EventClass::Ride => "submitting another ride request",
            EventClass::FirstAid => "submitting another first aid request",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventClass::Chat => "chat",
            EventClass::Hazard => "hazard",
            EventClass::Ride => "ride",
            EventClass::FirstAid => "first_aid",
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
