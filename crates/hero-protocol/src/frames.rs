use hero_core::{EventClass, ItemId};
use serde::{Deserialize, Serialize};

use crate::models::{
    ChatMessage, Coordinate, FirstAidRequest, HazardKind, HazardReport, InjuryType, RideRequest,
    Snapshot,
};

/// Client → Server frame. The `type` field is the discriminator.
/// Wire: `{ "type": "report_obstacle", "obstacleType": "Flood", "coordinate": {...}, ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    ChatMessage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        message: String,
    },
    ReportObstacle {
        obstacle_type: HazardKind,
        coordinate: Coordinate,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marker_color: Option<String>,
    },
    RemoveObstacle {
        obstacle_id: ItemId,
    },
    RemoveMessage {
        message_id: ItemId,
    },
    RideRequest {
        coordinate: Coordinate,
        #[serde(default)]
        description: String,
        #[serde(deserialize_with = "crate::models::passengers::deserialize")]
        passengers: u8,
        /// Sender's handle for its optimistic placeholder, echoed back.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
    RemoveRideRequest {
        request_id: ItemId,
    },
    FirstAidRequest {
        request: FirstAidDraft,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
    RemoveFirstAidRequest {
        request_id: ItemId,
    },
}

/// Body of `first_aid_request`, nested under `request` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstAidDraft {
    pub coordinate: Coordinate,
    #[serde(default)]
    pub description: String,
    pub injury_type: InjuryType,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Event class of a creation frame; `None` for removals.
    pub fn creation_class(&self) -> Option<EventClass> {
        match self {
            ClientFrame::ChatMessage { .. } => Some(EventClass::Chat),
            ClientFrame::ReportObstacle { .. } => Some(EventClass::Hazard),
            ClientFrame::RideRequest { .. } => Some(EventClass::Ride),
            ClientFrame::FirstAidRequest { .. } => Some(EventClass::FirstAid),
            _ => None,
        }
    }

    /// Placeholder handle attached by the sender, if any.
    pub fn client_ref(&self) -> Option<&str> {
        match self {
            ClientFrame::RideRequest { client_ref, .. }
            | ClientFrame::FirstAidRequest { client_ref, .. } => client_ref.as_deref(),
            _ => None,
        }
    }

    /// Wire name of the frame kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientFrame::ChatMessage { .. } => "chat_message",
            ClientFrame::ReportObstacle { .. } => "report_obstacle",
            ClientFrame::RemoveObstacle { .. } => "remove_obstacle",
            ClientFrame::RemoveMessage { .. } => "remove_message",
            ClientFrame::RideRequest { .. } => "ride_request",
            ClientFrame::RemoveRideRequest { .. } => "remove_ride_request",
            ClientFrame::FirstAidRequest { .. } => "first_aid_request",
            ClientFrame::RemoveFirstAidRequest { .. } => "remove_first_aid_request",
        }
    }
}

/// Server → Client frame. Everything except `init` and `error` is broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    Init {
        data: Snapshot,
    },
    NewChatMessage {
        message: ChatMessage,
    },
    MessageRemoved {
        message_id: ItemId,
    },
    NewObstacle {
        obstacle: HazardReport,
    },
    ObstacleRemoved {
        obstacle_id: ItemId,
    },
    NewRideRequest {
        request: RideRequest,
        /// The creating connection's `clientRef`. Other participants ignore it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
    RideRequestRemoved {
        request_id: ItemId,
    },
    NewFirstAidRequest {
        request: FirstAidRequest,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
    FirstAidRequestRemoved {
        request_id: ItemId,
    },
    /// Private to the offending connection, never broadcast.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<EventClass>,
        /// `clientRef` of the refused frame.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>, class: Option<EventClass>) -> Self {
        ServerFrame::Error {
            message: message.into(),
            class,
            client_ref: None,
        }
    }

    /// An `error` frame that names the placeholder it refuses.
    pub fn rejection(
        message: impl Into<String>,
        class: Option<EventClass>,
        client_ref: Option<String>,
    ) -> Self {
        ServerFrame::Error {
            message: message.into(),
            class,
            client_ref,
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
