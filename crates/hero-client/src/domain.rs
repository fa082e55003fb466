//! The four mirrored domains. Each marker type ties a record type to its
//! frames, so one `Layer<D>` implementation serves all of them.

use hero_core::config::{CHAT_HISTORY_LIMIT, MAX_PASSENGERS};
use hero_core::{EventClass, ItemId};
use hero_protocol::frames::{ClientFrame, FirstAidDraft};
use hero_protocol::models::{
    ChatMessage, Coordinate, FirstAidRequest, HazardKind, HazardReport, Record, RideRequest,
};

use crate::layer::{Layer, Mirrors};

pub trait Domain: Sized + Send + 'static {
    type Item: Record + Clone + std::fmt::Debug + Send + 'static;
    type Draft;

    const CLASS: EventClass;
    /// Local mirror bound; the oldest entries are dropped past it.
    const LIMIT: Option<usize> = None;

    /// The hub's acceptance rules, applied before anything is sent. A draft
    /// the hub would drop silently must never reach the mirror.
    fn validate(_draft: &Self::Draft) -> Result<(), String> {
        Ok(())
    }

    /// `client_ref` is set only for domains with a placeholder; the hub echoes
    /// it on the confirming broadcast.
    fn creation_frame(
        draft: &Self::Draft,
        author: Option<&str>,
        client_ref: Option<String>,
    ) -> ClientFrame;

    fn removal_frame(id: ItemId) -> ClientFrame;

    /// Record shown locally until the hub's broadcast confirms it.
    /// Domains without optimistic insertion return `None`.
    fn placeholder(_draft: &Self::Draft, _id: ItemId) -> Option<Self::Item> {
        None
    }

    fn layer(mirrors: &Mirrors) -> &Layer<Self>;

    fn layer_mut(mirrors: &mut Mirrors) -> &mut Layer<Self>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HazardDraft {
    pub kind: HazardKind,
    pub coordinate: Coordinate,
    pub description: String,
    /// Falls back to the kind's color on the hub.
    pub marker_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RideDraft {
    pub coordinate: Coordinate,
    pub description: String,
    pub passengers: u8,
}

pub struct Hazards;
pub struct Rides;
pub struct FirstAid;
pub struct Chat;

impl Domain for Hazards {
    type Item = HazardReport;
    type Draft = HazardDraft;
    const CLASS: EventClass = EventClass::Hazard;

    fn validate(draft: &HazardDraft) -> Result<(), String> {
        check_coordinate(&draft.coordinate)
    }

    fn creation_frame(
        draft: &HazardDraft,
        _author: Option<&str>,
        _client_ref: Option<String>,
    ) -> ClientFrame {
        ClientFrame::ReportObstacle {
            obstacle_type: draft.kind,
            coordinate: draft.coordinate,
            description: draft.description.clone(),
            marker_color: draft.marker_color.clone(),
        }
    }

    fn removal_frame(obstacle_id: ItemId) -> ClientFrame {
        ClientFrame::RemoveObstacle { obstacle_id }
    }

    fn layer(mirrors: &Mirrors) -> &Layer<Self> {
        &mirrors.hazards
    }

    fn layer_mut(mirrors: &mut Mirrors) -> &mut Layer<Self> {
        &mut mirrors.hazards
    }
}

impl Domain for Rides {
    type Item = RideRequest;
    type Draft = RideDraft;
    const CLASS: EventClass = EventClass::Ride;

    fn validate(draft: &RideDraft) -> Result<(), String> {
        check_coordinate(&draft.coordinate)?;
        if !(1..=MAX_PASSENGERS).contains(&draft.passengers) {
            return Err(format!(
                "passenger count {} outside 1..={}",
                draft.passengers, MAX_PASSENGERS
            ));
        }
        Ok(())
    }

    fn creation_frame(
        draft: &RideDraft,
        _author: Option<&str>,
        client_ref: Option<String>,
    ) -> ClientFrame {
        ClientFrame::RideRequest {
            coordinate: draft.coordinate,
            description: draft.description.clone(),
            passengers: draft.passengers,
            client_ref,
        }
    }

    fn removal_frame(request_id: ItemId) -> ClientFrame {
        ClientFrame::RemoveRideRequest { request_id }
    }

    fn placeholder(draft: &RideDraft, id: ItemId) -> Option<RideRequest> {
        Some(RideRequest {
            id,
            coordinate: draft.coordinate,
            description: draft.description.clone(),
            passengers: draft.passengers,
        })
    }

    fn layer(mirrors: &Mirrors) -> &Layer<Self> {
        &mirrors.rides
    }

    fn layer_mut(mirrors: &mut Mirrors) -> &mut Layer<Self> {
        &mut mirrors.rides
    }
}

impl Domain for FirstAid {
    type Item = FirstAidRequest;
    type Draft = FirstAidDraft;
    const CLASS: EventClass = EventClass::FirstAid;

    fn validate(draft: &FirstAidDraft) -> Result<(), String> {
        check_coordinate(&draft.coordinate)
    }

    fn creation_frame(
        draft: &FirstAidDraft,
        _author: Option<&str>,
        client_ref: Option<String>,
    ) -> ClientFrame {
        ClientFrame::FirstAidRequest {
            request: draft.clone(),
            client_ref,
        }
    }

    fn removal_frame(request_id: ItemId) -> ClientFrame {
        ClientFrame::RemoveFirstAidRequest { request_id }
    }

    fn placeholder(draft: &FirstAidDraft, id: ItemId) -> Option<FirstAidRequest> {
        Some(FirstAidRequest {
            id,
            coordinate: draft.coordinate,
            description: draft.description.clone(),
            injury_type: draft.injury_type,
        })
    }

    fn layer(mirrors: &Mirrors) -> &Layer<Self> {
        &mirrors.first_aid
    }

    fn layer_mut(mirrors: &mut Mirrors) -> &mut Layer<Self> {
        &mut mirrors.first_aid
    }
}

impl Domain for Chat {
    type Item = ChatMessage;
    /// The message text.
    type Draft = String;
    const CLASS: EventClass = EventClass::Chat;
    const LIMIT: Option<usize> = Some(CHAT_HISTORY_LIMIT);

    fn validate(message: &String) -> Result<(), String> {
        if message.trim().is_empty() {
            return Err("empty chat message".to_string());
        }
        Ok(())
    }

    fn creation_frame(message: &String, author: Option<&str>, _: Option<String>) -> ClientFrame {
        ClientFrame::ChatMessage {
            username: author.map(String::from),
            message: message.trim().to_string(),
        }
    }

    fn removal_frame(message_id: ItemId) -> ClientFrame {
        ClientFrame::RemoveMessage { message_id }
    }

    fn layer(mirrors: &Mirrors) -> &Layer<Self> {
        &mirrors.chat
    }

    fn layer_mut(mirrors: &mut Mirrors) -> &mut Layer<Self> {
        &mut mirrors.chat
    }
}

fn check_coordinate(coordinate: &Coordinate) -> Result<(), String> {
    if coordinate.is_valid() {
        Ok(())
    } else {
        Err(format!(
            "coordinate out of range: {}, {}",
            coordinate.lat, coordinate.lon
        ))
    }
}
