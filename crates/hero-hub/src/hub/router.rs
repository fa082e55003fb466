//! Event router: the single mutation point for canonical state.
//!
//! Each inbound frame is validated, rate limited (creation frames only),
//! authorized (removal frames only), applied to the store, and turned into
//! the event that will be broadcast. Any `Err` means the store was not touched.

use std::time::Instant;

use hero_core::config::{AuthMode, MAX_PASSENGERS};
use hero_core::{EventClass, HeroError, ItemId};
use hero_protocol::frames::{ClientFrame, FirstAidDraft, ServerFrame};
use hero_protocol::models::Coordinate;

use super::rate_limit::RateLimitPolicy;
use super::registry::Connection;
use super::store::Store;

pub const ANONYMOUS: &str = "Anonymous";

/// Policy knobs the router applies to every frame.
#[derive(Debug, Clone)]
pub struct Rules {
    pub policy: RateLimitPolicy,
    pub auth_mode: AuthMode,
    pub chat_max_chars: usize,
}

pub fn route(
    frame: ClientFrame,
    sender: &mut Connection,
    store: &mut Store,
    rules: &Rules,
    now: Instant,
    wall_ms: i64,
) -> Result<ServerFrame, HeroError> {
    match frame {
        ClientFrame::ChatMessage { username, message } => {
            let message = bound_chat_text(message, rules.chat_max_chars)?;
            let username = username
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| ANONYMOUS.to_string());
            rules
                .policy
                .check_and_update(&mut sender.clock, EventClass::Chat, now)?;
            let message = store.add_chat(username, message, wall_ms);
            Ok(ServerFrame::NewChatMessage { message })
        }

        ClientFrame::ReportObstacle {
            obstacle_type,
            coordinate,
            description,
            marker_color,
        } => {
            check_coordinate(&coordinate)?;
            let marker_color = marker_color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| obstacle_type.default_color().to_string());
            rules
                .policy
                .check_and_update(&mut sender.clock, EventClass::Hazard, now)?;
            let obstacle =
                store.add_hazard(obstacle_type, coordinate, description, marker_color, wall_ms);
            Ok(ServerFrame::NewObstacle { obstacle })
        }

        ClientFrame::RideRequest {
            coordinate,
            description,
            passengers,
            client_ref,
        } => {
            check_coordinate(&coordinate)?;
            if !(1..=MAX_PASSENGERS).contains(&passengers) {
                return Err(HeroError::Protocol(format!(
                    "passenger count {} outside 1..={}",
                    passengers, MAX_PASSENGERS
                )));
            }
            rules
                .policy
                .check_and_update(&mut sender.clock, EventClass::Ride, now)?;
            let request = store.add_ride(coordinate, description, passengers, wall_ms);
            Ok(ServerFrame::NewRideRequest {
                request,
                client_ref,
            })
        }

        ClientFrame::FirstAidRequest {
            request:
                FirstAidDraft {
                    coordinate,
                    description,
                    injury_type,
                },
            client_ref,
        } => {
            check_coordinate(&coordinate)?;
            rules
                .policy
                .check_and_update(&mut sender.clock, EventClass::FirstAid, now)?;
            let request = store.add_first_aid(coordinate, description, injury_type, wall_ms);
            Ok(ServerFrame::NewFirstAidRequest {
                request,
                client_ref,
            })
        }

        ClientFrame::RemoveObstacle { obstacle_id } => {
            authorize(sender, rules, "remove obstacles")?;
            removed(store.remove_hazard(&obstacle_id), EventClass::Hazard, obstacle_id)
                .map(|obstacle_id| ServerFrame::ObstacleRemoved { obstacle_id })
        }

        ClientFrame::RemoveMessage { message_id } => {
            authorize(sender, rules, "remove messages")?;
            removed(store.remove_chat(&message_id), EventClass::Chat, message_id)
                .map(|message_id| ServerFrame::MessageRemoved { message_id })
        }

        ClientFrame::RemoveRideRequest { request_id } => {
            authorize(sender, rules, "remove ride requests")?;
            removed(store.remove_ride(&request_id), EventClass::Ride, request_id)
                .map(|request_id| ServerFrame::RideRequestRemoved { request_id })
        }

        ClientFrame::RemoveFirstAidRequest { request_id } => {
            authorize(sender, rules, "remove first aid requests")?;
            removed(store.remove_first_aid(&request_id), EventClass::FirstAid, request_id)
                .map(|request_id| ServerFrame::FirstAidRequestRemoved { request_id })
        }
    }
}

fn removed(hit: bool, class: EventClass, id: ItemId) -> Result<ItemId, HeroError> {
    if hit {
        Ok(id)
    } else {
        Err(HeroError::NotFound { class, id })
    }
}

fn authorize(sender: &Connection, rules: &Rules, what: &str) -> Result<(), HeroError> {
    match rules.auth_mode {
        AuthMode::None => Ok(()),
        AuthMode::Credential if sender.privileged => Ok(()),
        AuthMode::Credential => Err(HeroError::Unauthorized {
            reason: format!("only a privileged participant may {}", what),
        }),
    }
}

fn check_coordinate(coordinate: &Coordinate) -> Result<(), HeroError> {
    if coordinate.is_valid() {
        Ok(())
    } else {
        Err(HeroError::Protocol(format!(
            "coordinate out of range: {}, {}",
            coordinate.lat, coordinate.lon
        )))
    }
}

/// Blank text is rejected; anything past `max_chars` characters is cut off.
fn bound_chat_text(message: String, max_chars: usize) -> Result<String, HeroError> {
    if message.trim().is_empty() {
        return Err(HeroError::Protocol("empty chat message".to_string()));
    }
    match message.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut message = message;
            message.truncate(cut);
            Ok(message)
        }
        None => Ok(message),
    }
}
