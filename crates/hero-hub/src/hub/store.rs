use hero_core::ItemId;
use hero_protocol::models::{
    ChatMessage, Coordinate, FirstAidRequest, HazardKind, HazardReport, InjuryType, Record,
    RideRequest, Snapshot,
};
use serde::Serialize;

/// Ordered collection with point removal by id. Insertion order is preserved;
/// nothing is ever reordered.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Record + Clone> Collection<T> {
    fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Append, then evict from the front until `len <= limit`.
    /// Returns how many were evicted.
    fn push_bounded(&mut self, item: T, limit: usize) -> usize {
        self.items.push(item);
        let excess = self.items.len().saturating_sub(limit);
        if excess > 0 {
            self.items.drain(..excess);
        }
        excess
    }

    fn remove(&mut self, id: &ItemId) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

/// Ids are wall-clock milliseconds, bumped past the previous id when two
/// events land in the same millisecond (or the clock steps backwards).
#[derive(Debug, Default)]
struct IdMinter {
    last: i64,
}

impl IdMinter {
    fn mint(&mut self, wall_ms: i64) -> ItemId {
        let next = wall_ms.max(self.last.saturating_add(1));
        self.last = next;
        ItemId(next.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub obstacles: usize,
    pub ride_requests: usize,
    pub first_aid_requests: usize,
    pub chat_messages: usize,
}

/// The canonical state. Mutated only by the event router; everything else
/// reads through the accessors or `snapshot()`.
#[derive(Debug)]
pub struct Store {
    hazards: Collection<HazardReport>,
    rides: Collection<RideRequest>,
    first_aid: Collection<FirstAidRequest>,
    chat: Collection<ChatMessage>,
    chat_limit: usize,
    ids: IdMinter,
}

impl Store {
    pub fn new(chat_limit: usize) -> Self {
        Self {
            hazards: Collection::default(),
            rides: Collection::default(),
            first_aid: Collection::default(),
            chat: Collection::default(),
            chat_limit,
            ids: IdMinter::default(),
        }
    }

    pub fn hazards(&self) -> &Collection<HazardReport> {
        &self.hazards
    }

    pub fn rides(&self) -> &Collection<RideRequest> {
        &self.rides
    }

    pub fn first_aid(&self) -> &Collection<FirstAidRequest> {
        &self.first_aid
    }

    pub fn chat(&self) -> &Collection<ChatMessage> {
        &self.chat
    }

    pub fn counts(&self) -> Counts {
        Counts {
            obstacles: self.hazards.len(),
            ride_requests: self.rides.len(),
            first_aid_requests: self.first_aid.len(),
            chat_messages: self.chat.len(),
        }
    }

    /// Full copy of all four collections, for the `init` frame.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            obstacles: self.hazards.as_slice().to_vec(),
            ride_requests: self.rides.as_slice().to_vec(),
            first_aid_requests: self.first_aid.as_slice().to_vec(),
            chat_messages: self.chat.as_slice().to_vec(),
        }
    }

    pub(crate) fn add_hazard(
        &mut self,
        kind: HazardKind,
        coordinate: Coordinate,
        description: String,
        marker_color: String,
        wall_ms: i64,
    ) -> HazardReport {
        let report = HazardReport {
            id: self.ids.mint(wall_ms),
            kind,
            coordinate,
            description,
            marker_color,
        };
        self.hazards.push(report.clone());
        report
    }

    pub(crate) fn add_ride(
        &mut self,
        coordinate: Coordinate,
        description: String,
        passengers: u8,
        wall_ms: i64,
    ) -> RideRequest {
        let request = RideRequest {
            id: self.ids.mint(wall_ms),
            coordinate,
            description,
            passengers,
        };
        self.rides.push(request.clone());
        request
    }

    pub(crate) fn add_first_aid(
        &mut self,
        coordinate: Coordinate,
        description: String,
        injury_type: InjuryType,
        wall_ms: i64,
    ) -> FirstAidRequest {
        let request = FirstAidRequest {
            id: self.ids.mint(wall_ms),
            coordinate,
            description,
            injury_type,
        };
        self.first_aid.push(request.clone());
        request
    }

    /// Append a chat message, evicting the oldest beyond the history limit.
    pub(crate) fn add_chat(
        &mut self,
        username: String,
        message: String,
        wall_ms: i64,
    ) -> ChatMessage {
        let chat = ChatMessage {
            id: self.ids.mint(wall_ms),
            username,
            message,
            timestamp: wall_ms,
        };
        let evicted = self.chat.push_bounded(chat.clone(), self.chat_limit);
        if evicted > 0 {
            tracing::debug!(evicted, "chat history trimmed");
        }
        chat
    }

    pub(crate) fn remove_hazard(&mut self, id: &ItemId) -> bool {
        self.hazards.remove(id).is_some()
    }

    pub(crate) fn remove_ride(&mut self, id: &ItemId) -> bool {
        self.rides.remove(id).is_some()
    }

    pub(crate) fn remove_first_aid(&mut self, id: &ItemId) -> bool {
        self.first_aid.remove(id).is_some()
    }

    pub(crate) fn remove_chat(&mut self, id: &ItemId) -> bool {
        self.chat.remove(id).is_some()
    }
}
