use std::marker::PhantomData;
use std::time::{Duration, Instant};

use hero_core::{EventClass, ItemId};
use hero_protocol::frames::{ClientFrame, ServerFrame};
use hero_protocol::models::Record;
use tracing::debug;

use crate::cooldown::SubmitCooldown;
use crate::domain::{Chat, Domain, FirstAid, Hazards, Rides};
use crate::error::ClientError;

/// Local mirror of one domain's collection.
///
/// Incoming records are de-duplicated by id in every domain. For domains with
/// optimistic insertion, a broadcast that echoes a pending placeholder's id as
/// its `clientRef` takes the placeholder's slot instead of being appended.
pub struct Layer<D: Domain> {
    items: Vec<D::Item>,
    /// Placeholder ids still waiting for confirmation, oldest first.
    pending: Vec<ItemId>,
    cooldown: SubmitCooldown,
    _domain: PhantomData<D>,
}

/// Undo information for a `begin_submit` whose frame could not be sent.
#[derive(Debug)]
pub struct Submission {
    previous_stamp: Option<Instant>,
    placeholder: Option<ItemId>,
}

impl<D: Domain> Layer<D> {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            items: Vec::new(),
            pending: Vec::new(),
            cooldown: SubmitCooldown::new(cooldown),
            _domain: PhantomData,
        }
    }

    pub fn items(&self) -> &[D::Item] {
        &self.items
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// `init`: the hub's collection replaces the mirror wholesale.
    pub fn replace(&mut self, items: Vec<D::Item>) {
        self.items = items;
        self.pending.clear();
        self.enforce_limit();
    }

    /// `new_*`: returns false when the record was already present.
    ///
    /// `client_ref` is the echo of one of our own submissions, if the
    /// broadcast carries one.
    pub fn insert(&mut self, item: D::Item, client_ref: Option<&str>) -> bool {
        if self.items.iter().any(|existing| existing.id() == item.id()) {
            return false;
        }

        let slot = self
            .take_pending(client_ref)
            .and_then(|pending_id| self.items.iter().position(|p| *p.id() == pending_id));
        match slot {
            Some(index) => {
                debug!(
                    class = %D::CLASS,
                    placeholder = %self.items[index].id(),
                    id = %item.id(),
                    "placeholder confirmed"
                );
                self.items[index] = item;
            }
            None => {
                self.items.push(item);
                self.enforce_limit();
            }
        }
        true
    }

    /// `*_removed`: drop the record with this id, if present.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        self.pending.retain(|pending_id| pending_id != id);
        self.items.len() != before
    }

    /// Validate the draft, check the local cooldown, stamp it, insert a
    /// placeholder where the domain is optimistic, and build the frame to
    /// send. The placeholder's id goes out as the frame's `clientRef`.
    pub fn begin_submit(
        &mut self,
        draft: &D::Draft,
        author: Option<&str>,
        now: Instant,
    ) -> Result<(ClientFrame, Submission), ClientError> {
        D::validate(draft).map_err(|reason| ClientError::InvalidDraft {
            class: D::CLASS,
            reason,
        })?;
        if let Some(wait_secs) = self.cooldown.remaining(now) {
            return Err(ClientError::CoolingDown {
                class: D::CLASS,
                wait_secs,
            });
        }

        let previous_stamp = self.cooldown.stamp(now);

        let temp_id = ItemId(format!("pending-{}", uuid::Uuid::new_v4()));
        let placeholder = D::placeholder(draft, temp_id.clone()).map(|item| {
            self.items.push(item);
            self.pending.push(temp_id.clone());
            temp_id
        });
        let client_ref = placeholder.as_ref().map(|id| id.as_str().to_owned());
        let frame = D::creation_frame(draft, author, client_ref);

        Ok((
            frame,
            Submission {
                previous_stamp,
                placeholder,
            },
        ))
    }

    /// Roll back a submission that never reached the socket.
    pub fn abort_submit(&mut self, submission: Submission) {
        self.cooldown.restore(submission.previous_stamp);
        if let Some(id) = submission.placeholder {
            self.remove(&id);
        }
    }

    /// The hub refused a submission: retract its placeholder. Without a
    /// `client_ref` the newest placeholder is the one refused.
    pub fn reject_pending(&mut self, client_ref: Option<&str>) -> Option<D::Item> {
        let id = match client_ref {
            Some(_) => self.take_pending(client_ref)?,
            None => self.pending.pop()?,
        };
        let index = self.items.iter().position(|item| *item.id() == id)?;
        Some(self.items.remove(index))
    }

    fn take_pending(&mut self, client_ref: Option<&str>) -> Option<ItemId> {
        let client_ref = client_ref?;
        let index = self.pending.iter().position(|id| id.as_str() == client_ref)?;
        Some(self.pending.remove(index))
    }

    fn enforce_limit(&mut self) {
        let Some(limit) = D::LIMIT else {
            return;
        };
        let excess = self.items.len().saturating_sub(limit);
        if excess > 0 {
            self.items.drain(..excess);
            let items = &self.items;
            self.pending
                .retain(|pending_id| items.iter().any(|item| item.id() == pending_id));
        }
    }
}

/// A server `error` frame, surfaced to the participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub class: Option<EventClass>,
    pub message: String,
}

/// All four layers, fed from one connection.
pub struct Mirrors {
    pub(crate) hazards: Layer<Hazards>,
    pub(crate) rides: Layer<Rides>,
    pub(crate) first_aid: Layer<FirstAid>,
    pub(crate) chat: Layer<Chat>,
}

impl Mirrors {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            hazards: Layer::new(cooldown),
            rides: Layer::new(cooldown),
            first_aid: Layer::new(cooldown),
            chat: Layer::new(cooldown),
        }
    }

    pub fn layer<D: Domain>(&self) -> &Layer<D> {
        D::layer(self)
    }

    pub fn layer_mut<D: Domain>(&mut self) -> &mut Layer<D> {
        D::layer_mut(self)
    }

    /// Route one server frame to the layer it belongs to. Returns the
    /// advisory carried by an `error` frame.
    pub fn apply(&mut self, frame: ServerFrame) -> Option<Advisory> {
        match frame {
            ServerFrame::Init { data } => {
                self.hazards.replace(data.obstacles);
                self.rides.replace(data.ride_requests);
                self.first_aid.replace(data.first_aid_requests);
                self.chat.replace(data.chat_messages);
            }
            ServerFrame::NewObstacle { obstacle } => {
                self.hazards.insert(obstacle, None);
            }
            ServerFrame::ObstacleRemoved { obstacle_id } => {
                self.hazards.remove(&obstacle_id);
            }
            ServerFrame::NewRideRequest {
                request,
                client_ref,
            } => {
                self.rides.insert(request, client_ref.as_deref());
            }
            ServerFrame::RideRequestRemoved { request_id } => {
                self.rides.remove(&request_id);
            }
            ServerFrame::NewFirstAidRequest {
                request,
                client_ref,
            } => {
                self.first_aid.insert(request, client_ref.as_deref());
            }
            ServerFrame::FirstAidRequestRemoved { request_id } => {
                self.first_aid.remove(&request_id);
            }
            ServerFrame::NewChatMessage { message } => {
                self.chat.insert(message, None);
            }
            ServerFrame::MessageRemoved { message_id } => {
                self.chat.remove(&message_id);
            }
            ServerFrame::Error {
                message,
                class,
                client_ref,
            } => {
                let client_ref = client_ref.as_deref();
                let retracted = match class {
                    Some(EventClass::Hazard) => self.hazards.reject_pending(client_ref).is_some(),
                    Some(EventClass::Ride) => self.rides.reject_pending(client_ref).is_some(),
                    Some(EventClass::FirstAid) => {
                        self.first_aid.reject_pending(client_ref).is_some()
                    }
                    Some(EventClass::Chat) => self.chat.reject_pending(client_ref).is_some(),
                    None => false,
                };
                debug!(?class, retracted, "hub refused a frame");
                return Some(Advisory { class, message });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HazardDraft, RideDraft};
    use hero_protocol::models::{
        ChatMessage, Coordinate, HazardKind, HazardReport, RideRequest, Snapshot,
    };

    const COOLDOWN: Duration = Duration::from_secs(10);

    fn ride_draft() -> RideDraft {
        RideDraft {
            coordinate: Coordinate::new(43.0, -81.2),
            description: "two bags".into(),
            passengers: 2,
        }
    }

    fn confirmed_ride(id: &str) -> RideRequest {
        RideRequest {
            id: ItemId::from(id),
            coordinate: Coordinate::new(43.0, -81.2),
            description: "two bags".into(),
            passengers: 2,
        }
    }

    fn hazard(id: &str) -> HazardReport {
        HazardReport {
            id: ItemId::from(id),
            kind: HazardKind::Debris,
            coordinate: Coordinate::new(1.0, 1.0),
            description: String::new(),
            marker_color: "#5D4037".into(),
        }
    }

    fn chat(id: i64) -> ChatMessage {
        ChatMessage {
            id: ItemId(id.to_string()),
            username: "u".into(),
            message: format!("m{id}"),
            timestamp: id,
        }
    }

    /// Submit a ride and return the `clientRef` it was sent with.
    fn submit(layer: &mut Layer<Rides>, draft: &RideDraft, now: Instant) -> String {
        let (frame, _) = layer.begin_submit(draft, None, now).unwrap();
        frame.client_ref().expect("rides carry a client ref").to_owned()
    }

    #[test]
    fn self_echo_replaces_placeholder_instead_of_duplicating() {
        // Appending every broadcast unconditionally would leave both the
        // placeholder and the confirmed record here.
        let mut layer = Layer::<Rides>::new(COOLDOWN);
        let client_ref = submit(&mut layer, &ride_draft(), Instant::now());
        assert_eq!(layer.items().len(), 1);
        assert_eq!(layer.items()[0].id.as_str(), client_ref);

        assert!(layer.insert(confirmed_ride("1700000000000"), Some(client_ref.as_str())));
        assert_eq!(layer.items().len(), 1);
        assert_eq!(layer.items()[0].id.as_str(), "1700000000000");
        assert_eq!(layer.pending_count(), 0);
    }

    #[test]
    fn echo_matches_even_when_the_coordinate_comes_back_altered() {
        let mut layer = Layer::<Rides>::new(COOLDOWN);
        let mut draft = ride_draft();
        draft.coordinate = Coordinate::new(13.346133595589677, -81.23456789012345);
        let client_ref = submit(&mut layer, &draft, Instant::now());

        // last digit off, as a lossy float parse would return it
        let mut echoed = confirmed_ride("1");
        echoed.coordinate = Coordinate::new(13.346133595589675, -81.23456789012345);
        assert!(layer.insert(echoed, Some(client_ref.as_str())));
        assert_eq!(layer.items().len(), 1);
        assert_eq!(layer.pending_count(), 0);
    }

    #[test]
    fn full_precision_coordinate_survives_the_wire() {
        let mut mirrors = Mirrors::new(COOLDOWN);
        let mut draft = ride_draft();
        draft.coordinate = Coordinate::new(13.346133595589677, -81.23456789012345);
        let (frame, _) = mirrors
            .layer_mut::<Rides>()
            .begin_submit(&draft, None, Instant::now())
            .unwrap();

        // what the hub would parse, then broadcast back
        let sent = ClientFrame::parse(&serde_json::to_string(&frame).unwrap()).unwrap();
        let ClientFrame::RideRequest {
            coordinate,
            client_ref,
            ..
        } = sent
        else {
            panic!("expected ride_request");
        };
        let mut request = confirmed_ride("1");
        request.coordinate = coordinate;
        let echo = ServerFrame::NewRideRequest {
            request,
            client_ref,
        };
        let echo = ServerFrame::parse(&echo.to_text().unwrap()).unwrap();
        mirrors.apply(echo);

        let rides = mirrors.layer::<Rides>().items();
        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0].id.as_str(), "1");
        assert_eq!(rides[0].coordinate, draft.coordinate);
    }

    #[test]
    fn identical_content_from_someone_else_is_appended() {
        let mut layer = Layer::<Rides>::new(COOLDOWN);
        submit(&mut layer, &ride_draft(), Instant::now());

        assert!(layer.insert(confirmed_ride("42"), None));
        assert_eq!(layer.items().len(), 2);
        assert_eq!(layer.pending_count(), 1);
    }

    #[test]
    fn duplicate_ids_are_ignored_in_every_domain() {
        let mut hazards = Layer::<Hazards>::new(COOLDOWN);
        assert!(hazards.insert(hazard("7"), None));
        assert!(!hazards.insert(hazard("7"), None));
        assert_eq!(hazards.items().len(), 1);

        let mut rides = Layer::<Rides>::new(COOLDOWN);
        assert!(rides.insert(confirmed_ride("9"), None));
        assert!(!rides.insert(confirmed_ride("9"), None));
        assert_eq!(rides.items().len(), 1);
    }

    #[test]
    fn local_cooldown_refuses_without_touching_the_mirror() {
        let mut layer = Layer::<Rides>::new(COOLDOWN);
        let t0 = Instant::now();
        layer.begin_submit(&ride_draft(), None, t0).unwrap();

        let err = layer
            .begin_submit(&ride_draft(), None, t0 + Duration::from_millis(2_500))
            .err()
            .expect("cooling down");
        assert!(matches!(
            err,
            ClientError::CoolingDown {
                class: EventClass::Ride,
                wait_secs: 8
            }
        ));
        assert_eq!(layer.items().len(), 1);
    }

    #[test]
    fn invalid_draft_leaves_no_placeholder_and_keeps_cooldown_free() {
        let mut layer = Layer::<Rides>::new(COOLDOWN);
        let t0 = Instant::now();
        let mut draft = ride_draft();
        draft.passengers = 9;

        let err = layer.begin_submit(&draft, None, t0).err().expect("invalid");
        assert_eq!(err.code(), "INVALID_DRAFT");
        assert!(layer.items().is_empty());
        assert_eq!(layer.pending_count(), 0);
        // the cooldown was not spent on it
        assert!(layer.begin_submit(&ride_draft(), None, t0).is_ok());
    }

    #[test]
    fn abort_undoes_placeholder_and_cooldown() {
        let mut layer = Layer::<Rides>::new(COOLDOWN);
        let t0 = Instant::now();
        let (_, submission) = layer.begin_submit(&ride_draft(), None, t0).unwrap();
        layer.abort_submit(submission);
        assert!(layer.items().is_empty());
        assert!(layer.begin_submit(&ride_draft(), None, t0).is_ok());
    }

    #[test]
    fn hazards_are_not_optimistic() {
        let mut layer = Layer::<Hazards>::new(COOLDOWN);
        let draft = HazardDraft {
            kind: HazardKind::Flood,
            coordinate: Coordinate::new(43.0, -81.2),
            description: "street flooded".into(),
            marker_color: Some("#1976D2".into()),
        };
        let (frame, _) = layer.begin_submit(&draft, None, Instant::now()).unwrap();
        assert!(layer.items().is_empty());
        assert!(matches!(
            frame,
            ClientFrame::ReportObstacle {
                obstacle_type: HazardKind::Flood,
                ..
            }
        ));
    }

    #[test]
    fn rejection_retracts_the_named_placeholder() {
        let mut mirrors = Mirrors::new(Duration::ZERO);
        let now = Instant::now();
        let first = submit(mirrors.layer_mut::<Rides>(), &ride_draft(), now);
        let second = submit(mirrors.layer_mut::<Rides>(), &ride_draft(), now);

        let advisory = mirrors.apply(ServerFrame::rejection(
            "Please wait 8 seconds before submitting another ride request",
            Some(EventClass::Ride),
            Some(first),
        ));
        assert_eq!(advisory.map(|a| a.class), Some(Some(EventClass::Ride)));
        let ids: Vec<_> = mirrors
            .layer::<Rides>()
            .items()
            .iter()
            .map(|r| r.id.as_str().to_owned())
            .collect();
        assert_eq!(ids, [second]);
    }

    #[test]
    fn rejection_without_ref_retracts_newest_placeholder() {
        let mut mirrors = Mirrors::new(Duration::ZERO);
        submit(mirrors.layer_mut::<Rides>(), &ride_draft(), Instant::now());

        mirrors.apply(ServerFrame::error("wait", Some(EventClass::Ride)));
        assert!(mirrors.layer::<Rides>().items().is_empty());
    }

    #[test]
    fn init_replaces_and_clears_pending() {
        let mut mirrors = Mirrors::new(COOLDOWN);
        submit(mirrors.layer_mut::<Rides>(), &ride_draft(), Instant::now());
        mirrors.layer_mut::<Hazards>().insert(hazard("stale"), None);

        let data = Snapshot {
            obstacles: vec![hazard("1")],
            ride_requests: vec![confirmed_ride("2")],
            ..Snapshot::default()
        };
        assert!(mirrors.apply(ServerFrame::Init { data }).is_none());
        assert_eq!(mirrors.layer::<Hazards>().items()[0].id.as_str(), "1");
        assert_eq!(mirrors.layer::<Rides>().items().len(), 1);
        assert_eq!(mirrors.layer::<Rides>().pending_count(), 0);
    }

    #[test]
    fn removal_events_filter_by_id() {
        let mut mirrors = Mirrors::new(COOLDOWN);
        mirrors.apply(ServerFrame::NewObstacle { obstacle: hazard("1") });
        mirrors.apply(ServerFrame::NewObstacle { obstacle: hazard("2") });
        mirrors.apply(ServerFrame::ObstacleRemoved {
            obstacle_id: ItemId::from("1"),
        });
        // unknown id is a no-op
        mirrors.apply(ServerFrame::ObstacleRemoved {
            obstacle_id: ItemId::from("404"),
        });
        let hazards = mirrors.layer::<Hazards>().items();
        let ids: Vec<_> = hazards.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["2"]);
    }

    #[test]
    fn chat_mirror_keeps_the_latest_hundred() {
        let mut layer = Layer::<Chat>::new(COOLDOWN);
        layer.replace((0..100).map(chat).collect());
        layer.insert(chat(100), None);
        assert_eq!(layer.items().len(), 100);
        assert_eq!(layer.items()[0].message, "m1");
        assert_eq!(layer.items()[99].message, "m100");
    }
}
