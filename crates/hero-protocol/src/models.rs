use hero_core::ItemId;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

pub const RIDE_REQUEST_LABEL: &str = "Ride Request";
pub const FIRST_AID_REQUEST_LABEL: &str = "First Aid Request";

/// Anything stored in one of the four collections.
pub trait Record {
    fn id(&self) -> &ItemId;
}

/// Wire: `{ "lat": 43.0, "lon": -81.2 }`. `latitude`/`longitude` are also accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    #[serde(rename = "Fallen Tree")]
    FallenTree,
    #[serde(rename = "Power Line Down")]
    PowerLineDown,
    Flood,
    #[serde(rename = "Road Blocked")]
    RoadBlocked,
    Debris,
    Fire,
}

impl HazardKind {
    pub const ALL: [HazardKind; 6] = [
        HazardKind::FallenTree,
        HazardKind::PowerLineDown,
        HazardKind::Flood,
        HazardKind::RoadBlocked,
        HazardKind::Debris,
        HazardKind::Fire,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HazardKind::FallenTree => "Fallen Tree",
            HazardKind::PowerLineDown => "Power Line Down",
            HazardKind::Flood => "Flood",
            HazardKind::RoadBlocked => "Road Blocked",
            HazardKind::Debris => "Debris",
            HazardKind::Fire => "Fire",
        }
    }

    /// Marker color used when a report arrives without one.
    pub fn default_color(&self) -> &'static str {
        match self {
            HazardKind::FallenTree => "#2E7D32",
            HazardKind::PowerLineDown => "#FFC107",
            HazardKind::Flood => "#1976D2",
            HazardKind::RoadBlocked => "#E64A19",
            HazardKind::Debris => "#5D4037",
            HazardKind::Fire => "#D32F2F",
        }
    }
}

/// Serialized with a `label` equal to the kind's display name; map screens
/// key their icons and titles on it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardReport {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: HazardKind,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub description: String,
    pub marker_color: String,
}

impl Record for HazardReport {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Serialize for HazardReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("HazardReport", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("type", &self.kind)?;
        s.serialize_field("coordinate", &self.coordinate)?;
        s.serialize_field("label", self.kind.label())?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("markerColor", &self.marker_color)?;
        s.end()
    }
}

/// Serialized with the constant `type: "ride_request"` and `label` fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RideRequest {
    pub id: ItemId,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "passengers::deserialize")]
    pub passengers: u8,
}

impl Record for RideRequest {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Serialize for RideRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("RideRequest", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("type", "ride_request")?;
        s.serialize_field("coordinate", &self.coordinate)?;
        s.serialize_field("label", RIDE_REQUEST_LABEL)?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("passengers", &self.passengers)?;
        s.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InjuryType {
    #[serde(rename = "Minor Injury")]
    MinorInjury,
    #[serde(rename = "Major Injury")]
    MajorInjury,
    #[serde(rename = "Medical Emergency")]
    MedicalEmergency,
    #[serde(rename = "Cardiac Emergency")]
    CardiacEmergency,
    #[serde(rename = "Breathing Difficulty")]
    BreathingDifficulty,
    Trauma,
    Burns,
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstAidRequest {
    pub id: ItemId,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub description: String,
    pub injury_type: InjuryType,
}

impl Record for FirstAidRequest {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Serialize for FirstAidRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FirstAidRequest", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("type", "first_aid_request")?;
        s.serialize_field("coordinate", &self.coordinate)?;
        s.serialize_field("label", FIRST_AID_REQUEST_LABEL)?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("injuryType", &self.injury_type)?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: ItemId,
    pub username: String,
    pub message: String,
    /// Epoch milliseconds, assigned by the hub.
    pub timestamp: i64,
}

impl Record for ChatMessage {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

/// Payload of the `init` frame: every collection, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub obstacles: Vec<HazardReport>,
    #[serde(default)]
    pub ride_requests: Vec<RideRequest>,
    #[serde(default)]
    pub first_aid_requests: Vec<FirstAidRequest>,
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
}

/// Passenger counts arrive as numbers or as the picker's string values ("1".."8").
pub(crate) mod passengers {
    use serde::{de::Error, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<u8, D::Error> {
        let n = match Raw::deserialize(de)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| D::Error::custom(format!("invalid passenger count {:?}", s)))?,
        };
        u8::try_from(n).map_err(|_| D::Error::custom(format!("passenger count {} out of range", n)))
    }
}
