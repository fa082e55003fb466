pub mod frames;
pub mod models;

pub use frames::{ClientFrame, FirstAidDraft, ServerFrame};
pub use models::{
    ChatMessage, Coordinate, FirstAidRequest, HazardKind, HazardReport, InjuryType, Record,
    RideRequest, Snapshot,
};
