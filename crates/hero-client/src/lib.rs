//! Participant side: local mirrors of the hub's four collections, kept in
//! sync over a single WebSocket connection.

pub mod config;
pub mod cooldown;
pub mod domain;
pub mod error;
pub mod layer;
pub mod session;

pub use config::ClientConfig;
pub use domain::{Chat, Domain, FirstAid, HazardDraft, Hazards, RideDraft, Rides};
pub use error::ClientError;
pub use layer::{Advisory, Layer, Mirrors};
pub use session::Session;
