//! State synchronization hub: canonical in-memory collections, per-connection
//! rate limiting, and fan-out of confirmed deltas over WebSocket.

pub mod app;
pub mod http;
pub mod hub;
pub mod ws;

pub use app::{build_router, AppState};
pub use hub::{Hub, Outcome};
