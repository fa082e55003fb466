pub mod config;
pub mod error;
pub mod types;

pub use config::HeroConfig;
pub use error::{HeroError, Result};
pub use types::{ConnId, EventClass, ItemId};
