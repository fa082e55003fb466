use axum::{routing::get, Router};
use hero_core::HeroConfig;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::hub::Hub;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: HeroConfig,
    /// The single serialization point. std Mutex because no hub method awaits;
    /// the guard is never held across an `.await`.
    hub: Mutex<Hub>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: HeroConfig) -> Self {
        let hub = Hub::new(&config);
        Self {
            config,
            hub: Mutex::new(hub),
            started_at: Instant::now(),
        }
    }

    /// Lock the hub. Poisoning is recovered: every store mutation is a
    /// single push or remove.
    pub fn hub(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::ws::connection::root_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route("/health", get(crate::http::health::health_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
