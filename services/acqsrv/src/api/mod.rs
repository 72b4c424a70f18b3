//! Engine control API and the WebSocket event stream.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod ws;

pub use routes::api_router;

use std::sync::Arc;

use crate::core::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}
