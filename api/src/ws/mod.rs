use axum::{Router, routing::get};
use util::state::AppState;

pub mod attendance;

use attendance::attendance_ws_handler;

/// WebSocket routes mounted under `/ws`.
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/attendance", get(attendance_ws_handler))
}
