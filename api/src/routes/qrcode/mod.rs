//! `/api/qrcode`: issuing, looking up and redeeming attendance codes.
//!
//! These routes are open; students identify themselves by roll number in
//! the request body.

use axum::{
    Router,
    routing::{get, post},
};
use util::state::AppState;

pub mod common;
mod get;
mod post;

pub use get::get_active_qr;
pub use post::{generate_qr, validate_qr};

pub fn qrcode_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_qr))
        .route("/active", get(get_active_qr))
        .route("/validate", post(validate_qr))
}
