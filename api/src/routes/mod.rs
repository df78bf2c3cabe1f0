//! HTTP route entry point for `/api/...`.
//!
//! - `/health` liveness probe
//! - `/qrcode` code issuance, lookup and redemption
//! - `/attendance` ledger listing, export, statistics and admin deletion

use axum::Router;
use util::state::AppState;

use crate::routes::{
    attendance::attendance_routes, health::health_routes, qrcode::qrcode_routes,
};

pub mod attendance;
pub mod health;
pub mod qrcode;

/// All `/api` routes. State is supplied by the caller with `with_state`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/health", health_routes())
        .nest("/qrcode", qrcode_routes())
        .nest("/attendance", attendance_routes())
}
