//! `/api/attendance`: the attendance ledger.

use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get},
};
use util::state::AppState;

pub mod common;
mod delete;
mod get;

pub use delete::delete_record;
pub use get::{export_records_csv, get_stats, list_records, list_student_records};

use crate::auth::guards::allow_admin;

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/records", get(list_records))
        .route("/records/export", get(export_records_csv))
        .route(
            "/records/{record_id}",
            delete(delete_record).route_layer(from_fn(allow_admin)),
        )
        .route("/student/{student_id}", get(list_student_records))
        .route("/stats", get(get_stats))
}
