use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use db::models::attendance_record::Model as AttendanceRecord;
use util::state::AppState;

use crate::routes::qrcode::common::error_response;
use crate::{auth::AuthUser, response::ApiResponse};

/// DELETE `/api/attendance/records/{record_id}`
///
/// **Auth**: admin bearer token.
///
/// - `200 OK` record removed
/// - `404 Not Found` no such record
/// - `500 Internal Server Error`
pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match AttendanceRecord::delete_by_id(state.db(), record_id).await {
        Ok(()) => {
            tracing::info!(record_id, admin = %claims.sub, "Attendance record deleted");
            (
                StatusCode::OK,
                Json(ApiResponse::success((), "Attendance record deleted")),
            )
        }
        Err(e) => {
            if e.is_retryable() {
                tracing::error!(error = %e, record_id, "Failed to delete attendance record");
            }
            let (status, message) = error_response(&e);
            (status, Json(ApiResponse::error(message)))
        }
    }
}
