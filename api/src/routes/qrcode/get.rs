use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use db::models::attendance_code::Model as AttendanceCode;
use util::state::AppState;

use super::common::QrCodeResponse;
use crate::response::ApiResponse;

/// GET `/api/qrcode/active`
///
/// The currently redeemable code, or `null` when there is none. Expired
/// codes are deactivated as a side effect.
pub async fn get_active_qr(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Option<QrCodeResponse>>>) {
    match AttendanceCode::current(state.db(), Utc::now()).await {
        Ok(Some(code)) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(QrCodeResponse::from(code)),
                "Active QR code retrieved",
            )),
        ),
        Ok(None) => (
            StatusCode::OK,
            Json(ApiResponse::success(None, "No active QR found")),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load active QR code");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to load active QR code")),
            )
        }
    }
}
