use std::str::FromStr;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use db::models::SessionKind;
use db::models::attendance_code::{IssueCode, Model as AttendanceCode};
use db::models::attendance_record::{Model as AttendanceRecord, Redeem, RedemptionPolicy};
use util::geofence::{Coordinates, Geofence};
use util::{config, state::AppState, ws};

use super::common::{
    GenerateReq, MarkedEvent, QrCodeResponse, ValidateReq, ValidateResponse, error_response,
    invalid_body,
};
use crate::response::ApiResponse;

/// POST `/api/qrcode/generate`
///
/// Issues a new QR code and deactivates every previous one.
///
/// **Body**
/// ```json
/// { "sessionType": "check-in", "location": { "latitude": 28.61, "longitude": 77.2, "radius": 500 } }
/// ```
/// `location` is optional; without it the code is redeemable from anywhere.
/// `radius` defaults to `DEFAULT_GEOFENCE_RADIUS_M`.
///
/// **Responses**
/// - `201 Created` with the new code
/// - `400 Bad Request` malformed body, unknown session type or half-specified location
/// - `409 Conflict` another issuance won the race
/// - `500 Internal Server Error` deactivation or creation failed
pub async fn generate_qr(
    State(state): State<AppState>,
    body: Result<Json<GenerateReq>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse<QrCodeResponse>>) {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };
    let Some(kind) = body
        .session_type
        .as_deref()
        .and_then(|s| SessionKind::from_str(s.trim()).ok())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                "sessionType must be 'check-in' or 'check-out'",
            )),
        );
    };

    let geofence = match body.location {
        None => None,
        Some(loc) => match (loc.latitude, loc.longitude) {
            (Some(lat), Some(lng)) => Some(Geofence::new(
                lat,
                lng,
                loc.radius.unwrap_or_else(config::default_geofence_radius_m),
            )),
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(
                        "location requires both latitude and longitude",
                    )),
                );
            }
        },
    };

    let params = IssueCode {
        session_kind: kind,
        geofence,
        ttl: config::code_ttl(),
        render_base_url: config::qr_render_base_url(),
    };

    match AttendanceCode::issue(state.db(), params, Utc::now()).await {
        Ok(code) => {
            let resp = QrCodeResponse::from(code);
            ws::emit(state.ws(), ws::ATTENDANCE_TOPIC, "attendance.code_issued", &resp).await;
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(resp, "QR code generated")),
            )
        }
        Err(e) => {
            if e.is_retryable() {
                tracing::error!(error = %e, "QR code generation failed");
            }
            let (status, message) = error_response(&e);
            (status, Json(ApiResponse::error(message)))
        }
    }
}

/// POST `/api/qrcode/validate`
///
/// Redeems a scanned payload for a student.
///
/// **Body**
/// ```json
/// { "qrData": "https://...&data=check-in%3A...", "studentId": "21CS042", "location": { "latitude": 28.61, "longitude": 77.2 } }
/// ```
/// `location` is only checked when `ENFORCE_GEOFENCE` is on.
///
/// **Responses**
/// - `200 OK` `{ message, qrSession, recordId, markedAt }`
/// - `400 Bad Request` malformed or missing fields, expired (`data.expiresAt` set) or non-matching code
/// - `403 Forbidden` outside the code's geofence
/// - `404 Not Found` no active code
/// - `409 Conflict` already marked today
/// - `500 Internal Server Error`
pub async fn validate_qr(
    State(state): State<AppState>,
    body: Result<Json<ValidateReq>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse<ValidateResponse>>) {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };
    let (Some(qr_data), Some(student_id)) = (body.qr_data, body.student_id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("QR data and student ID are required")),
        );
    };

    let params = Redeem {
        payload: qr_data,
        student_id,
        device_location: body
            .location
            .map(|l| Coordinates::new(l.latitude, l.longitude)),
    };

    match AttendanceRecord::redeem(state.db(), params, Utc::now(), RedemptionPolicy::from_config())
        .await
    {
        Ok(redemption) => {
            let resp = ValidateResponse::from(&redemption);
            ws::emit(
                state.ws(),
                ws::ATTENDANCE_TOPIC,
                "attendance.marked",
                &MarkedEvent::from(&redemption.record),
            )
            .await;
            let message = resp.message.clone();
            (StatusCode::OK, Json(ApiResponse::success(resp, message)))
        }
        Err(e) => {
            let (status, message) = error_response(&e);
            if e.is_retryable() {
                tracing::error!(error = %e, "Attendance redemption failed");
            } else {
                tracing::info!(reason = %e, "Attendance redemption rejected");
            }
            (
                status,
                Json(ApiResponse::error_with(ValidateResponse::rejected(&e), message)),
            )
        }
    }
}
