use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use db::AttendanceError;
use db::models::attendance_code::Model as AttendanceCode;
use db::models::attendance_record::{Model as AttendanceRecord, Redemption};
use serde::{Deserialize, Serialize};

use crate::response::ApiResponse;

/// Location attached to a generated code. `radius` is in meters.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LocationResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeResponse {
    pub id: i64,
    pub code: String,
    pub session_type: String,
    pub generated_at: String,
    pub expires_at: String,
    pub is_active: bool,
    pub location: Option<LocationResponse>,
}

impl From<AttendanceCode> for QrCodeResponse {
    fn from(m: AttendanceCode) -> Self {
        let location = m.geofence().map(|g| LocationResponse {
            latitude: g.latitude,
            longitude: g.longitude,
            radius: g.radius_meters,
        });
        Self {
            id: m.id,
            code: m.code,
            session_type: m.session_kind.to_string(),
            generated_at: m.generated_at.to_rfc3339(),
            expires_at: m.expires_at.to_rfc3339(),
            is_active: m.is_active,
            location,
        }
    }
}

/// Request location for `POST /generate`. Latitude and longitude are
/// optional here only so a half-specified location can be rejected with 400.
#[derive(Debug, Deserialize)]
pub struct GenerateLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReq {
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub location: Option<GenerateLocation>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReq {
    #[serde(default)]
    pub qr_data: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub location: Option<DeviceLocation>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub message: String,
    pub qr_session: String,
    pub record_id: i64,
    pub marked_at: String,
    /// Set only when the scan was rejected because the code expired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl ValidateResponse {
    /// Data sent alongside a rejected scan.
    pub fn rejected(e: &AttendanceError) -> Self {
        match e {
            AttendanceError::CodeExpired { expires_at } => Self {
                expires_at: Some(expires_at.to_rfc3339()),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

impl From<&Redemption> for ValidateResponse {
    fn from(r: &Redemption) -> Self {
        Self {
            message: r.message(),
            qr_session: r.record.session_kind.to_string(),
            record_id: r.record.id,
            marked_at: r.record.marked_at.to_rfc3339(),
            expires_at: None,
        }
    }
}

/// Payload of the `attendance.marked` event.
#[derive(Debug, Serialize)]
pub struct MarkedEvent {
    pub record_id: i64,
    pub code_id: i64,
    pub student_id: String,
    pub session_type: String,
    pub marked_at: String,
}

impl From<&AttendanceRecord> for MarkedEvent {
    fn from(r: &AttendanceRecord) -> Self {
        Self {
            record_id: r.id,
            code_id: r.code_id.unwrap_or_default(),
            student_id: r.student_id.clone(),
            session_type: r.session_kind.to_string(),
            marked_at: r.marked_at.to_rfc3339(),
        }
    }
}

/// 400 envelope for a body that is not valid JSON of the expected shape,
/// e.g. a numeric `studentId`.
pub fn invalid_body<T>(rejection: JsonRejection) -> (StatusCode, Json<ApiResponse<T>>)
where
    T: Serialize + Default,
{
    tracing::debug!(reason = %rejection.body_text(), "Rejected request body");
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(format!(
            "Invalid request body: {}",
            rejection.body_text()
        ))),
    )
}

/// HTTP status and client-facing message for a core error.
///
/// Storage failures keep their category but not the driver text; that is
/// logged instead.
pub fn error_response(e: &AttendanceError) -> (StatusCode, String) {
    match e {
        AttendanceError::Validation(_)
        | AttendanceError::CodeExpired { .. }
        | AttendanceError::InvalidCode => (StatusCode::BAD_REQUEST, e.to_string()),
        AttendanceError::NoActiveCode | AttendanceError::NotFound(_) => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        AttendanceError::OutsideGeofence { .. } => (StatusCode::FORBIDDEN, e.to_string()),
        AttendanceError::AlreadyMarked { .. } | AttendanceError::Conflict(_) => {
            (StatusCode::CONFLICT, e.to_string())
        }
        AttendanceError::Deactivation(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to deactivate previous QR codes".into(),
        ),
        AttendanceError::Creation(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create QR code".into(),
        ),
        AttendanceError::Persistence(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to record attendance".into(),
        ),
    }
}
