use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use util::geofence::Coordinates;

use crate::error::GateError;
use crate::lookup::Envelope;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateBody<'a> {
    qr_data: &'a str,
    student_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<Coordinates>,
}

/// Confirmation returned by a successful redemption.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redeemed {
    pub message: String,
    pub qr_session: String,
    pub record_id: i64,
    pub marked_at: DateTime<Utc>,
}

/// Submits scans to `POST /api/qrcode/validate`.
#[derive(Debug, Clone)]
pub struct RedemptionClient {
    base_url: String,
    client: reqwest::Client,
}

impl RedemptionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn redeem(
        &self,
        qr_data: &str,
        student_id: &str,
        location: Option<Coordinates>,
    ) -> Result<Redeemed, GateError> {
        let url = format!("{}/api/qrcode/validate", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&ValidateBody {
                qr_data,
                student_id,
                location,
            })
            .send()
            .await?;

        let status = res.status().as_u16();
        if res.status().is_success() {
            let body: Envelope<Redeemed> = res.json().await?;
            return body.data.ok_or(GateError::Unexpected {
                status,
                message: "missing data".into(),
            });
        }

        let Ok(body) = res.json::<Envelope<serde_json::Value>>().await else {
            return Err(map_status(status, String::new(), None));
        };
        let expires_at = body
            .data
            .and_then(|d| serde_json::from_value::<Rejection>(d).ok())
            .and_then(|r| r.expires_at);
        Err(map_status(status, body.message, expires_at))
    }
}

/// Data attached to a rejected scan.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Rejection {
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

fn map_status(status: u16, message: String, expires_at: Option<DateTime<Utc>>) -> GateError {
    match status {
        400 if message == "QR code has expired" => GateError::CodeExpired { expires_at },
        400 if message == "Invalid QR scanned" => GateError::InvalidCode,
        400 => GateError::Rejected(message),
        403 => GateError::OutsideGeofence(message),
        404 => GateError::NoActiveCode,
        409 => GateError::AlreadyMarked(message),
        500..=599 => GateError::Server { status, message },
        _ => GateError::Unexpected { status, message },
    }
}
