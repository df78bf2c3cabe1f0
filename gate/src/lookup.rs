use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use util::geofence::Geofence;

use crate::error::GateError;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CodeLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

/// The active code as returned by `GET /api/qrcode/active`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCode {
    pub id: i64,
    pub code: String,
    pub session_type: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub is_active: bool,
    pub location: Option<CodeLocation>,
}

impl ActiveCode {
    pub fn geofence(&self) -> Option<Geofence> {
        self.location
            .map(|l| Geofence::new(l.latitude, l.longitude, l.radius))
    }
}

/// Server envelope `{ success, data, message }`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[allow(dead_code)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
}

/// Source of the currently active code.
#[async_trait]
pub trait ActiveCodeLookup: Send + Sync {
    async fn active_code(&self) -> Result<Option<ActiveCode>, GateError>;
}

/// Polls the attendance server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpActiveCodeLookup {
    base_url: String,
    client: reqwest::Client,
}

impl HttpActiveCodeLookup {
    /// `base_url` is the server root, e.g. `http://10.0.0.5:5000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl ActiveCodeLookup for HttpActiveCodeLookup {
    async fn active_code(&self) -> Result<Option<ActiveCode>, GateError> {
        let url = format!("{}/api/qrcode/active", self.base_url);
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            let message = res
                .json::<Envelope<serde_json::Value>>()
                .await
                .map(|e| e.message)
                .unwrap_or_default();
            return Err(if status.is_server_error() {
                GateError::Server {
                    status: status.as_u16(),
                    message,
                }
            } else {
                GateError::Unexpected {
                    status: status.as_u16(),
                    message,
                }
            });
        }
        let body: Envelope<ActiveCode> = res.json().await?;
        tracing::debug!(active = body.data.is_some(), "Fetched active code");
        Ok(body.data)
    }
}
