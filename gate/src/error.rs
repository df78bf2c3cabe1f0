use chrono::{DateTime, Utc};

/// Failures seen by the client while talking to the attendance server.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 400 with a message other than expiry or mismatch.
    #[error("{0}")]
    Rejected(String),

    #[error("No active QR found")]
    NoActiveCode,

    #[error("QR code has expired")]
    CodeExpired { expires_at: Option<DateTime<Utc>> },

    #[error("Invalid QR scanned")]
    InvalidCode,

    #[error("{0}")]
    OutsideGeofence(String),

    #[error("{0}")]
    AlreadyMarked(String),

    /// 5xx; safe to retry.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response ({status}): {message}")]
    Unexpected { status: u16, message: String },
}
