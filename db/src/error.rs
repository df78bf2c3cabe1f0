use chrono::{DateTime, Utc};
use sea_orm::{DbErr, SqlErr};

use crate::models::session_kind::SessionKind;

/// Result type for code issuance and redemption.
pub type AttendanceResult<T> = Result<T, AttendanceError>;

/// Everything that can go wrong while issuing or redeeming an attendance code.
///
/// Every variant is scoped to a single request.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    #[error("No active QR found")]
    NoActiveCode,

    #[error("QR code has expired")]
    CodeExpired { expires_at: DateTime<Utc> },

    /// Payload does not belong to the active code's session.
    #[error("Invalid QR scanned")]
    InvalidCode,

    #[error("Device is {distance_m:.0} m from the session location")]
    OutsideGeofence { distance_m: f64 },

    #[error("{session_kind} already marked for today")]
    AlreadyMarked { session_kind: SessionKind },

    /// A concurrent issuance won the single-active-code slot.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to deactivate previous QR codes: {0}")]
    Deactivation(#[source] DbErr),

    #[error("Failed to create QR code: {0}")]
    Creation(#[source] DbErr),

    #[error("Database error: {0}")]
    Persistence(#[from] DbErr),
}

impl AttendanceError {
    /// `true` for storage failures, which a client may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttendanceError::Deactivation(_)
                | AttendanceError::Creation(_)
                | AttendanceError::Persistence(_)
        )
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_client_contract() {
        assert_eq!(AttendanceError::NoActiveCode.to_string(), "No active QR found");
        assert_eq!(AttendanceError::InvalidCode.to_string(), "Invalid QR scanned");
        assert_eq!(
            AttendanceError::AlreadyMarked {
                session_kind: SessionKind::CheckIn
            }
            .to_string(),
            "check-in already marked for today"
        );
        assert_eq!(
            AttendanceError::OutsideGeofence { distance_m: 2500.4 }.to_string(),
            "Device is 2500 m from the session location"
        );
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(AttendanceError::Persistence(DbErr::Custom("x".into())).is_retryable());
        assert!(AttendanceError::Deactivation(DbErr::Custom("x".into())).is_retryable());
        assert!(!AttendanceError::InvalidCode.is_retryable());
        assert!(!AttendanceError::NoActiveCode.is_retryable());
    }
}
