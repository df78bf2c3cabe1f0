use serde::Serialize;

/// Envelope for every JSON body the API returns.
///
/// ```json
/// {
///   "success": true,
///   "data": { "message": "Successfully checked in!", "qrSession": "check-in" },
///   "message": "Successfully checked in!"
/// }
/// ```
///
/// On failure `success` is `false`, `data` is `T::default()` and `message`
/// carries the reason, e.g. `"QR code has expired"`.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Error response that still carries data, e.g. the expiry of a rejected code.
    pub fn error_with(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            message: message.into(),
        }
    }

    /// Error response with `T::default()` as data.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }
}
