pub mod claims;
pub mod extractors;
pub mod guards;
pub mod middleware;

pub use claims::{AuthUser, Claims};

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use util::config;

/// Signs a token for `sub` with the configured secret.
///
/// Accounts live in an external identity service; this exists for operators
/// minting admin tokens and for tests.
pub fn generate_jwt(
    sub: &str,
    admin: bool,
    ttl: Duration,
) -> Result<(String, String), jsonwebtoken::errors::Error> {
    let expiry = Utc::now() + ttl;
    let claims = Claims {
        sub: sub.to_string(),
        admin,
        exp: expiry.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config::jwt_secret().as_bytes()),
    )?;

    Ok((token, expiry.to_rfc3339()))
}
