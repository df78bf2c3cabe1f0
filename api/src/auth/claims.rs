use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Account identifier assigned by the issuing identity service.
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);
