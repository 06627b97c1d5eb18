use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of an access token minted by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,                // user ID
    pub exp: usize,               // expires at (unix timestamp)
    #[serde(default)]
    pub iat: Option<usize>,       // issued at
    pub iss: String,              // issuer
    pub aud: String,              // audience
    #[serde(default)]
    pub email: Option<String>,
}
