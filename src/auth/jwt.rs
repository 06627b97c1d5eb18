use axum::extract::FromRef;
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

/// Verification material for provider-issued access tokens.
#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;
    use uuid::Uuid;

    pub(crate) fn sign(cfg: &JwtConfig, sub: Uuid, email: &str, ttl_secs: i64) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub,
            exp: (now + ttl_secs) as usize,
            iat: Some(now as usize),
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
            email: Some(email.to_string()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.secret.as_bytes()),
        )
        .expect("sign token")
    }

    fn cfg(secret: &str, issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    #[test]
    fn verifies_token_from_same_issuer() {
        let cfg = cfg("dev-secret", "test-issuer", "authenticated");
        let user_id = Uuid::new_v4();
        let token = sign(&cfg, user_id, "a@b.com", 300);
        let claims = JwtKeys::from(&cfg).verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn rejects_wrong_issuer_or_audience() {
        let good = cfg("same-secret", "good-iss", "good-aud");
        let bad = cfg("same-secret", "bad-iss", "bad-aud");
        let token = sign(&good, Uuid::new_v4(), "a@b.com", 300);
        assert!(JwtKeys::from(&bad).verify(&token).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let signer = cfg("secret-one", "iss", "aud");
        let verifier = cfg("secret-two", "iss", "aud");
        let token = sign(&signer, Uuid::new_v4(), "a@b.com", 300);
        assert!(JwtKeys::from(&verifier).verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let cfg = cfg("dev-secret", "iss", "aud");
        let token = sign(&cfg, Uuid::new_v4(), "a@b.com", -3600);
        assert!(JwtKeys::from(&cfg).verify(&token).is_err());
    }
}
