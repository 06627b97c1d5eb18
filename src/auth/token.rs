//! Reads the caller identity out of a bearer token **without** checking its signature.
//!
//! Only call this when something upstream (an API gateway, the function host) has
//! already verified the token. Everywhere else go through [`super::jwt::JwtKeys::verify`].

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token format: expected 3 segments, found {0}")]
    MalformedToken(usize),
    #[error("Invalid token payload")]
    Undecodable,
    #[error("No user ID in token")]
    MissingSubject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub subject: String,
    pub email: Option<String>,
}

pub fn extract_identity(token: &str) -> Result<TokenIdentity, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::MalformedToken(segments.len()));
    }

    let bytes = URL_SAFE
        .decode(pad_segment(segments[1]))
        .map_err(|_| TokenError::Undecodable)?;
    let payload: Value = serde_json::from_slice(&bytes).map_err(|_| TokenError::Undecodable)?;
    if !payload.is_object() {
        return Err(TokenError::Undecodable);
    }

    let subject = payload
        .get("sub")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(TokenError::MissingSubject)?;
    let email = payload
        .get("email")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from);

    Ok(TokenIdentity {
        subject: subject.to_string(),
        email,
    })
}

fn pad_segment(segment: &str) -> String {
    let missing = (4 - segment.len() % 4) % 4;
    let mut padded = String::with_capacity(segment.len() + missing);
    padded.push_str(segment);
    padded.extend(std::iter::repeat('=').take(missing));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn token_with(payload: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature-is-not-checked")
    }

    #[test]
    fn returns_subject_of_middle_segment() {
        let token = token_with(json!({ "sub": "6c1c3a3e-0000-4000-8000-000000000001", "email": "a@b.com" }));
        let id = extract_identity(&token).expect("identity");
        assert_eq!(id.subject, "6c1c3a3e-0000-4000-8000-000000000001");
        assert_eq!(id.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn decodes_payloads_of_every_padding_length() {
        for sub in ["a", "ab", "abc", "abcd", "abcde"] {
            let token = token_with(json!({ "sub": sub }));
            assert_eq!(extract_identity(&token).unwrap().subject, sub);
        }
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        assert_eq!(extract_identity("only.two"), Err(TokenError::MalformedToken(2)));
        assert_eq!(extract_identity("a.b.c.d"), Err(TokenError::MalformedToken(4)));
        assert_eq!(extract_identity(""), Err(TokenError::MalformedToken(1)));
    }

    #[test]
    fn missing_subject_is_reported() {
        let token = token_with(json!({ "email": "a@b.com" }));
        assert_eq!(extract_identity(&token), Err(TokenError::MissingSubject));
        let token = token_with(json!({ "sub": "" }));
        assert_eq!(extract_identity(&token), Err(TokenError::MissingSubject));
    }

    #[test]
    fn garbage_payload_is_undecodable() {
        assert_eq!(extract_identity("a.!!!!.c"), Err(TokenError::Undecodable));
        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("not json"));
        assert_eq!(extract_identity(&not_json), Err(TokenError::Undecodable));
        let array = format!("a.{}.c", URL_SAFE_NO_PAD.encode("[1,2]"));
        assert_eq!(extract_identity(&array), Err(TokenError::Undecodable));
    }

    #[test]
    fn signature_is_never_consulted() {
        let token = token_with(json!({ "sub": "someone" }));
        let tampered = format!("{}.tampered", token.rsplit_once('.').unwrap().0);
        assert_eq!(extract_identity(&tampered).unwrap().subject, "someone");
    }
}
