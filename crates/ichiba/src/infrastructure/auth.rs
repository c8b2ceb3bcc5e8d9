use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entities::user::{Role, User};

/// Why a presented token was rejected. Every failure is a value; nothing in
/// here panics or leaks the underlying library error to callers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("invalid payload")]
    InvalidPayload,
    #[error("token expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::Json(_) => Self::InvalidPayload,
            _ => Self::Malformed,
        }
    }
}

/// Identity carried by a bearer token. `Claims::new` is the only way to build
/// one, so `iat`/`exp` are always stamped at issuance and the validity window
/// is fixed for the life of the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user: &User, ttl_seconds: i64) -> Self {
        let iat = Utc::now().timestamp();

        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            iat,
            exp: iat + ttl_seconds,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

pub fn encode_token(secret: &str, claims: &Claims) -> Result<String, TokenError> {
    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verifies the signature before trusting anything in the payload, then
/// checks `exp` against the wall clock with zero leeway.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims::<&str>(&[]);

    Ok(jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?
    .claims)
}

/// Pulls the token out of an `Authorization` header value. The scheme match
/// is case-insensitive and any amount of whitespace may separate scheme and
/// token.
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    let (scheme, rest) = header_value.trim().split_once(char::is_whitespace)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = rest.trim_start();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDateTime;

    const SECRET: &str = "ichiba-test-secret";

    fn flip_first_char(segment: &str) -> String {
        let flipped = if segment.starts_with('A') { "B" } else { "A" };
        format!("{}{}", flipped, &segment[1..])
    }

    fn sample_user() -> User {
        User {
            id: 1,
            name: "Mei".to_string(),
            email: "mei@example.com".to_string(),
            password: "irrelevant".to_string(),
            role: Role::Admin,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_round_trip() {
        let claims = Claims::new(&sample_user(), 3600);
        let token = encode_token(SECRET, &claims).unwrap();

        let decoded = decode_token(SECRET, &token).unwrap();
        assert_eq!(decoded.id, claims.id);
        assert_eq!(decoded.name, claims.name);
        assert_eq!(decoded.email, claims.email);
        assert_eq!(decoded.role, claims.role);
        assert_eq!(decoded.iat, claims.iat);
        assert_eq!(decoded.exp, claims.iat + 3600);
    }

    #[test]
    fn test_wrong_secret_is_bad_signature() {
        let claims = Claims::new(&sample_user(), 3600);
        let token = encode_token(SECRET, &claims).unwrap();

        assert_eq!(decode_token("wrong-secret", &token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims::new(&sample_user(), -1);
        let token = encode_token(SECRET, &claims).unwrap();

        assert_eq!(decode_token(SECRET, &token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_payload_is_bad_signature() {
        let claims = Claims::new(&sample_user(), 3600);
        let token = encode_token(SECRET, &claims).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1] = flip_first_char(&parts[1]);
        let tampered = parts.join(".");

        assert_eq!(decode_token(SECRET, &tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_signature_never_verifies() {
        let claims = Claims::new(&sample_user(), 3600);
        let token = encode_token(SECRET, &claims).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[2] = flip_first_char(&parts[2]);
        let tampered = parts.join(".");

        assert!(decode_token(SECRET, &tampered).is_err());
    }

    #[test]
    fn test_two_segments_is_malformed() {
        assert_eq!(decode_token(SECRET, "abc.def"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("BEARER   abc"), Some("abc"));
        assert_eq!(extract_bearer("  Bearer abc  "), Some("abc"));
        assert_eq!(extract_bearer("Basic abc"), None);
        assert_eq!(extract_bearer("Bearer"), None);
        assert_eq!(extract_bearer("Bearer    "), None);
        assert_eq!(extract_bearer(""), None);
    }
}
