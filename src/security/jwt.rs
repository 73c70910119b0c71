//! RS256 access tokens.
//!
//! # Design Decisions
//! - Only RS256 is accepted; tokens signed with anything else are rejected
//! - Expiry is always checked
//! - Keys are loaded from PEM files once, at startup

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub exp: u64,
    pub iat: u64,
}

/// Authenticated user id, stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("failed to read key {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid RSA key: {0}")]
    Key(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

pub fn load_encoding_key(path: &Path) -> Result<EncodingKey, JwtError> {
    let pem = read_pem(path)?;
    EncodingKey::from_rsa_pem(&pem).map_err(JwtError::Key)
}

pub fn load_decoding_key(path: &Path) -> Result<DecodingKey, JwtError> {
    let pem = read_pem(path)?;
    DecodingKey::from_rsa_pem(&pem).map_err(JwtError::Key)
}

fn read_pem(path: &Path) -> Result<Vec<u8>, JwtError> {
    std::fs::read(path).map_err(|source| JwtError::KeyFile {
        path: path.display().to_string(),
        source,
    })
}

/// Sign a token for `user_id` that expires `expires_in_hours` from now.
pub fn generate_token(
    key: &EncodingKey,
    user_id: i64,
    username: &str,
    role: &str,
    expires_in_hours: u64,
) -> Result<String, JwtError> {
    let now = unix_now();
    let claims = Claims {
        user_id,
        username: username.to_string(),
        role: role.to_string(),
        exp: now.saturating_add(expires_in_hours.saturating_mul(3600)),
        iat: now,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, key).map_err(JwtError::Sign)
}

pub fn validate_token(key: &DecodingKey, token: &str) -> Result<Claims, JwtError> {
    let validation = Validation::new(Algorithm::RS256);
    jsonwebtoken::decode::<Claims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(JwtError::Invalid)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}


#[cfg(test)]
mod tests {
    use super::test_keys::*;
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    #[test]
    fn test_generate_and_validate() {
        let token = generate_token(&encoding(), 42, "ada", "admin", 1).unwrap();
        let claims = validate_token(&decoding(), &token).unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = generate_token(&encoding(), 1, "ada", "user", 1).unwrap();
        let other = DecodingKey::from_rsa_pem(OTHER_PUBLIC_PEM).unwrap();

        let err = validate_token(&other, &token).unwrap_err();
        match err {
            JwtError::Invalid(inner) => assert!(matches!(inner.kind(), ErrorKind::InvalidSignature)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = unix_now();
        let claims = Claims {
            user_id: 1,
            username: "ada".into(),
            role: "user".into(),
            exp: now - 2 * 3600,
            iat: now - 3 * 3600,
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding()).unwrap();

        let err = validate_token(&decoding(), &token).unwrap_err();
        match err {
            JwtError::Invalid(inner) => assert!(matches!(inner.kind(), ErrorKind::ExpiredSignature)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hmac_token_rejected() {
        let claims = Claims {
            user_id: 1,
            username: "ada".into(),
            role: "user".into(),
            exp: unix_now() + 3600,
            iat: unix_now(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            validate_token(&decoding(), &token),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(validate_token(&decoding(), "not.a.token").is_err());
    }

    #[test]
    fn test_missing_key_file() {
        let Err(err) = load_decoding_key(Path::new("/nonexistent/key.pem")) else {
            panic!("expected error for missing key file");
        };
        assert!(matches!(err, JwtError::KeyFile { .. }));
        assert!(err.to_string().contains("/nonexistent/key.pem"));
    }

    #[test]
    fn test_load_keys_from_fixtures() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let enc = load_encoding_key(&dir.join("jwt_private.pem")).unwrap();
        let dec = load_decoding_key(&dir.join("jwt_public.pem")).unwrap();

        let token = generate_token(&enc, 9, "bob", "user", 24).unwrap();
        assert_eq!(validate_token(&dec, &token).unwrap().user_id, 9);
    }
}
