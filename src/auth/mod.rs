use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

pub const ACCESS_COOKIE: &str = "fd_access";
pub const REFRESH_COOKIE: &str = "fd_refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub firm_id: Uuid,
    pub role_id: Uuid,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, firm_id: Uuid, role_id: Uuid, kind: TokenKind) -> Self {
        let now = Utc::now();
        let security = &config::config().security;
        let lifetime = match kind {
            TokenKind::Access => Duration::minutes(security.access_expiry_mins),
            TokenKind::Refresh => Duration::hours(security.refresh_expiry_hours),
        };

        Self {
            user_id,
            firm_id,
            role_id,
            kind,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Wrong token kind for this endpoint")]
    WrongKind,
}

pub fn issue_token(claims: &Claims) -> Result<String, AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|_| AuthError::InvalidToken)
}

/// Decode and validate a token, enforcing the expected kind so a refresh
/// token can never be replayed where an access token is required.
pub fn decode_token(token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::InvalidToken)?;

    if data.claims.kind != expected {
        return Err(AuthError::WrongKind);
    }
    Ok(data.claims)
}

/// Issue the access/refresh cookie pair for a user.
pub fn issue_session(user_id: Uuid, firm_id: Uuid, role_id: Uuid) -> Result<(String, String), AuthError> {
    let security = &config::config().security;
    let access = issue_token(&Claims::new(user_id, firm_id, role_id, TokenKind::Access))?;
    let refresh = issue_token(&Claims::new(user_id, firm_id, role_id, TokenKind::Refresh))?;

    Ok((
        session_cookie(ACCESS_COOKIE, &access, security.access_expiry_mins * 60),
        session_cookie(REFRESH_COOKIE, &refresh, security.refresh_expiry_hours * 3600),
    ))
}

pub fn session_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", name, value, max_age_secs);
    if config::config().security.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn expired_cookie(name: &str) -> String {
    session_cookie(name, "", 0)
}

/// Pull a named cookie out of a `Cookie` request header value.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|part| {
        let (k, v) = part.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}

pub fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", salt, password).as_bytes());
    format!("{:x}", digest)
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let salt = generate_salt();
        let hash = hash_password("s3cret", &salt);
        assert!(verify_password("s3cret", &salt, &hash));
        assert!(!verify_password("s3cret!", &salt, &hash));
        // Same password, different salt, different hash.
        assert_ne!(hash, hash_password("s3cret", &generate_salt()));
    }

    #[test]
    fn token_round_trip_enforces_kind() {
        // Development config carries a fallback secret.
        let claims = Claims::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), TokenKind::Access);
        let token = issue_token(&claims).expect("issue");

        let decoded = decode_token(&token, TokenKind::Access).expect("decode");
        assert_eq!(decoded.user_id, claims.user_id);
        assert_eq!(decoded.firm_id, claims.firm_id);

        assert!(matches!(decode_token(&token, TokenKind::Refresh), Err(AuthError::WrongKind)));
        assert!(matches!(decode_token("not-a-jwt", TokenKind::Access), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn cookie_parsing() {
        let header = "fd_access=abc.def.ghi; other=1; fd_refresh=zzz";
        assert_eq!(cookie_value(header, ACCESS_COOKIE), Some("abc.def.ghi"));
        assert_eq!(cookie_value(header, REFRESH_COOKIE), Some("zzz"));
        assert_eq!(cookie_value(header, "missing"), None);
    }
}
