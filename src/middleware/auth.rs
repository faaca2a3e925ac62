use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;
use uuid::Uuid;

use crate::auth::{self, TokenKind};
use crate::db;
use crate::error::ApiError;

/// Authenticated user context injected into every protected request.
/// Permissions are the flat `resource:action` strings of the user's role,
/// resolved once per request.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub firm_id: Uuid,
    pub role_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub permissions: HashSet<String>,
}

impl AuthUser {
    pub fn has(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Permission gate called at the top of every handler, before any work.
    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("Missing permission '{}'", permission)))
        }
    }
}

/// Validates the access token, loads the user and its role's permission set,
/// and injects an `AuthUser` into request extensions.
pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing access token"))?;

    let claims = auth::decode_token(&token, TokenKind::Access)?;
    let auth_user = load_auth_user(claims.user_id).await?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Access token comes from the `fd_access` cookie; `Authorization: Bearer`
/// is accepted as a fallback for non-browser clients.
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get("cookie").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth::cookie_value(cookie_header, auth::ACCESS_COOKIE) {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn load_auth_user(user_id: Uuid) -> Result<AuthUser, ApiError> {
    let pool = db::pool().await?;

    let user = sqlx::query_as::<_, crate::models::User>(
        "SELECT * FROM users WHERE id = $1 AND is_active = true",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::unauthorized("User is inactive or no longer exists"))?;

    let permissions: Vec<String> =
        sqlx::query_scalar("SELECT permissions FROM roles WHERE id = $1")
            .bind(user.role_id)
            .fetch_optional(pool)
            .await?
            .unwrap_or_default();

    Ok(AuthUser {
        user_id: user.id,
        firm_id: user.firm_id,
        role_id: user.role_id,
        email: user.email,
        display_name: user.display_name,
        permissions: permissions.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(perms: &[&str]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            firm_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            email: "a@b.example".into(),
            display_name: "A".into(),
            permissions: perms.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn require_is_exact_membership() {
        let user = user_with(&["clients:read", "audit:export"]);
        assert!(user.require("clients:read").is_ok());
        assert!(user.require("audit:export").is_ok());
        // No wildcarding or prefix matching, flat strings only.
        assert!(user.require("clients:write").is_err());
        assert!(user.require("clients").is_err());
    }

    #[test]
    fn bearer_fallback_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer tok123".parse().unwrap());
        assert_eq!(token_from_headers(&headers), Some("tok123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("cookie", "fd_access=cookie-tok".parse().unwrap());
        headers.insert("authorization", "Bearer header-tok".parse().unwrap());
        // Cookie wins over the header fallback.
        assert_eq!(token_from_headers(&headers), Some("cookie-tok".to_string()));

        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }
}
