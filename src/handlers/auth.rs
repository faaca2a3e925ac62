use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{self, TokenKind, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::db;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::User;
use crate::{audit, config};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login - verify credentials, set the access/refresh cookie pair.
pub async fn login(Json(payload): Json<LoginRequest>) -> Result<impl IntoResponse, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    let pool = db::pool().await?;
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE lower(email) = lower($1) AND is_active = true",
    )
    .bind(payload.email.trim())
    .fetch_optional(pool)
    .await?;

    // Same response whether the user is missing or the password is wrong.
    let user = user
        .filter(|u| auth::verify_password(&payload.password, &u.password_salt, &u.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let (access_cookie, refresh_cookie) = auth::issue_session(user.id, user.firm_id, user.role_id)?;

    audit::record(user.firm_id, user.id, "auth:login", "user", Some(user.id), json!({})).await;

    Ok((
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Json(json!({
            "success": true,
            "data": {
                "user": user,
                "expires_in": config::config().security.access_expiry_mins * 60
            }
        })),
    ))
}

/// POST /api/auth/refresh - rotate both cookies from a valid refresh token.
/// Lives outside the auth middleware so it works with an expired access token.
pub async fn refresh(headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let cookie_header = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;
    let token = auth::cookie_value(cookie_header, REFRESH_COOKIE)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;

    let claims = auth::decode_token(token, TokenKind::Refresh)?;

    // The user must still exist and be active; role may have changed since issue.
    let pool = db::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = true")
        .bind(claims.user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User is inactive or no longer exists"))?;

    let (access_cookie, refresh_cookie) = auth::issue_session(user.id, user.firm_id, user.role_id)?;

    Ok((
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Json(json!({
            "success": true,
            "data": { "expires_in": config::config().security.access_expiry_mins * 60 }
        })),
    ))
}

/// POST /api/auth/logout - clear both cookies. Works even with an expired
/// session; the audit entry is written only when the caller is identifiable.
pub async fn logout(headers: HeaderMap) -> impl IntoResponse {
    if let Some(cookie_header) = headers.get("cookie").and_then(|v| v.to_str().ok()) {
        if let Some(claims) = auth::cookie_value(cookie_header, ACCESS_COOKIE)
            .and_then(|t| auth::decode_token(t, TokenKind::Access).ok())
        {
            audit::record(claims.firm_id, claims.user_id, "auth:logout", "user", Some(claims.user_id), json!({}))
                .await;
        }
    }

    (
        AppendHeaders([
            (SET_COOKIE, auth::expired_cookie(ACCESS_COOKIE)),
            (SET_COOKIE, auth::expired_cookie(REFRESH_COOKIE)),
        ]),
        Json(json!({"success": true, "data": {}})),
    )
}

/// GET /api/auth/whoami - current user, role and permission set.
pub async fn whoami(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let mut permissions: Vec<&String> = auth_user.permissions.iter().collect();
    permissions.sort();

    Ok(ApiResponse::success(json!({
        "user_id": auth_user.user_id,
        "firm_id": auth_user.firm_id,
        "role_id": auth_user.role_id,
        "email": auth_user.email,
        "display_name": auth_user.display_name,
        "permissions": permissions,
    })))
}
