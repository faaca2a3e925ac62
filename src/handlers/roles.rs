use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::audit;
use crate::db;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::role::{is_valid_permission, Role};

/// GET /api/roles - roles are few per firm, no pagination.
pub async fn list(Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<Role>> {
    auth.require("roles:read")?;
    let pool = db::pool().await?;
    let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE firm_id = $1 ORDER BY name")
        .bind(auth.firm_id)
        .fetch_all(pool)
        .await?;

    Ok(ApiResponse::success(roles))
}

fn validate_permissions(permissions: &[String]) -> Result<(), ApiError> {
    for p in permissions {
        if !is_valid_permission(p) {
            return Err(ApiError::bad_request(format!(
                "'{}' is not a valid resource:action permission string",
                p
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// POST /api/roles
pub async fn create(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateRole>,
) -> ApiResult<Role> {
    auth.require("roles:write")?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    validate_permissions(&payload.permissions)?;

    let pool = db::pool().await?;
    let role = sqlx::query_as::<_, Role>(
        "INSERT INTO roles (firm_id, name, description, permissions)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(auth.firm_id)
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(&payload.permissions)
    .fetch_one(pool)
    .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "roles:create",
        "role",
        Some(role.id),
        json!({"name": role.name, "permissions": role.permissions}),
    )
    .await;

    Ok(ApiResponse::created(role))
}

async fn fetch_role(id: Uuid, firm_id: Uuid) -> Result<Role, ApiError> {
    let pool = db::pool().await?;
    sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(firm_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// PUT /api/roles/:id - permission changes take effect on the next request,
/// since the permission set is resolved per request.
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRole>,
) -> ApiResult<Role> {
    auth.require("roles:write")?;
    let mut role = fetch_role(id, auth.firm_id).await?;

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("name cannot be empty"));
        }
        role.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        role.description = Some(description);
    }
    if let Some(permissions) = payload.permissions {
        validate_permissions(&permissions)?;
        role.permissions = permissions;
    }

    let pool = db::pool().await?;
    let role = sqlx::query_as::<_, Role>(
        "UPDATE roles SET name = $1, description = $2, permissions = $3, updated_at = now()
         WHERE id = $4 AND firm_id = $5
         RETURNING *",
    )
    .bind(&role.name)
    .bind(&role.description)
    .bind(&role.permissions)
    .bind(id)
    .bind(auth.firm_id)
    .fetch_one(pool)
    .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "roles:update",
        "role",
        Some(id),
        json!({"permissions": role.permissions}),
    )
    .await;

    Ok(ApiResponse::success(role))
}

/// DELETE /api/roles/:id - rejected while any user still references the role.
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.require("roles:write")?;
    let role = fetch_role(id, auth.firm_id).await?;

    let pool = db::pool().await?;
    let users_with_role: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if users_with_role > 0 {
        return Err(ApiError::bad_request(format!(
            "Role '{}' is assigned to {} user(s) and cannot be deleted",
            role.name, users_with_role
        )));
    }

    sqlx::query("DELETE FROM roles WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(auth.firm_id)
        .execute(pool)
        .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "roles:delete",
        "role",
        Some(id),
        json!({"name": role.name}),
    )
    .await;

    Ok(ApiResponse::success(json!({"deleted": id})))
}
