use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::audit;
use crate::db::{
    self,
    pagination::{Page, PageParams},
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{Client, ClientStatus, ClientType};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Case-insensitive search over name and email.
    pub q: Option<String>,
    pub status: Option<ClientStatus>,
    pub client_type: Option<ClientType>,
}

impl ListParams {
    fn pagination(&self) -> PageParams {
        PageParams { page: self.page, limit: self.limit }
    }
}

fn apply_filters(qb: &mut QueryBuilder<Postgres>, firm_id: Uuid, params: &ListParams) {
    qb.push(" WHERE firm_id = ").push_bind(firm_id);
    if let Some(status) = params.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(client_type) = params.client_type {
        qb.push(" AND client_type = ").push_bind(client_type);
    }
    if let Some(q) = params.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = format!("%{}%", q.trim());
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// GET /api/clients
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Client>> {
    auth.require("clients:read")?;
    let pool = db::pool().await?;
    let page = params.pagination();

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM clients");
    apply_filters(&mut count_qb, auth.firm_id, &params);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM clients");
    apply_filters(&mut qb, auth.firm_id, &params);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<Client>().fetch_all(pool).await?;

    Ok(ApiResponse::success(Page::new(items, total, &page)))
}

#[derive(Debug, Deserialize)]
pub struct CreateClient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub pan: Option<String>,
    pub gstin: Option<String>,
    pub client_type: ClientType,
}

/// POST /api/clients
pub async fn create(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateClient>,
) -> ApiResult<Client> {
    auth.require("clients:write")?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    let pool = db::pool().await?;
    let client = sqlx::query_as::<_, Client>(
        "INSERT INTO clients (firm_id, name, email, phone, pan, gstin, client_type, status, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'active', $8)
         RETURNING *",
    )
    .bind(auth.firm_id)
    .bind(payload.name.trim())
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.pan)
    .bind(&payload.gstin)
    .bind(payload.client_type)
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "clients:create",
        "client",
        Some(client.id),
        json!({"name": client.name}),
    )
    .await;

    Ok(ApiResponse::created(client))
}

async fn fetch_client(id: Uuid, firm_id: Uuid) -> Result<Client, ApiError> {
    let pool = db::pool().await?;
    sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(firm_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Client not found"))
}

/// GET /api/clients/:id
pub async fn get(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Client> {
    auth.require("clients:read")?;
    Ok(ApiResponse::success(fetch_client(id, auth.firm_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub pan: Option<String>,
    pub gstin: Option<String>,
    pub client_type: Option<ClientType>,
    pub status: Option<ClientStatus>,
}

/// PUT /api/clients/:id
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClient>,
) -> ApiResult<Client> {
    auth.require("clients:write")?;
    let mut client = fetch_client(id, auth.firm_id).await?;

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("name cannot be empty"));
        }
        client.name = name.trim().to_string();
    }
    if let Some(email) = payload.email {
        client.email = Some(email);
    }
    if let Some(phone) = payload.phone {
        client.phone = Some(phone);
    }
    if let Some(pan) = payload.pan {
        client.pan = Some(pan);
    }
    if let Some(gstin) = payload.gstin {
        client.gstin = Some(gstin);
    }
    if let Some(client_type) = payload.client_type {
        client.client_type = client_type;
    }
    if let Some(status) = payload.status {
        client.status = status;
    }

    let pool = db::pool().await?;
    let client = sqlx::query_as::<_, Client>(
        "UPDATE clients
         SET name = $1, email = $2, phone = $3, pan = $4, gstin = $5,
             client_type = $6, status = $7, updated_at = now()
         WHERE id = $8 AND firm_id = $9
         RETURNING *",
    )
    .bind(&client.name)
    .bind(&client.email)
    .bind(&client.phone)
    .bind(&client.pan)
    .bind(&client.gstin)
    .bind(client.client_type)
    .bind(client.status)
    .bind(id)
    .bind(auth.firm_id)
    .fetch_one(pool)
    .await?;

    audit::record(auth.firm_id, auth.user_id, "clients:update", "client", Some(id), json!({})).await;

    Ok(ApiResponse::success(client))
}

/// DELETE /api/clients/:id
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    auth.require("clients:write")?;
    let client = fetch_client(id, auth.firm_id).await?;

    let pool = db::pool().await?;
    sqlx::query("DELETE FROM clients WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(auth.firm_id)
        .execute(pool)
        .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "clients:delete",
        "client",
        Some(id),
        json!({"name": client.name}),
    )
    .await;

    Ok(ApiResponse::success(json!({"deleted": id})))
}
