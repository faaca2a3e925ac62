use axum::extract::{Extension, Path, Query};
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
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
use crate::models::{Project, ProjectStatus};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub client_id: Option<Uuid>,
    pub status: Option<ProjectStatus>,
}

impl ListParams {
    fn pagination(&self) -> PageParams {
        PageParams { page: self.page, limit: self.limit }
    }
}

fn apply_filters(qb: &mut QueryBuilder<Postgres>, firm_id: Uuid, params: &ListParams) {
    qb.push(" WHERE firm_id = ").push_bind(firm_id);
    if let Some(client_id) = params.client_id {
        qb.push(" AND client_id = ").push_bind(client_id);
    }
    if let Some(status) = params.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(q) = params.q.as_deref().filter(|q| !q.trim().is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(format!("%{}%", q.trim()));
    }
}

/// GET /api/projects
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Project>> {
    auth.require("projects:read")?;
    let pool = db::pool().await?;
    let page = params.pagination();

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM projects");
    apply_filters(&mut count_qb, auth.firm_id, &params);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM projects");
    apply_filters(&mut qb, auth.firm_id, &params);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<Project>().fetch_all(pool).await?;

    Ok(ApiResponse::success(Page::new(items, total, &page)))
}

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub estimated_fee: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// POST /api/projects
pub async fn create(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateProject>,
) -> ApiResult<Project> {
    auth.require("projects:write")?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    let pool = db::pool().await?;

    // The client must belong to the same firm.
    let client_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1 AND firm_id = $2)")
            .bind(payload.client_id)
            .bind(auth.firm_id)
            .fetch_one(pool)
            .await?;
    if !client_exists {
        return Err(ApiError::bad_request("client_id does not reference a client of this firm"));
    }

    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO projects (firm_id, client_id, name, description, status, estimated_fee, start_date, end_date, created_by)
         VALUES ($1, $2, $3, $4, 'planned', $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(auth.firm_id)
    .bind(payload.client_id)
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.estimated_fee)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "projects:create",
        "project",
        Some(project.id),
        json!({"name": project.name, "client_id": project.client_id}),
    )
    .await;

    Ok(ApiResponse::created(project))
}

async fn fetch_project(id: Uuid, firm_id: Uuid) -> Result<Project, ApiError> {
    let pool = db::pool().await?;
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(firm_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

/// GET /api/projects/:id
pub async fn get(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Project> {
    auth.require("projects:read")?;
    Ok(ApiResponse::success(fetch_project(id, auth.firm_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub estimated_fee: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// PUT /api/projects/:id
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProject>,
) -> ApiResult<Project> {
    auth.require("projects:write")?;
    let mut project = fetch_project(id, auth.firm_id).await?;

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("name cannot be empty"));
        }
        project.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        project.description = Some(description);
    }
    if let Some(status) = payload.status {
        project.status = status;
    }
    if let Some(fee) = payload.estimated_fee {
        project.estimated_fee = Some(fee);
    }
    if let Some(start_date) = payload.start_date {
        project.start_date = Some(start_date);
    }
    if let Some(end_date) = payload.end_date {
        project.end_date = Some(end_date);
    }

    let pool = db::pool().await?;
    let project = sqlx::query_as::<_, Project>(
        "UPDATE projects
         SET name = $1, description = $2, status = $3, estimated_fee = $4,
             start_date = $5, end_date = $6, updated_at = now()
         WHERE id = $7 AND firm_id = $8
         RETURNING *",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status)
    .bind(project.estimated_fee)
    .bind(project.start_date)
    .bind(project.end_date)
    .bind(id)
    .bind(auth.firm_id)
    .fetch_one(pool)
    .await?;

    audit::record(auth.firm_id, auth.user_id, "projects:update", "project", Some(id), json!({})).await;

    Ok(ApiResponse::success(project))
}

/// DELETE /api/projects/:id
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    auth.require("projects:write")?;
    fetch_project(id, auth.firm_id).await?;

    let pool = db::pool().await?;
    sqlx::query("DELETE FROM projects WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(auth.firm_id)
        .execute(pool)
        .await?;

    audit::record(auth.firm_id, auth.user_id, "projects:delete", "project", Some(id), json!({})).await;

    Ok(ApiResponse::success(json!({"deleted": id})))
}
