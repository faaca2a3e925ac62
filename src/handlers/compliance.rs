use axum::extract::{Extension, Path, Query};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::audit;
use crate::db::{
    self,
    pagination::{Page, PageParams},
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::compliance::{self, ComplianceItem, ComplianceStatus, ComplianceType};
use crate::models::Priority;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub client_id: Option<Uuid>,
    pub compliance_type: Option<ComplianceType>,
    pub status: Option<ComplianceStatus>,
    pub priority: Option<Priority>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
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
    if let Some(compliance_type) = params.compliance_type {
        qb.push(" AND compliance_type = ").push_bind(compliance_type);
    }
    if let Some(status) = params.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = params.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
    if let Some(due_from) = params.due_from {
        qb.push(" AND due_date >= ").push_bind(due_from);
    }
    if let Some(due_to) = params.due_to {
        qb.push(" AND due_date <= ").push_bind(due_to);
    }
}

/// GET /api/compliance
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Value>> {
    auth.require("compliance:read")?;
    let pool = db::pool().await?;
    let page = params.pagination();

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM compliance_items");
    apply_filters(&mut count_qb, auth.firm_id, &params);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM compliance_items");
    apply_filters(&mut qb, auth.firm_id, &params);
    qb.push(" ORDER BY due_date ASC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb.build_query_as::<ComplianceItem>().fetch_all(pool).await?;

    let today = Utc::now().date_naive();
    let items = rows.iter().map(|item| item.to_api_json(today)).collect();

    Ok(ApiResponse::success(Page::new(items, total, &page)))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingParams {
    /// Look-ahead window in days, default 30.
    pub days: Option<i64>,
}

/// GET /api/compliance/upcoming - unfinished items due within the window.
pub async fn upcoming(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<UpcomingParams>,
) -> ApiResult<Vec<Value>> {
    auth.require("compliance:read")?;
    let days = params.days.unwrap_or(30).clamp(1, 365);
    let today = Utc::now().date_naive();
    let horizon = today + chrono::Duration::days(days);

    let pool = db::pool().await?;
    let rows = sqlx::query_as::<_, ComplianceItem>(
        "SELECT * FROM compliance_items
         WHERE firm_id = $1 AND due_date <= $2 AND status NOT IN ('filed', 'approved')
         ORDER BY due_date ASC",
    )
    .bind(auth.firm_id)
    .bind(horizon)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(rows.iter().map(|item| item.to_api_json(today)).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateComplianceItem {
    pub client_id: Uuid,
    pub compliance_type: ComplianceType,
    pub period: String,
    pub due_date: NaiveDate,
    pub priority: Option<Priority>,
    pub progress: Option<i32>,
    pub notes: Option<String>,
}

/// POST /api/compliance
pub async fn create(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateComplianceItem>,
) -> ApiResult<Value> {
    auth.require("compliance:write")?;
    if payload.period.trim().is_empty() {
        return Err(ApiError::bad_request("period is required"));
    }
    let progress = payload.progress.unwrap_or(0);
    if !(0..=100).contains(&progress) {
        return Err(ApiError::bad_request("progress must be between 0 and 100"));
    }

    let today = Utc::now().date_naive();
    // New items start pending; a past due date makes them overdue immediately.
    let status = compliance::effective_status(ComplianceStatus::Pending, payload.due_date, today);

    let pool = db::pool().await?;
    let item = sqlx::query_as::<_, ComplianceItem>(
        "INSERT INTO compliance_items
             (firm_id, client_id, compliance_type, period, due_date, status, priority, progress, notes, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING *",
    )
    .bind(auth.firm_id)
    .bind(payload.client_id)
    .bind(payload.compliance_type)
    .bind(payload.period.trim())
    .bind(payload.due_date)
    .bind(status)
    .bind(payload.priority.unwrap_or(Priority::Medium))
    .bind(progress)
    .bind(&payload.notes)
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "compliance:create",
        "compliance_item",
        Some(item.id),
        json!({"period": item.period, "due_date": item.due_date}),
    )
    .await;

    Ok(ApiResponse::created(item.to_api_json(today)))
}

async fn fetch_item(id: Uuid, firm_id: Uuid) -> Result<ComplianceItem, ApiError> {
    let pool = db::pool().await?;
    sqlx::query_as::<_, ComplianceItem>(
        "SELECT * FROM compliance_items WHERE id = $1 AND firm_id = $2",
    )
    .bind(id)
    .bind(firm_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Compliance item not found"))
}

/// GET /api/compliance/:id
pub async fn get(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.require("compliance:read")?;
    let item = fetch_item(id, auth.firm_id).await?;
    Ok(ApiResponse::success(item.to_api_json(Utc::now().date_naive())))
}

#[derive(Debug, Deserialize)]
pub struct UpdateComplianceItem {
    pub compliance_type: Option<ComplianceType>,
    pub period: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<ComplianceStatus>,
    pub priority: Option<Priority>,
    pub progress: Option<i32>,
    pub notes: Option<String>,
}

/// PUT /api/compliance/:id - the stored status always goes through
/// `effective_status`, so overdue tracking follows the calendar on every save.
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateComplianceItem>,
) -> ApiResult<Value> {
    auth.require("compliance:write")?;
    let mut item = fetch_item(id, auth.firm_id).await?;

    if let Some(compliance_type) = payload.compliance_type {
        item.compliance_type = compliance_type;
    }
    if let Some(period) = payload.period {
        if period.trim().is_empty() {
            return Err(ApiError::bad_request("period cannot be empty"));
        }
        item.period = period.trim().to_string();
    }
    if let Some(due_date) = payload.due_date {
        item.due_date = due_date;
    }
    if let Some(status) = payload.status {
        item.status = status;
    }
    if let Some(priority) = payload.priority {
        item.priority = priority;
    }
    if let Some(progress) = payload.progress {
        if !(0..=100).contains(&progress) {
            return Err(ApiError::bad_request("progress must be between 0 and 100"));
        }
        item.progress = progress;
    }
    if let Some(notes) = payload.notes {
        item.notes = Some(notes);
    }

    let today = Utc::now().date_naive();
    let status = compliance::effective_status(item.status, item.due_date, today);
    // First transition into filed stamps the filing time.
    let filed_at = match (status, item.filed_at) {
        (ComplianceStatus::Filed | ComplianceStatus::Approved, None) => Some(Utc::now()),
        (ComplianceStatus::Filed | ComplianceStatus::Approved, existing) => existing,
        _ => None,
    };

    let pool = db::pool().await?;
    let item = sqlx::query_as::<_, ComplianceItem>(
        "UPDATE compliance_items
         SET compliance_type = $1, period = $2, due_date = $3, status = $4,
             priority = $5, progress = $6, notes = $7, filed_at = $8, updated_at = now()
         WHERE id = $9 AND firm_id = $10
         RETURNING *",
    )
    .bind(item.compliance_type)
    .bind(&item.period)
    .bind(item.due_date)
    .bind(status)
    .bind(item.priority)
    .bind(item.progress)
    .bind(&item.notes)
    .bind(filed_at)
    .bind(id)
    .bind(auth.firm_id)
    .fetch_one(pool)
    .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "compliance:update",
        "compliance_item",
        Some(id),
        json!({"status": status}),
    )
    .await;

    Ok(ApiResponse::success(item.to_api_json(today)))
}

/// DELETE /api/compliance/:id
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.require("compliance:write")?;
    fetch_item(id, auth.firm_id).await?;

    let pool = db::pool().await?;
    sqlx::query("DELETE FROM compliance_items WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(auth.firm_id)
        .execute(pool)
        .await?;

    audit::record(auth.firm_id, auth.user_id, "compliance:delete", "compliance_item", Some(id), json!({}))
        .await;

    Ok(ApiResponse::success(json!({"deleted": id})))
}
