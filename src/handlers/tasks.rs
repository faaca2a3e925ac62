use axum::extract::{Extension, Path, Query};
use axum::Json;
use chrono::NaiveDate;
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
use crate::models::{Priority, TaskItem, TaskStatus};
use crate::notify;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub project_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<TaskStatus>,
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
    if let Some(project_id) = params.project_id {
        qb.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(assigned_to) = params.assigned_to {
        qb.push(" AND assigned_to = ").push_bind(assigned_to);
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

/// GET /api/tasks
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<TaskItem>> {
    auth.require("tasks:read")?;
    let pool = db::pool().await?;
    let page = params.pagination();

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
    apply_filters(&mut count_qb, auth.firm_id, &params);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM tasks");
    apply_filters(&mut qb, auth.firm_id, &params);
    qb.push(" ORDER BY due_date ASC NULLS LAST, created_at DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<TaskItem>().fetch_all(pool).await?;

    Ok(ApiResponse::success(Page::new(items, total, &page)))
}

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// POST /api/tasks
pub async fn create(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateTask>,
) -> ApiResult<TaskItem> {
    auth.require("tasks:write")?;
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let pool = db::pool().await?;
    let task = sqlx::query_as::<_, TaskItem>(
        "INSERT INTO tasks (firm_id, project_id, client_id, title, description, status, priority, assigned_to, due_date, created_by)
         VALUES ($1, $2, $3, $4, $5, 'todo', $6, $7, $8, $9)
         RETURNING *",
    )
    .bind(auth.firm_id)
    .bind(payload.project_id)
    .bind(payload.client_id)
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.priority.unwrap_or(Priority::Medium))
    .bind(payload.assigned_to)
    .bind(payload.due_date)
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    if let Some(assignee) = task.assigned_to {
        if assignee != auth.user_id {
            notify::notify(
                auth.firm_id,
                assignee,
                "Task assigned to you",
                &task.title,
                "task_assigned",
            )
            .await;
        }
    }

    audit::record(
        auth.firm_id,
        auth.user_id,
        "tasks:create",
        "task",
        Some(task.id),
        json!({"title": task.title}),
    )
    .await;

    Ok(ApiResponse::created(task))
}

async fn fetch_task(id: Uuid, firm_id: Uuid) -> Result<TaskItem, ApiError> {
    let pool = db::pool().await?;
    sqlx::query_as::<_, TaskItem>("SELECT * FROM tasks WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(firm_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

/// GET /api/tasks/:id
pub async fn get(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<TaskItem> {
    auth.require("tasks:read")?;
    Ok(ApiResponse::success(fetch_task(id, auth.firm_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// PUT /api/tasks/:id
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTask>,
) -> ApiResult<TaskItem> {
    auth.require("tasks:write")?;
    let mut task = fetch_task(id, auth.firm_id).await?;
    let previous_assignee = task.assigned_to;

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("title cannot be empty"));
        }
        task.title = title.trim().to_string();
    }
    if let Some(description) = payload.description {
        task.description = Some(description);
    }
    if let Some(status) = payload.status {
        task.status = status;
    }
    if let Some(priority) = payload.priority {
        task.priority = priority;
    }
    if let Some(assigned_to) = payload.assigned_to {
        task.assigned_to = Some(assigned_to);
    }
    if let Some(due_date) = payload.due_date {
        task.due_date = Some(due_date);
    }

    let pool = db::pool().await?;
    let task = sqlx::query_as::<_, TaskItem>(
        "UPDATE tasks
         SET title = $1, description = $2, status = $3, priority = $4,
             assigned_to = $5, due_date = $6, updated_at = now()
         WHERE id = $7 AND firm_id = $8
         RETURNING *",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.assigned_to)
    .bind(task.due_date)
    .bind(id)
    .bind(auth.firm_id)
    .fetch_one(pool)
    .await?;

    if let Some(assignee) = task.assigned_to {
        if Some(assignee) != previous_assignee && assignee != auth.user_id {
            notify::notify(
                auth.firm_id,
                assignee,
                "Task assigned to you",
                &task.title,
                "task_assigned",
            )
            .await;
        }
    }

    audit::record(auth.firm_id, auth.user_id, "tasks:update", "task", Some(id), json!({})).await;

    Ok(ApiResponse::success(task))
}

/// DELETE /api/tasks/:id
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    auth.require("tasks:write")?;
    fetch_task(id, auth.firm_id).await?;

    let pool = db::pool().await?;
    sqlx::query("DELETE FROM tasks WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(auth.firm_id)
        .execute(pool)
        .await?;

    audit::record(auth.firm_id, auth.user_id, "tasks:delete", "task", Some(id), json!({})).await;

    Ok(ApiResponse::success(json!({"deleted": id})))
}
