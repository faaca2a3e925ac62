use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{
    self,
    pagination::{Page, PageParams},
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::Notification;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// When true, only notifications that have not been read.
    #[serde(default)]
    pub unread: bool,
}

impl ListParams {
    fn pagination(&self) -> PageParams {
        PageParams { page: self.page, limit: self.limit }
    }
}

/// GET /api/notifications - always scoped to the calling user.
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Notification>> {
    let pool = db::pool().await?;
    let page = params.pagination();

    let unread_clause = if params.unread { " AND read_at IS NULL" } else { "" };

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1{}",
        unread_clause
    ))
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, Notification>(&format!(
        "SELECT * FROM notifications WHERE user_id = $1{}
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        unread_clause
    ))
    .bind(auth.user_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(Page::new(items, total, &page)))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Notification> {
    let pool = db::pool().await?;
    let notification = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET read_at = COALESCE(read_at, now())
         WHERE id = $1 AND user_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    Ok(ApiResponse::success(notification))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = db::pool().await?;
    let result = sqlx::query(
        "UPDATE notifications SET read_at = now() WHERE user_id = $1 AND read_at IS NULL",
    )
    .bind(auth.user_id)
    .execute(pool)
    .await?;

    Ok(ApiResponse::success(json!({"marked_read": result.rows_affected()})))
}
