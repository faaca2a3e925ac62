use axum::extract::Extension;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::db;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/reports/dashboard - headline numbers for the firm's landing page.
pub async fn dashboard(Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    auth.require("reports:read")?;
    let pool = db::pool().await?;
    let today = Utc::now().date_naive();

    let active_clients: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM clients WHERE firm_id = $1 AND status = 'active'",
    )
    .bind(auth.firm_id)
    .fetch_one(pool)
    .await?;

    let open_tasks: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE firm_id = $1 AND status <> 'done'",
    )
    .bind(auth.firm_id)
    .fetch_one(pool)
    .await?;

    // Counted against the calendar, not the stored status, so items that
    // slipped past their due date since the last save are included.
    let overdue_compliance: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM compliance_items
         WHERE firm_id = $1 AND due_date < $2 AND status NOT IN ('filed', 'approved')",
    )
    .bind(auth.firm_id)
    .bind(today)
    .fetch_one(pool)
    .await?;

    let unread_notifications: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
    )
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    let (total_debit, total_credit): (Decimal, Decimal) = sqlx::query_as(
        "SELECT COALESCE(SUM(debit), 0), COALESCE(SUM(credit), 0)
         FROM ledger_entries WHERE firm_id = $1",
    )
    .bind(auth.firm_id)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success(json!({
        "active_clients": active_clients,
        "open_tasks": open_tasks,
        "overdue_compliance": overdue_compliance,
        "unread_notifications": unread_notifications,
        "ledger": {
            "total_debit": total_debit,
            "total_credit": total_credit,
        }
    })))
}
