use axum::extract::{Extension, Path, Query};
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::audit;
use crate::db::{
    self,
    pagination::{Page, PageParams},
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{EntrySource, LedgerEntry};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub client_id: Option<Uuid>,
    pub source: Option<EntrySource>,
    pub voucher_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
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
    if let Some(source) = params.source {
        qb.push(" AND source = ").push_bind(source);
    }
    if let Some(voucher_type) = params.voucher_type.as_deref().filter(|v| !v.is_empty()) {
        qb.push(" AND voucher_type ILIKE ").push_bind(voucher_type.to_string());
    }
    if let Some(from) = params.from {
        qb.push(" AND entry_date >= ").push_bind(from);
    }
    if let Some(to) = params.to {
        qb.push(" AND entry_date <= ").push_bind(to);
    }
}

/// GET /api/ledger
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<LedgerEntry>> {
    auth.require("ledger:read")?;
    let pool = db::pool().await?;
    let page = params.pagination();

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM ledger_entries");
    apply_filters(&mut count_qb, auth.firm_id, &params);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM ledger_entries");
    apply_filters(&mut qb, auth.firm_id, &params);
    qb.push(" ORDER BY entry_date DESC, created_at DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<LedgerEntry>().fetch_all(pool).await?;

    Ok(ApiResponse::success(Page::new(items, total, &page)))
}

#[derive(Debug, Deserialize)]
pub struct CreateEntry {
    pub client_id: Uuid,
    pub entry_date: NaiveDate,
    pub voucher_type: String,
    pub narration: Option<String>,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
}

/// Running balance continues from the client's latest entry.
pub(crate) async fn next_balance(
    firm_id: Uuid,
    client_id: Uuid,
    debit: Decimal,
    credit: Decimal,
) -> Result<Decimal, ApiError> {
    let pool = db::pool().await?;
    let current: Option<Decimal> = sqlx::query_scalar(
        "SELECT balance FROM ledger_entries
         WHERE firm_id = $1 AND client_id = $2
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(firm_id)
    .bind(client_id)
    .fetch_optional(pool)
    .await?;

    Ok(current.unwrap_or(Decimal::ZERO) + debit - credit)
}

/// POST /api/ledger - manual entry.
pub async fn create(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateEntry>,
) -> ApiResult<LedgerEntry> {
    auth.require("ledger:write")?;
    if payload.voucher_type.trim().is_empty() {
        return Err(ApiError::bad_request("voucher_type is required"));
    }
    if payload.debit.is_sign_negative() || payload.credit.is_sign_negative() {
        return Err(ApiError::bad_request("debit and credit must not be negative"));
    }
    if payload.debit.is_zero() && payload.credit.is_zero() {
        return Err(ApiError::bad_request("either debit or credit must be non-zero"));
    }

    let balance = next_balance(auth.firm_id, payload.client_id, payload.debit, payload.credit).await?;

    let pool = db::pool().await?;
    let entry = sqlx::query_as::<_, LedgerEntry>(
        "INSERT INTO ledger_entries
             (firm_id, client_id, entry_date, voucher_type, narration, debit, credit, balance, source, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'manual', $9)
         RETURNING *",
    )
    .bind(auth.firm_id)
    .bind(payload.client_id)
    .bind(payload.entry_date)
    .bind(payload.voucher_type.trim())
    .bind(&payload.narration)
    .bind(payload.debit)
    .bind(payload.credit)
    .bind(balance)
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "ledger:create",
        "ledger_entry",
        Some(entry.id),
        json!({"client_id": entry.client_id, "debit": entry.debit, "credit": entry.credit}),
    )
    .await;

    Ok(ApiResponse::created(entry))
}

/// GET /api/ledger/:id
pub async fn get(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<LedgerEntry> {
    auth.require("ledger:read")?;
    let pool = db::pool().await?;
    let entry = sqlx::query_as::<_, LedgerEntry>(
        "SELECT * FROM ledger_entries WHERE id = $1 AND firm_id = $2",
    )
    .bind(id)
    .bind(auth.firm_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Ledger entry not found"))?;

    Ok(ApiResponse::success(entry))
}

/// DELETE /api/ledger/:id - manual entries only; imported rows are immutable.
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    auth.require("ledger:write")?;
    let pool = db::pool().await?;

    let entry = sqlx::query_as::<_, LedgerEntry>(
        "SELECT * FROM ledger_entries WHERE id = $1 AND firm_id = $2",
    )
    .bind(id)
    .bind(auth.firm_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Ledger entry not found"))?;

    if entry.source == EntrySource::Tally {
        return Err(ApiError::bad_request("Imported entries cannot be deleted"));
    }

    sqlx::query("DELETE FROM ledger_entries WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(auth.firm_id)
        .execute(pool)
        .await?;

    audit::record(auth.firm_id, auth.user_id, "ledger:delete", "ledger_entry", Some(id), json!({})).await;

    Ok(ApiResponse::success(json!({"deleted": id})))
}

#[derive(Debug, Serialize, FromRow)]
pub struct ClientTotals {
    pub client_id: Uuid,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub entries: i64,
}

/// GET /api/ledger/summary - per-client debit/credit totals for the firm.
pub async fn summary(Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<ClientTotals>> {
    auth.require("ledger:read")?;
    let pool = db::pool().await?;

    let rows = sqlx::query_as::<_, ClientTotals>(
        "SELECT client_id,
                COALESCE(SUM(debit), 0) AS total_debit,
                COALESCE(SUM(credit), 0) AS total_credit,
                COUNT(*) AS entries
         FROM ledger_entries
         WHERE firm_id = $1
         GROUP BY client_id
         ORDER BY client_id",
    )
    .bind(auth.firm_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(rows))
}
