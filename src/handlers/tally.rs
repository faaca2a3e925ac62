use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::audit;
use crate::db::{
    self,
    pagination::{Page, PageParams},
};
use crate::error::ApiError;
use crate::handlers::ledger::next_balance;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{SyncStatus, TallySync};
use crate::tally;

/// Keep only the first few row errors on the job record.
const ERROR_SAMPLE_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub client_id: Uuid,
    pub file_name: String,
    /// Raw CSV content of the Tally export.
    pub content: String,
}

/// POST /api/tally/import - parse a Tally export and load it into the ledger.
/// Runs synchronously; the TallySync row carries counters and row errors.
pub async fn import(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<ImportRequest>,
) -> ApiResult<TallySync> {
    auth.require("tally:import")?;
    if payload.file_name.trim().is_empty() {
        return Err(ApiError::bad_request("file_name is required"));
    }

    let pool = db::pool().await?;
    let client_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1 AND firm_id = $2)")
            .bind(payload.client_id)
            .bind(auth.firm_id)
            .fetch_one(pool)
            .await?;
    if !client_exists {
        return Err(ApiError::bad_request("client_id does not reference a client of this firm"));
    }

    let (rows, mut errors) = tally::parse_csv(&payload.content);
    if rows.is_empty() {
        return Err(ApiError::bad_request("No parseable rows in the uploaded file"));
    }
    let total_rows = (rows.len() + errors.len()) as i32;

    let sync = sqlx::query_as::<_, TallySync>(
        "INSERT INTO tally_syncs (firm_id, client_id, file_name, status, total_rows, started_by)
         VALUES ($1, $2, $3, 'processing', $4, $5)
         RETURNING *",
    )
    .bind(auth.firm_id)
    .bind(payload.client_id)
    .bind(payload.file_name.trim())
    .bind(total_rows)
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    let mut imported = 0i32;
    for row in rows {
        match import_row(auth.firm_id, payload.client_id, auth.user_id, &row).await {
            Ok(_) => imported += 1,
            Err(e) => {
                tracing::warn!("tally import row failed: {}", e);
                errors.push(format!("{} {}: import failed", row.entry_date, row.voucher_type));
            }
        }
    }

    let failed = total_rows - imported;
    let status = if imported > 0 { SyncStatus::Completed } else { SyncStatus::Failed };
    errors.truncate(ERROR_SAMPLE_LIMIT);

    let sync = sqlx::query_as::<_, TallySync>(
        "UPDATE tally_syncs
         SET status = $1, imported_rows = $2, failed_rows = $3, errors = $4, completed_at = now()
         WHERE id = $5
         RETURNING *",
    )
    .bind(status)
    .bind(imported)
    .bind(failed)
    .bind(SqlJson(errors))
    .bind(sync.id)
    .fetch_one(pool)
    .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "tally:import",
        "tally_sync",
        Some(sync.id),
        json!({"file_name": sync.file_name, "imported": imported, "failed": failed}),
    )
    .await;

    Ok(ApiResponse::created(sync))
}

/// Balance lookup plus insert for one parsed row. Any failure here is
/// recorded on the sync job; the import itself always reaches a terminal
/// status.
async fn import_row(
    firm_id: Uuid,
    client_id: Uuid,
    user_id: Uuid,
    row: &tally::TallyRow,
) -> Result<(), ApiError> {
    let balance = next_balance(firm_id, client_id, row.debit, row.credit).await?;
    let pool = db::pool().await?;
    sqlx::query(
        "INSERT INTO ledger_entries
             (firm_id, client_id, entry_date, voucher_type, narration, debit, credit, balance, source, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'tally', $9)",
    )
    .bind(firm_id)
    .bind(client_id)
    .bind(row.entry_date)
    .bind(&row.voucher_type)
    .bind(&row.narration)
    .bind(row.debit)
    .bind(row.credit)
    .bind(balance)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListParams {
    fn pagination(&self) -> PageParams {
        PageParams { page: self.page, limit: self.limit }
    }
}

/// GET /api/tally/syncs - import job history, newest first.
pub async fn list_syncs(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<TallySync>> {
    auth.require("tally:read")?;
    let pool = db::pool().await?;
    let page = params.pagination();

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tally_syncs WHERE firm_id = $1")
        .bind(auth.firm_id)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, TallySync>(
        "SELECT * FROM tally_syncs WHERE firm_id = $1
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(auth.firm_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(Page::new(items, total, &page)))
}

/// GET /api/tally/syncs/:id
pub async fn get_sync(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<TallySync> {
    auth.require("tally:read")?;
    let pool = db::pool().await?;
    let sync = sqlx::query_as::<_, TallySync>(
        "SELECT * FROM tally_syncs WHERE id = $1 AND firm_id = $2",
    )
    .bind(id)
    .bind(auth.firm_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Sync job not found"))?;

    Ok(ApiResponse::success(sync))
}
