use axum::extract::{Extension, Query};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{
    self,
    pagination::{Page, PageParams},
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::AuditLog;
use crate::{audit, config};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ListParams {
    fn pagination(&self) -> PageParams {
        PageParams { page: self.page, limit: self.limit }
    }
}

fn apply_filters(qb: &mut QueryBuilder<Postgres>, firm_id: Uuid, params: &ListParams) {
    qb.push(" WHERE firm_id = ").push_bind(firm_id);
    if let Some(user_id) = params.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(action) = params.action.as_deref().filter(|a| !a.is_empty()) {
        qb.push(" AND action = ").push_bind(action.to_string());
    }
    if let Some(entity_type) = params.entity_type.as_deref().filter(|e| !e.is_empty()) {
        qb.push(" AND entity_type = ").push_bind(entity_type.to_string());
    }
    if let Some(from) = params.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = params.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

/// GET /api/audit - newest first.
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<AuditLog>> {
    auth.require("audit:read")?;
    let pool = db::pool().await?;
    let page = params.pagination();

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM audit_logs");
    apply_filters(&mut count_qb, auth.firm_id, &params);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM audit_logs");
    apply_filters(&mut qb, auth.firm_id, &params);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<AuditLog>().fetch_all(pool).await?;

    Ok(ApiResponse::success(Page::new(items, total, &page)))
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    /// csv (default) or json.
    pub format: Option<String>,
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// GET /api/audit/export - bounded export of the filtered log, oldest first.
/// The export itself is an audited action.
pub async fn export(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require("audit:export")?;

    let format = params.format.as_deref().unwrap_or("csv");
    if format != "csv" && format != "json" {
        return Err(ApiError::bad_request("format must be 'csv' or 'json'"));
    }

    let list_params = ListParams {
        page: None,
        limit: None,
        user_id: params.user_id,
        action: params.action.clone(),
        entity_type: params.entity_type.clone(),
        from: params.from,
        to: params.to,
    };

    let pool = db::pool().await?;
    let mut qb = QueryBuilder::new("SELECT * FROM audit_logs");
    apply_filters(&mut qb, auth.firm_id, &list_params);
    qb.push(" ORDER BY created_at ASC LIMIT ")
        .push_bind(config::config().api.export_row_cap);
    let rows = qb.build_query_as::<AuditLog>().fetch_all(pool).await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "audit:export",
        "audit_log",
        None,
        json!({"format": format, "rows": rows.len()}),
    )
    .await;

    let (content_type, body) = match format {
        "json" => ("application/json".to_string(), serde_json::to_string(&rows).map_err(|e| {
            tracing::error!("audit export serialization failed: {}", e);
            ApiError::internal_server_error("Failed to serialize export")
        })?),
        _ => ("text/csv".to_string(), audit::to_csv(&rows)),
    };

    let file_name = format!("audit-export-{}.{}", Utc::now().format("%Y%m%d%H%M%S"), format);
    Ok((
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        body,
    ))
}
