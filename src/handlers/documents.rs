use axum::body::Bytes;
use axum::extract::{Extension, Path, Query};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{
    self,
    pagination::{Page, PageParams},
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{Document, FileVersion};
use crate::{audit, config};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub client_id: Option<Uuid>,
    pub q: Option<String>,
}

impl ListParams {
    fn pagination(&self) -> PageParams {
        PageParams { page: self.page, limit: self.limit }
    }
}

fn apply_filters(qb: &mut QueryBuilder<Postgres>, firm_id: Uuid, params: &ListParams) {
    qb.push(" WHERE firm_id = ").push_bind(firm_id).push(" AND deleted_at IS NULL");
    if let Some(client_id) = params.client_id {
        qb.push(" AND client_id = ").push_bind(client_id);
    }
    if let Some(q) = params.q.as_deref().filter(|q| !q.trim().is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(format!("%{}%", q.trim()));
    }
}

/// GET /api/documents
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Document>> {
    auth.require("documents:read")?;
    let pool = db::pool().await?;
    let page = params.pagination();

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM documents");
    apply_filters(&mut count_qb, auth.firm_id, &params);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM documents");
    apply_filters(&mut qb, auth.firm_id, &params);
    qb.push(" ORDER BY updated_at DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<Document>().fetch_all(pool).await?;

    Ok(ApiResponse::success(Page::new(items, total, &page)))
}

#[derive(Debug, Deserialize)]
pub struct CreateDocument {
    pub name: String,
    pub description: Option<String>,
    pub client_id: Option<Uuid>,
}

/// POST /api/documents - metadata only; bytes arrive as versions.
pub async fn create(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateDocument>,
) -> ApiResult<Document> {
    auth.require("documents:write")?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    let pool = db::pool().await?;
    let document = sqlx::query_as::<_, Document>(
        "INSERT INTO documents (firm_id, client_id, name, description, created_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(auth.firm_id)
    .bind(payload.client_id)
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "documents:create",
        "document",
        Some(document.id),
        json!({"name": document.name}),
    )
    .await;

    Ok(ApiResponse::created(document))
}

async fn fetch_document(id: Uuid, firm_id: Uuid) -> Result<Document, ApiError> {
    let pool = db::pool().await?;
    sqlx::query_as::<_, Document>(
        "SELECT * FROM documents WHERE id = $1 AND firm_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(firm_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Document not found"))
}

/// GET /api/documents/:id - metadata plus its version history.
pub async fn get(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.require("documents:read")?;
    let document = fetch_document(id, auth.firm_id).await?;

    let pool = db::pool().await?;
    let versions = sqlx::query_as::<_, FileVersion>(
        "SELECT id, document_id, version, file_name, content_type, size_bytes, uploaded_by, created_at
         FROM file_versions WHERE document_id = $1 ORDER BY version DESC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(json!({"document": document, "versions": versions})))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub file_name: String,
}

/// POST /api/documents/:id/versions - raw request body becomes version n+1.
pub async fn upload_version(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<FileVersion> {
    auth.require("documents:write")?;
    if params.file_name.trim().is_empty() {
        return Err(ApiError::bad_request("file_name is required"));
    }
    if body.is_empty() {
        return Err(ApiError::bad_request("file content is empty"));
    }
    if body.len() > config::config().api.max_upload_bytes {
        return Err(ApiError::bad_request("file exceeds the maximum upload size"));
    }

    fetch_document(id, auth.firm_id).await?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let pool = db::pool().await?;
    let version = sqlx::query_as::<_, FileVersion>(
        "INSERT INTO file_versions (document_id, version, file_name, content_type, size_bytes, content, uploaded_by)
         VALUES ($1,
                 (SELECT COALESCE(MAX(version), 0) + 1 FROM file_versions WHERE document_id = $1),
                 $2, $3, $4, $5, $6)
         RETURNING id, document_id, version, file_name, content_type, size_bytes, uploaded_by, created_at",
    )
    .bind(id)
    .bind(params.file_name.trim())
    .bind(&content_type)
    .bind(body.len() as i64)
    .bind(body.as_ref())
    .bind(auth.user_id)
    .fetch_one(pool)
    .await?;

    sqlx::query("UPDATE documents SET updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "documents:upload",
        "document",
        Some(id),
        json!({"file_name": version.file_name, "version": version.version, "size_bytes": version.size_bytes}),
    )
    .await;

    Ok(ApiResponse::created(version))
}

/// GET /api/documents/:id/versions/:version/download
pub async fn download_version(
    Extension(auth): Extension<AuthUser>,
    Path((id, version)): Path<(Uuid, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require("documents:read")?;
    fetch_document(id, auth.firm_id).await?;

    let pool = db::pool().await?;
    let row: Option<(String, String, Vec<u8>)> = sqlx::query_as(
        "SELECT file_name, content_type, content
         FROM file_versions WHERE document_id = $1 AND version = $2",
    )
    .bind(id)
    .bind(version)
    .fetch_optional(pool)
    .await?;

    let (file_name, content_type, content) =
        row.ok_or_else(|| ApiError::not_found("File version not found"))?;

    audit::record(
        auth.firm_id,
        auth.user_id,
        "documents:download",
        "document",
        Some(id),
        json!({"file_name": file_name, "version": version}),
    )
    .await;

    Ok((
        [
            (CONTENT_TYPE, content_type),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
            ),
        ],
        content,
    ))
}

/// DELETE /api/documents/:id - soft delete; versions stay for traceability.
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.require("documents:write")?;
    fetch_document(id, auth.firm_id).await?;

    let pool = db::pool().await?;
    sqlx::query("UPDATE documents SET deleted_at = now() WHERE id = $1 AND firm_id = $2")
        .bind(id)
        .bind(auth.firm_id)
        .execute(pool)
        .await?;

    audit::record(auth.firm_id, auth.user_id, "documents:delete", "document", Some(id), json!({})).await;

    Ok(ApiResponse::success(json!({"deleted": id})))
}
