use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod tally;

pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Token acquisition and teardown; these validate their own cookies
        .route("/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Everything else requires a valid access token
        .merge(protected_routes().layer(axum::middleware::from_fn(middleware::auth_middleware)))
        // Global middleware. The body limit sits above the configured upload
        // cap so oversize uploads reach the handler's 400 instead of a bare
        // 413; it also unblocks large Tally CSV payloads.
        .layer(DefaultBodyLimit::max(config::config().api.max_upload_bytes + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn protected_routes() -> Router {
    Router::new()
        .route("/api/auth/whoami", get(handlers::auth::whoami))
        .merge(clients_routes())
        .merge(projects_routes())
        .merge(tasks_routes())
        .merge(compliance_routes())
        .merge(ledger_routes())
        .merge(tally_routes())
        .merge(documents_routes())
        .merge(notifications_routes())
        .merge(roles_routes())
        .merge(audit_routes())
        .route("/api/reports/dashboard", get(handlers::reports::dashboard))
}

fn clients_routes() -> Router {
    use handlers::clients;
    Router::new()
        .route("/api/clients", get(clients::list).post(clients::create))
        .route(
            "/api/clients/:id",
            get(clients::get).put(clients::update).delete(clients::delete),
        )
}

fn projects_routes() -> Router {
    use handlers::projects;
    Router::new()
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/:id",
            get(projects::get).put(projects::update).delete(projects::delete),
        )
}

fn tasks_routes() -> Router {
    use handlers::tasks;
    Router::new()
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/api/tasks/:id",
            get(tasks::get).put(tasks::update).delete(tasks::delete),
        )
}

fn compliance_routes() -> Router {
    use handlers::compliance;
    Router::new()
        .route("/api/compliance", get(compliance::list).post(compliance::create))
        .route("/api/compliance/upcoming", get(compliance::upcoming))
        .route(
            "/api/compliance/:id",
            get(compliance::get).put(compliance::update).delete(compliance::delete),
        )
}

fn ledger_routes() -> Router {
    use handlers::ledger;
    Router::new()
        .route("/api/ledger", get(ledger::list).post(ledger::create))
        .route("/api/ledger/summary", get(ledger::summary))
        .route("/api/ledger/:id", get(ledger::get).delete(ledger::delete))
}

fn tally_routes() -> Router {
    use handlers::tally;
    Router::new()
        .route("/api/tally/import", post(tally::import))
        .route("/api/tally/syncs", get(tally::list_syncs))
        .route("/api/tally/syncs/:id", get(tally::get_sync))
}

fn documents_routes() -> Router {
    use handlers::documents;
    Router::new()
        .route("/api/documents", get(documents::list).post(documents::create))
        .route(
            "/api/documents/:id",
            get(documents::get).delete(documents::delete),
        )
        .route("/api/documents/:id/versions", post(documents::upload_version))
        .route(
            "/api/documents/:id/versions/:version/download",
            get(documents::download_version),
        )
}

fn notifications_routes() -> Router {
    use handlers::notifications;
    Router::new()
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/:id/read", post(notifications::mark_read))
}

fn roles_routes() -> Router {
    use handlers::roles;
    Router::new()
        .route("/api/roles", get(roles::list).post(roles::create))
        .route(
            "/api/roles/:id",
            put(roles::update).delete(roles::delete),
        )
}

fn audit_routes() -> Router {
    use handlers::audit;
    Router::new()
        .route("/api/audit", get(audit::list))
        .route("/api/audit/export", get(audit::export))
}

async fn root() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Firmdesk API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Back-office API for chartered-accountancy firms",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/login, /api/auth/refresh, /api/auth/logout, /api/auth/whoami",
                "clients": "/api/clients[/:id]",
                "projects": "/api/projects[/:id]",
                "tasks": "/api/tasks[/:id]",
                "compliance": "/api/compliance[/:id], /api/compliance/upcoming",
                "ledger": "/api/ledger[/:id], /api/ledger/summary",
                "tally": "/api/tally/import, /api/tally/syncs[/:id]",
                "documents": "/api/documents[/:id], versions upload/download",
                "notifications": "/api/notifications, /:id/read, /read-all",
                "roles": "/api/roles[/:id]",
                "audit": "/api/audit, /api/audit/export",
                "reports": "/api/reports/dashboard",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match db::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": { "status": "degraded", "timestamp": now, "database_error": e.to_string() }
            })),
        ),
    }
}
