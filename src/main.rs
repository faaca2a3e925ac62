use firmdesk_api::{app, config};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "firmdesk_api=info,tower_http=info".into()),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting Firmdesk API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        // Without a secret no session can ever validate; fail loudly at boot.
        panic!("JWT_SECRET must be set for {:?}", config.environment);
    }

    // Allow tests or deployments to override port via env
    let port = std::env::var("FIRMDESK_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Firmdesk API listening on http://{}", bind_addr);

    axum::serve(listener, app()).await.expect("server");
}
