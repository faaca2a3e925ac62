use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use uuid::Uuid;

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// Integration tests need a live Postgres; they are opt-in via
/// FIRMDESK_TEST=1 (plus DATABASE_URL) so plain `cargo test` stays green.
pub fn enabled() -> bool {
    std::env::var("FIRMDESK_TEST").as_deref() == Ok("1") && std::env::var("DATABASE_URL").is_ok()
}

pub struct TestServer {
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_firmdesk-api"));
        cmd.env("FIRMDESK_PORT", port.to_string())
            // Small upload cap so the oversize-upload tests stay light
            .env("API_MAX_UPLOAD_BYTES", (4 * 1024 * 1024).to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() <= deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A freshly seeded firm with one role and one active user.
#[allow(dead_code)]
pub struct Seeded {
    pub firm_id: Uuid,
    pub role_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub password: String,
}

/// Seed a firm, a role carrying the given permissions and a user assigned to
/// it, straight into the database the server under test points at.
#[allow(dead_code)]
pub async fn seed_user(permissions: &[&str]) -> Result<Seeded> {
    let pool = firmdesk_api::db::pool().await?;

    let firm_id: Uuid = sqlx::query_scalar("INSERT INTO firms (name) VALUES ($1) RETURNING id")
        .bind(format!("Test Firm {}", Uuid::new_v4().simple()))
        .fetch_one(pool)
        .await?;

    let perms: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
    let role_id: Uuid = sqlx::query_scalar(
        "INSERT INTO roles (firm_id, name, permissions) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(firm_id)
    .bind(format!("role-{}", Uuid::new_v4().simple()))
    .bind(&perms)
    .fetch_one(pool)
    .await?;

    let email = format!("user-{}@firmdesk.test", Uuid::new_v4().simple());
    let password = "correct horse battery".to_string();
    let salt = firmdesk_api::auth::generate_salt();
    let hash = firmdesk_api::auth::hash_password(&password, &salt);
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (firm_id, role_id, email, display_name, password_hash, password_salt)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(firm_id)
    .bind(role_id)
    .bind(&email)
    .bind("Test User")
    .bind(&hash)
    .bind(&salt)
    .fetch_one(pool)
    .await?;

    Ok(Seeded { firm_id, role_id, user_id, email, password })
}

/// Cookie-holding client logged in as the seeded user.
#[allow(dead_code)]
pub async fn login(server: &TestServer, seeded: &Seeded) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder().cookie_store(true).build()?;
    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&serde_json::json!({"email": seeded.email, "password": seeded.password}))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
    Ok(client)
}
