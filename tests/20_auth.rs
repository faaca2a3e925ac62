mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

// Every protected endpoint must refuse requests without a valid access token.
#[tokio::test]
async fn protected_endpoints_require_a_token() -> Result<()> {
    if !common::enabled() {
        eprintln!("skipping: FIRMDESK_TEST/DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in [
        "/api/auth/whoami",
        "/api/clients",
        "/api/compliance",
        "/api/ledger",
        "/api/audit",
        "/api/reports/dashboard",
    ] {
        let res = client.get(format!("{}{}", server.base_url, path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "expected 401 for {}", path);
    }

    Ok(())
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected() -> Result<()> {
    if !common::enabled() {
        eprintln!("skipping: FIRMDESK_TEST/DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/clients", server.base_url))
        .header("authorization", "Bearer not-a-real-token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn login_rejects_unknown_credentials() -> Result<()> {
    if !common::enabled() {
        eprintln!("skipping: FIRMDESK_TEST/DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({"email": "nobody@nowhere.example", "password": "wrong"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({"email": "", "password": ""}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn refresh_requires_a_refresh_cookie() -> Result<()> {
    if !common::enabled() {
        eprintln!("skipping: FIRMDESK_TEST/DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/refresh", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Logout always succeeds and clears cookies, even without a session.
    let res = client
        .post(format!("{}/api/auth/logout", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    Ok(())
}
