mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

// The server runs with API_MAX_UPLOAD_BYTES=4 MiB (see common::TestServer).
const CAP: usize = 4 * 1024 * 1024;

// Uploads larger than axum's built-in body default must reach the handler,
// and uploads over the configured cap come back as an explicit 400.
#[tokio::test]
async fn upload_size_cap_is_enforced_with_a_400() -> Result<()> {
    if !common::enabled() {
        eprintln!("skipping: FIRMDESK_TEST/DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let seeded = common::seed_user(&["documents:read", "documents:write"]).await?;
    let client = common::login(server, &seeded).await?;

    let res = client
        .post(format!("{}/api/documents", server.base_url))
        .json(&json!({"name": "FY2025-26 audit file"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<Value>().await?;
    let doc_id = created["data"]["id"].as_str().unwrap().to_string();

    // 3 MiB: over the old 2 MiB framework default, under the cap.
    let body = vec![0u8; 3 * 1024 * 1024];
    let res = client
        .post(format!(
            "{}/api/documents/{}/versions?file_name=big.pdf",
            server.base_url, doc_id
        ))
        .header("content-type", "application/pdf")
        .body(body)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let version = res.json::<Value>().await?;
    assert_eq!(version["data"]["version"].as_i64(), Some(1));
    assert_eq!(version["data"]["size_bytes"].as_i64(), Some(3 * 1024 * 1024));

    // Half a MiB over the cap: rejected by the handler with a message.
    let body = vec![0u8; CAP + 512 * 1024];
    let res = client
        .post(format!(
            "{}/api/documents/{}/versions?file_name=too-big.pdf",
            server.base_url, doc_id
        ))
        .header("content-type", "application/pdf")
        .body(body)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload = res.json::<Value>().await?;
    assert!(
        payload["message"].as_str().unwrap_or("").contains("maximum upload size"),
        "unexpected body: {}",
        payload
    );

    Ok(())
}
