mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

// A role still assigned to a user must survive a delete attempt.
#[tokio::test]
async fn role_referenced_by_a_user_cannot_be_deleted() -> Result<()> {
    if !common::enabled() {
        eprintln!("skipping: FIRMDESK_TEST/DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let seeded = common::seed_user(&["roles:read", "roles:write"]).await?;
    let client = common::login(server, &seeded).await?;

    // The seeded user itself references this role.
    let res = client
        .delete(format!("{}/api/roles/{}", server.base_url, seeded.role_id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload = res.json::<Value>().await?;
    assert!(
        payload["message"].as_str().unwrap_or("").contains("cannot be deleted"),
        "unexpected body: {}",
        payload
    );

    // The role is still there.
    let res = client.get(format!("{}/api/roles", server.base_url)).send().await?;
    let roles = res.json::<Value>().await?;
    let ids: Vec<&str> = roles["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert!(ids.contains(&seeded.role_id.to_string().as_str()));

    // An unreferenced role deletes fine.
    let res = client
        .post(format!("{}/api/roles", server.base_url))
        .json(&json!({"name": "temp-role", "permissions": ["clients:read"]}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<Value>().await?;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .delete(format!("{}/api/roles/{}", server.base_url, id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    Ok(())
}

// A write without the matching permission is a 403 and changes nothing.
#[tokio::test]
async fn missing_permission_is_403_and_mutates_nothing() -> Result<()> {
    if !common::enabled() {
        eprintln!("skipping: FIRMDESK_TEST/DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let seeded = common::seed_user(&["clients:read"]).await?;
    let client = common::login(server, &seeded).await?;

    let list_url = format!("{}/api/clients", server.base_url);
    let before = client.get(&list_url).send().await?.json::<Value>().await?;
    let total_before = before["data"]["total"].as_i64().unwrap();

    let res = client
        .post(&list_url)
        .json(&json!({"name": "Blocked & Co", "client_type": "company"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let after = client.get(&list_url).send().await?.json::<Value>().await?;
    assert_eq!(after["data"]["total"].as_i64().unwrap(), total_before);

    Ok(())
}
