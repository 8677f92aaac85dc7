//! End-to-end registry and tenant data flows. These need a reachable
//! Postgres; each test gates on /health and skips quietly when the
//! database is down.

mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_username(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("{}_{}_{}", prefix, std::process::id(), nanos)
}

async fn create_admin(
    server: &common::TestServer,
    token: &str,
    username: &str,
    selected_fields: Value,
) -> Result<Value> {
    let res = reqwest::Client::new()
        .post(format!("{}/api/superadmin/create-admin", server.base_url))
        .bearer_auth(token)
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "admin-password-1",
            "selectedFields": selected_fields
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    Ok(res.json().await?)
}

async fn admin_token(server: &common::TestServer, username: &str) -> Result<String> {
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/admin/login", server.base_url))
        .json(&json!({ "username": username, "password": "admin-password-1" }))
        .send()
        .await?
        .json()
        .await?;
    body["data"]["token"]
        .as_str()
        .map(|s| s.to_string())
        .context("missing token in admin login response")
}

#[tokio::test]
async fn admin_lifecycle() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping: database unreachable");
        return Ok(());
    }

    let token = common::superadmin_token(server).await?;
    let username = unique_username("lifecycle");
    let client = reqwest::Client::new();

    let created = create_admin(server, &token, &username, json!(["name", "email"])).await?;
    let admin = &created["data"];
    assert_eq!(
        admin["tenantDbName"],
        format!("tenant_{}", username.to_lowercase())
    );
    assert!(admin.get("passwordHash").is_none());
    let id = admin["id"].as_str().context("admin id")?;

    // Same username in a different case maps to the same tenant: conflict
    let res = client
        .post(format!("{}/api/superadmin/create-admin", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "username": username.to_uppercase(),
            "email": "dup@example.com",
            "password": "admin-password-1"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Listing excludes the hash as well
    let list: Value = client
        .get(format!("{}/api/superadmin/admins", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    let listed = list["data"]
        .as_array()
        .context("admin list")?
        .iter()
        .find(|a| a["username"] == username.as_str())
        .context("created admin missing from list")?;
    assert!(listed.get("passwordHash").is_none());

    // Deactivate, login must fail, reactivate
    let toggle_url = format!(
        "{}/api/superadmin/admins/{}/toggle-status",
        server.base_url, id
    );
    let toggled: Value = client
        .patch(&toggle_url)
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(toggled["data"]["isActive"], false);

    let res = client
        .post(format!("{}/api/admin/login", server.base_url))
        .json(&json!({ "username": username, "password": "admin-password-1" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    client
        .patch(&toggle_url)
        .bearer_auth(&token)
        .send()
        .await?;

    // Delete; entry is gone but the tenant database stays behind
    let res = client
        .delete(format!("{}/api/superadmin/admins/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/superadmin/admins/{}", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn tenant_users_crud() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping: database unreachable");
        return Ok(());
    }

    let sa_token = common::superadmin_token(server).await?;
    let username = unique_username("users");
    create_admin(server, &sa_token, &username, json!(["name"])).await?;
    let token = admin_token(server, &username).await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Asha",
            "email": "asha@example.com",
            "role": "manager"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await?;
    let user_id = created["data"]["id"].as_str().context("user id")?.to_string();

    // Unknown role is a validation error
    let res = client
        .post(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Bad",
            "email": "bad@example.com",
            "role": "superuser"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Duplicate email within the tenant conflicts
    let res = client
        .post(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "Asha Again", "email": "asha@example.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let updated: Value = client
        .put(format!("{}/api/admin/users/{}", server.base_url, user_id))
        .bearer_auth(&token)
        .json(&json!({ "role": "admin" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(updated["data"]["role"], "admin");
    assert_eq!(updated["data"]["name"], "Asha");

    let res = client
        .delete(format!("{}/api/admin/users/{}", server.base_url, user_id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/admin/users/{}", server.base_url, user_id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn leads_follow_the_materialized_schema() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping: database unreachable");
        return Ok(());
    }

    let sa_token = common::superadmin_token(server).await?;
    let username = unique_username("leads");
    // mobileNumber translates to phone; bogus is silently dropped
    create_admin(
        server,
        &sa_token,
        &username,
        json!(["name", "email", "mobileNumber", "bogus"]),
    )
    .await?;
    let token = admin_token(server, &username).await?;
    let client = reqwest::Client::new();

    let schema: Value = client
        .get(format!("{}/api/admin/leads/schema", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    let names: Vec<&str> = schema["data"]["columns"]
        .as_array()
        .context("schema columns")?
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert!(names.contains(&"phone"));
    assert!(!names.contains(&"mobileNumber"));
    assert!(!names.contains(&"bogus"));

    let res = client
        .post(format!("{}/api/admin/leads", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Walk-in",
            "email": "walkin@example.com",
            "phone": "5550100",
            "source": "website"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await?;
    let lead = &created["data"];
    assert_eq!(lead["phone"], "5550100");
    assert_eq!(lead["source"], "website");
    assert!(lead["capture_time"].as_str().is_some());
    let lead_id = lead["id"].as_str().context("lead id")?.to_string();

    // Fields outside the materialized schema are rejected
    let res = client
        .post(format!("{}/api/admin/leads", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "X", "pincode": "560001" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // So are invalid source values
    let res = client
        .post(format!("{}/api/admin/leads", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "X", "source": "imported" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Omitted source defaults to manual
    let res = client
        .post(format!("{}/api/admin/leads", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "Manual entry" }))
        .send()
        .await?;
    let manual: Value = res.json().await?;
    assert_eq!(manual["data"]["source"], "manual");

    let fetched: Value = client
        .get(format!("{}/api/admin/leads/{}", server.base_url, lead_id))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(fetched["data"]["name"], "Walk-in");

    let list: Value = client
        .get(format!("{}/api/admin/leads", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert!(list["data"].as_array().context("lead list")?.len() >= 2);
    Ok(())
}

#[tokio::test]
async fn tenants_are_isolated() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await? {
        eprintln!("skipping: database unreachable");
        return Ok(());
    }

    let sa_token = common::superadmin_token(server).await?;
    let first = unique_username("iso_a");
    let second = unique_username("iso_b");
    create_admin(server, &sa_token, &first, json!(["name"])).await?;
    create_admin(server, &sa_token, &second, json!(["name"])).await?;

    let first_token = admin_token(server, &first).await?;
    let second_token = admin_token(server, &second).await?;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(&first_token)
        .json(&json!({ "name": "Only Mine", "email": "mine@example.com" }))
        .send()
        .await?;

    let other: Value = client
        .get(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(&second_token)
        .send()
        .await?
        .json()
        .await?;
    let names: Vec<&str> = other["data"]
        .as_array()
        .context("user list")?
        .iter()
        .filter_map(|u| u["name"].as_str())
        .collect();
    assert!(!names.contains(&"Only Mine"));
    Ok(())
}
