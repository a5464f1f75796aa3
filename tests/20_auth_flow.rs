mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

async fn register_user(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    username: &str,
) -> Result<(StatusCode, Value)> {
    let res = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "email": email,
            "username": username,
            "password": "password123",
        }))
        .send()
        .await?;
    let status = res.status();
    let body = res.json::<Value>().await?;
    Ok((status, body))
}

#[tokio::test]
async fn register_login_and_card_lifecycle() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let client = reqwest::Client::new();
    let suffix = unique_suffix();
    let email = format!("alice{}@example.com", suffix);
    let username = format!("alice{}", suffix % 1_000_000_000);

    // Register succeeds once with both tokens
    let (status, body) = register_user(&client, &server.base_url, &email, &username).await?;
    assert_eq!(status, StatusCode::CREATED);
    let access_token = body["data"]["accessToken"].as_str().unwrap().to_string();
    assert!(body["data"]["refreshToken"].is_string());
    assert!(body["data"]["user"]["passwordHash"].is_null());

    // Registering again with the same email is a conflict
    let (status, body) = register_user(&client, &server.base_url, &email, &username).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    // Wrong password and unknown email produce the identical 401
    let wrong = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": email, "password": "wrong-password" }))
        .send()
        .await?;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body = wrong.json::<Value>().await?;

    let unknown = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": format!("nobody{}@example.com", suffix), "password": "x" }))
        .send()
        .await?;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body = unknown.json::<Value>().await?;
    assert_eq!(wrong_body["message"], unknown_body["message"]);

    // Correct password logs in with fresh tokens
    let login = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await?;
    assert_eq!(login.status(), StatusCode::OK);

    // Create a card with only a name
    let created = client
        .post(format!("{}/api/cards", server.base_url))
        .bearer_auth(&access_token)
        .json(&json!({ "fullName": "Jane Doe" }))
        .send()
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let card = created.json::<Value>().await?;
    let card_id = card["data"]["id"].as_str().unwrap().to_string();
    assert!(card["data"]["email"].is_null());

    // Sparse update touches only the requested field
    let updated = client
        .put(format!("{}/api/cards/{}", server.base_url, card_id))
        .bearer_auth(&access_token)
        .json(&json!({ "jobTitle": "Engineer" }))
        .send()
        .await?;
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = updated.json::<Value>().await?;
    assert_eq!(updated["data"]["jobTitle"], "Engineer");
    assert_eq!(updated["data"]["fullName"], "Jane Doe");
    assert!(updated["data"]["email"].is_null());

    // An empty patch never reaches the store
    let empty = client
        .put(format!("{}/api/cards/{}", server.base_url, card_id))
        .bearer_auth(&access_token)
        .json(&json!({ "unrelated": true }))
        .send()
        .await?;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    // Another user cannot see the card even with its real id
    let other_email = format!("mallory{}@example.com", suffix);
    let other_username = format!("mallory{}", suffix % 1_000_000_000);
    let (status, other) =
        register_user(&client, &server.base_url, &other_email, &other_username).await?;
    assert_eq!(status, StatusCode::CREATED);
    let other_token = other["data"]["accessToken"].as_str().unwrap();

    let cross = client
        .get(format!("{}/api/cards/{}", server.base_url, card_id))
        .bearer_auth(other_token)
        .send()
        .await?;
    assert_eq!(cross.status(), StatusCode::NOT_FOUND);

    let cross_update = client
        .put(format!("{}/api/cards/{}", server.base_url, card_id))
        .bearer_auth(other_token)
        .json(&json!({ "fullName": "Hijacked" }))
        .send()
        .await?;
    assert_eq!(cross_update.status(), StatusCode::NOT_FOUND);

    // Soft delete hides the card from subsequent reads
    let deleted = client
        .delete(format!("{}/api/cards/{}", server.base_url, card_id))
        .bearer_auth(&access_token)
        .send()
        .await?;
    assert_eq!(deleted.status(), StatusCode::OK);

    let gone = client
        .get(format!("{}/api/cards/{}", server.base_url, card_id))
        .bearer_auth(&access_token)
        .send()
        .await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    Ok(())
}
