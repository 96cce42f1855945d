//! Identity Sync Tests
//!
//! Covers the sync upsert contract, idempotency, and profile lookups.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn sync_creates_user_on_first_access() {
    let app = app().await;
    let token = app.identity_token("idp|first_access", Some("Ada"), Some("ada@example.com"), None);

    let resp = app.post_json("/v1/identity/sync", json!({}), Some(&token)).await;

    assert_eq!(resp.status, StatusCode::OK);
    let user_id = resp.json()["user_id"].as_str().unwrap().to_string();

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE token_identifier = $1")
            .bind("idp|first_access")
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(count, 1);
    assert!(Uuid::parse_str(&user_id).is_ok());
}

#[tokio::test]
async fn sync_is_idempotent() {
    let app = app().await;
    let token = app.identity_token("idp|idempotent", Some("Ada"), None, None);

    let first = app.post_json("/v1/identity/sync", json!({}), Some(&token)).await;
    let second = app.post_json("/v1/identity/sync", json!({}), Some(&token)).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.json()["user_id"], second.json()["user_id"]);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE token_identifier = $1")
            .bind("idp|idempotent")
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn sync_updates_changed_name_in_place() {
    let app = app().await;
    let before = app.identity_token("idp|rename", Some("Old Name"), None, None);
    let after = app.identity_token("idp|rename", Some("New Name"), None, None);

    let first = app.post_json("/v1/identity/sync", json!({}), Some(&before)).await;
    let second = app.post_json("/v1/identity/sync", json!({}), Some(&after)).await;

    assert_eq!(first.json()["user_id"], second.json()["user_id"]);

    let name: String =
        sqlx::query_scalar("SELECT name FROM users WHERE token_identifier = $1")
            .bind("idp|rename")
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(name, "New Name");
}

#[tokio::test]
async fn sync_defaults_missing_claims() {
    let app = app().await;
    let token = app.identity_token("idp|bare", None, None, None);

    let resp = app.post_json("/v1/identity/sync", json!({}), Some(&token)).await;
    assert_eq!(resp.status, StatusCode::OK);

    let (name, email): (String, String) = sqlx::query_as(
        "SELECT name, email FROM users WHERE token_identifier = $1",
    )
    .bind("idp|bare")
    .fetch_one(app.pool())
    .await
    .unwrap();

    assert_eq!(name, "Anonymous");
    assert_eq!(email, "");
}

#[tokio::test]
async fn sync_requires_authentication() {
    let app = app().await;

    let resp = app.post_json("/v1/identity/sync", json!({}), None).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sync_rejects_garbage_tokens() {
    let app = app().await;

    let resp = app
        .post_json("/v1/identity/sync", json!({}), Some("not-a-paseto-token"))
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid identity token");
}

#[tokio::test]
async fn me_returns_synced_user() {
    let app = app().await;
    let user = app.create_user("id_me").await;

    let resp = app.get("/v1/identity/me", Some(&user.token)).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["id"].as_str().unwrap(), user.id.to_string());
    assert_eq!(body["name"].as_str().unwrap(), user.name);
}

#[tokio::test]
async fn me_requires_prior_sync() {
    let app = app().await;
    let token = app.identity_token("idp|never_synced", Some("Ghost"), None, None);

    let resp = app.get("/v1/identity/me", Some(&token)).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_profile_carries_counts() {
    let app = app().await;
    let author = app.create_user("id_profile").await;
    let fan = app.create_user("id_profile_fan").await;

    app.create_published_post(author.id, "Counted post").await;
    let resp = app
        .post_json(
            &format!("/v1/users/{}/follow", author.id),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get(&format!("/v1/users/{}", author.id), None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["followers_count"].as_i64().unwrap(), 1);
    assert_eq!(body["following_count"].as_i64().unwrap(), 0);
    assert_eq!(body["posts_count"].as_i64().unwrap(), 1);
}

#[tokio::test]
async fn unknown_user_profile_is_404() {
    let app = app().await;

    let resp = app.get(&format!("/v1/users/{}", Uuid::new_v4()), None).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
