//! AI Endpoint Tests
//!
//! Only the paths that fail fast before any provider call are exercised here;
//! the fallback loop itself is unit-tested against a scripted model.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

#[tokio::test]
async fn generate_requires_authentication() {
    let app = app().await;

    let resp = app
        .post_json("/v1/ai/generate", json!({ "title": "A post" }), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn generate_rejects_empty_titles_before_any_call() {
    let app = app().await;
    let user = app.create_user("ai_notitle").await;

    let resp = app
        .post_json("/v1/ai/generate", json!({ "title": "   " }), Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "title is required to generate content");
}

#[tokio::test]
async fn improve_rejects_empty_content_before_any_call() {
    let app = app().await;
    let user = app.create_user("ai_nocontent").await;

    let resp = app
        .post_json(
            "/v1/ai/improve",
            json!({ "content": "", "mode": "expand" }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "content is required for improvement");
}

#[tokio::test]
async fn improve_rejects_unknown_modes() {
    let app = app().await;
    let user = app.create_user("ai_badmode").await;

    let resp = app
        .post_json(
            "/v1/ai/improve",
            json!({ "content": "<p>text</p>", "mode": "rewrite-everything" }),
            Some(&user.token),
        )
        .await;

    // Serde rejects the unknown variant at the extractor.
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
}
