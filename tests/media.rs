//! Image Upload Relay Tests
//!
//! Covers authentication, multipart validation, and the S3 relay itself
//! (against the localstack endpoint the test harness points at).

mod common;

use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::app;

const BOUNDARY: &str = "quill-test-boundary";

// 1x1 transparent PNG
const TINY_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn file_part(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn text_part(name: &str, value: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
    );
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

#[tokio::test]
async fn upload_requires_authentication() {
    let app = app().await;
    let body = file_part("photo.png", "image/png", b"irrelevant");

    let resp = app
        .post_multipart("/v1/media/upload", BOUNDARY, body, None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn upload_requires_a_file_field() {
    let app = app().await;
    let user = app.create_user("media_nofile").await;
    let body = text_part("fileName", "ghost.png");

    let resp = app
        .post_multipart("/v1/media/upload", BOUNDARY, body, Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "no file provided");
}

#[tokio::test]
async fn upload_rejects_non_image_bytes() {
    let app = app().await;
    let user = app.create_user("media_notimage").await;
    let body = file_part("notes.txt", "text/plain", b"just some text");

    let resp = app
        .post_multipart("/v1/media/upload", BOUNDARY, body, Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "file is not a supported image");
}

#[tokio::test]
async fn upload_relays_image_and_returns_coordinates() {
    let app = app().await;
    let user = app.create_user("media_relay").await;

    // The test bucket may not exist yet on a fresh localstack.
    let _ = app
        .state
        .storage
        .client()
        .create_bucket()
        .bucket(app.state.storage.bucket())
        .send()
        .await;

    let png = STANDARD.decode(TINY_PNG_B64).unwrap();
    let body = file_part("summer pic.png", "image/png", &png);

    let resp = app
        .post_multipart("/v1/media/upload", BOUNDARY, body, Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["success"].as_bool().unwrap(), true);
    assert_eq!(body["width"].as_u64().unwrap(), 1);
    assert_eq!(body["height"].as_u64().unwrap(), 1);
    assert_eq!(body["size"].as_u64().unwrap(), png.len() as u64);
    assert!(body["file_id"].is_string());

    // Sanitized name: the space becomes an underscore, extension survives.
    let name = body["name"].as_str().unwrap();
    assert!(name.ends_with("_summer_pic.png"));

    let url = body["url"].as_str().unwrap();
    assert!(url.contains(app.state.storage.bucket()));
    assert!(url.contains(&user.id.to_string()));
}

#[tokio::test]
async fn same_name_uploads_never_collide() {
    let app = app().await;
    let user = app.create_user("media_collide").await;

    let _ = app
        .state
        .storage
        .client()
        .create_bucket()
        .bucket(app.state.storage.bucket())
        .send()
        .await;

    let png = STANDARD.decode(TINY_PNG_B64).unwrap();

    let first = app
        .post_multipart(
            "/v1/media/upload",
            BOUNDARY,
            file_part("photo.png", "image/png", &png),
            Some(&user.token),
        )
        .await;
    let second = app
        .post_multipart(
            "/v1/media/upload",
            BOUNDARY,
            file_part("photo.png", "image/png", &png),
            Some(&user.token),
        )
        .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_ne!(first.json()["url"], second.json()["url"]);
    assert_ne!(first.json()["name"], second.json()["name"]);
}
