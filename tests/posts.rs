//! Post Lifecycle Tests
//!
//! Covers drafting, publishing, scheduling, visibility, listings, and view
//! accounting.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Drafting
// ===========================================================================

#[tokio::test]
async fn create_post_starts_as_draft() {
    let app = app().await;
    let user = app.create_user("post_create").await;

    let resp = app
        .post_json(
            "/v1/posts",
            json!({
                "title": "My first post",
                "content": "<p>hello</p>",
                "tags": ["rust", "blog"],
                "category": "engineering"
            }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["status"].as_str().unwrap(), "draft");
    assert_eq!(body["title"].as_str().unwrap(), "My first post");
    assert_eq!(body["tags"][0].as_str().unwrap(), "rust");
    assert_eq!(body["view_count"].as_i64().unwrap(), 0);
    assert!(body["published_at"].is_null());
}

#[tokio::test]
async fn create_post_requires_title() {
    let app = app().await;
    let user = app.create_user("post_notitle").await;

    let resp = app
        .post_json("/v1/posts", json!({ "title": "   " }), Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "title cannot be empty");
}

#[tokio::test]
async fn create_post_requires_authentication() {
    let app = app().await;

    let resp = app
        .post_json("/v1/posts", json!({ "title": "Anonymous post" }), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn update_post_patches_fields() {
    let app = app().await;
    let user = app.create_user("post_update").await;
    let post_id = app.create_draft(user.id, "Working title").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", post_id),
            json!({ "title": "Final title", "tags": ["updated"] }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["title"].as_str().unwrap(), "Final title");
    assert_eq!(body["content"].as_str().unwrap(), "test content");
    assert_eq!(body["tags"][0].as_str().unwrap(), "updated");
}

#[tokio::test]
async fn update_rejects_other_authors() {
    let app = app().await;
    let author = app.create_user("post_update_owner").await;
    let intruder = app.create_user("post_update_intruder").await;
    let post_id = app.create_draft(author.id, "Private draft").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", post_id),
            json!({ "title": "Hijacked" }),
            Some(&intruder.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Publishing
// ===========================================================================

#[tokio::test]
async fn publish_sets_published_at_once() {
    let app = app().await;
    let user = app.create_user("post_publish").await;
    let post_id = app.create_draft(user.id, "Ready to ship").await;

    let resp = app
        .post_json(
            &format!("/v1/posts/{}/publish", post_id),
            json!({}),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["status"].as_str().unwrap(), "published");
    assert!(body["published_at"].is_string());

    // Publishing is one-directional; a second publish finds no draft.
    let resp = app
        .post_json(
            &format!("/v1/posts/{}/publish", post_id),
            json!({}),
            Some(&user.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schedule_records_time_on_draft() {
    let app = app().await;
    let user = app.create_user("post_schedule").await;
    let post_id = app.create_draft(user.id, "Later").await;

    let resp = app
        .post_json(
            &format!("/v1/posts/{}/schedule", post_id),
            json!({ "scheduled_at": "2027-01-01T09:00:00Z" }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["status"].as_str().unwrap(), "draft");
    assert!(body["scheduled_at"].as_str().unwrap().starts_with("2027-01-01"));
}

#[tokio::test]
async fn schedule_rejects_published_posts() {
    let app = app().await;
    let user = app.create_user("post_schedule_pub").await;
    let post_id = app.create_published_post(user.id, "Already out").await;

    let resp = app
        .post_json(
            &format!("/v1/posts/{}/schedule", post_id),
            json!({ "scheduled_at": "2027-01-01T09:00:00Z" }),
            Some(&user.token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Visibility & listings
// ===========================================================================

#[tokio::test]
async fn drafts_are_visible_to_author_only() {
    let app = app().await;
    let author = app.create_user("post_vis_author").await;
    let other = app.create_user("post_vis_other").await;
    let post_id = app.create_draft(author.id, "Hidden draft").await;

    let resp = app.get(&format!("/v1/posts/{}", post_id), Some(&author.token)).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get(&format!("/v1/posts/{}", post_id), Some(&other.token)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.get(&format!("/v1/posts/{}", post_id), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn author_listing_hides_drafts_from_others() {
    let app = app().await;
    let author = app.create_user("post_list_author").await;
    app.create_draft(author.id, "Draft one").await;
    app.create_published_post(author.id, "Published one").await;

    // Anonymous callers see published posts only.
    let resp = app.get(&format!("/v1/users/{}/posts", author.id), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["items"].as_array().unwrap().len(), 1);

    // The author sees everything.
    let resp = app
        .get(&format!("/v1/users/{}/posts", author.id), Some(&author.token))
        .await;
    assert_eq!(resp.json()["items"].as_array().unwrap().len(), 2);

    // And can filter down to drafts.
    let resp = app
        .get(
            &format!("/v1/users/{}/posts?status=draft", author.id),
            Some(&author.token),
        )
        .await;
    let items = resp.json()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"].as_str().unwrap(), "draft");
}

#[tokio::test]
async fn listing_rejects_bad_limits() {
    let app = app().await;
    let user = app.create_user("post_list_limit").await;

    let resp = app
        .get(&format!("/v1/users/{}/posts?limit=0", user.id), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .get(&format!("/v1/users/{}/posts?limit=1000", user.id), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feed_lists_published_newest_first() {
    let app = app().await;
    let author = app.create_user("feed_author").await;
    app.create_published_post_at(author.id, "Feed early", 60).await;
    app.create_published_post_at(author.id, "Feed late", 5).await;

    let resp = app.get("/v1/feed?limit=50", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let items = resp.json()["items"].as_array().unwrap().clone();
    let titles: Vec<&str> = items
        .iter()
        .filter_map(|item| item["title"].as_str())
        .collect();
    let early = titles.iter().position(|t| *t == "Feed early");
    let late = titles.iter().position(|t| *t == "Feed late");
    assert!(late.unwrap() < early.unwrap(), "newer publish should come first");
}

#[tokio::test]
async fn feed_reflects_publish_immediately() {
    let app = app().await;
    let author = app.create_user("feed_fresh").await;

    // Warm the cache.
    let resp = app.get("/v1/feed?limit=53", None).await;
    assert_eq!(resp.status, StatusCode::OK);

    let post_id = app.create_draft(author.id, "Hot off the press").await;
    let resp = app
        .post_json(
            &format!("/v1/posts/{}/publish", post_id),
            json!({}),
            Some(&author.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get("/v1/feed?limit=53", None).await;
    let titles: Vec<String> = resp.json()["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["title"].as_str().map(str::to_string))
        .collect();
    assert!(titles.contains(&"Hot off the press".to_string()));
}

#[tokio::test]
async fn delete_post_removes_it() {
    let app = app().await;
    let user = app.create_user("post_delete").await;
    let post_id = app.create_published_post(user.id, "Short lived").await;

    let resp = app.delete(&format!("/v1/posts/{}", post_id), Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get(&format!("/v1/posts/{}", post_id), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// View accounting
// ===========================================================================

#[tokio::test]
async fn views_increment_counter_and_daily_row() {
    let app = app().await;
    let user = app.create_user("post_views").await;
    let post_id = app.create_published_post(user.id, "Popular").await;

    for _ in 0..3 {
        let resp = app
            .post_json(&format!("/v1/posts/{}/view", post_id), json!({}), None)
            .await;
        assert_eq!(resp.status, StatusCode::OK);
    }

    let view_count: i64 =
        sqlx::query_scalar("SELECT view_count FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(view_count, 3);

    // One daily row per (post, date), accumulated in place.
    let (rows, daily_total): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(view_count), 0) FROM daily_stats WHERE post_id = $1",
    )
    .bind(post_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(daily_total, 3);
}

#[tokio::test]
async fn views_ignore_drafts() {
    let app = app().await;
    let user = app.create_user("post_views_draft").await;
    let post_id = app.create_draft(user.id, "Unviewable").await;

    let resp = app
        .post_json(&format!("/v1/posts/{}/view", post_id), json!({}), None)
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_are_author_only() {
    let app = app().await;
    let author = app.create_user("post_stats_author").await;
    let other = app.create_user("post_stats_other").await;
    let post_id = app.create_published_post(author.id, "Measured").await;

    app.post_json(&format!("/v1/posts/{}/view", post_id), json!({}), None)
        .await;

    let resp = app
        .get(&format!("/v1/posts/{}/stats", post_id), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let stats = resp.json();
    let stats = stats.as_array().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["view_count"].as_i64().unwrap(), 1);

    let resp = app
        .get(&format!("/v1/posts/{}/stats", post_id), Some(&other.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .get(&format!("/v1/posts/{}/stats", Uuid::new_v4()), Some(&author.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
