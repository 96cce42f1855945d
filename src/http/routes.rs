use axum::{routing::delete, routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn identity() -> Router<AppState> {
    Router::new()
        .route("/identity/sync", post(handlers::sync_identity))
        .route("/identity/me", get(handlers::get_current_user))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/follow", post(handlers::toggle_follow))
        .route("/users/:id/followers", get(handlers::list_followers))
        .route("/users/:id/following", get(handlers::list_following))
        .route("/users/:id/posts", get(handlers::list_user_posts))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id", patch(handlers::update_post))
        .route("/posts/:id", delete(handlers::delete_post))
        .route("/posts/:id/publish", post(handlers::publish_post))
        .route("/posts/:id/schedule", post(handlers::schedule_post))
        .route("/posts/:id/view", post(handlers::record_post_view))
        .route("/posts/:id/stats", get(handlers::post_stats))
        .route("/posts/:id/like", post(handlers::toggle_like))
        .route("/posts/:id/likes", get(handlers::list_post_likes))
        .route("/posts/:id/comments", post(handlers::create_comment))
        .route("/posts/:id/comments", get(handlers::list_post_comments))
        .route(
            "/posts/:id/comments/:comment_id/moderate",
            post(handlers::moderate_comment),
        )
        .route(
            "/posts/:id/comments/:comment_id",
            delete(handlers::delete_comment),
        )
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::public_feed))
}

pub fn ai() -> Router<AppState> {
    Router::new()
        .route("/ai/generate", post(handlers::generate_content))
        .route("/ai/improve", post(handlers::improve_content))
}

pub fn media() -> Router<AppState> {
    Router::new().route("/media/upload", post(handlers::upload_image))
}
