use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::engagement::EngagementService;
use crate::app::feed::FeedService;
use crate::app::generation::{GenerationError, GenerationService, ImproveMode};
use crate::app::identity::IdentityService;
use crate::app::media::{MediaService, UploadError};
use crate::app::posts::{PostChanges, PostService};
use crate::app::social::SocialService;
use crate::domain::engagement::{CommentAuthor, CommentStatus};
use crate::domain::post::PostStatus;
use crate::http::{AppError, Identity};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn check_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(30);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    Ok(limit)
}

/// Users come into being on first authenticated access; the sync upsert is
/// idempotent, so every authenticated handler resolves the caller through it.
async fn resolve_user(state: &AppState, identity: &Identity) -> Result<Uuid, AppError> {
    let service = IdentityService::new(state.db.clone());
    service.sync_user(&identity.0).await.map_err(|err| {
        if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
            if let Some(db_err) = sqlx_err.as_database_error() {
                if db_err.code().as_deref() == Some("23505")
                    && db_err.constraint().unwrap_or_default().contains("users_username_key")
                {
                    return AppError::conflict("username already taken");
                }
            }
        }
        tracing::error!(error = ?err, "failed to sync identity");
        AppError::internal("failed to sync identity")
    })
}

async fn resolve_viewer(
    state: &AppState,
    identity: Option<&Identity>,
) -> Result<Option<Uuid>, AppError> {
    match identity {
        Some(identity) => Ok(Some(resolve_user(state, identity).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SyncResponse {
    pub user_id: Uuid,
}

pub async fn sync_identity(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<SyncResponse>, AppError> {
    let user_id = resolve_user(&state, &identity).await?;
    Ok(Json(SyncResponse { user_id }))
}

pub async fn get_current_user(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::user::User>, AppError> {
    let service = IdentityService::new(state.db.clone());
    let user = service
        .current_user(&identity.0.token_identifier)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to fetch current user");
            AppError::internal("failed to fetch current user")
        })?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found("user not found")),
    }
}

pub async fn get_user(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::user::PublicUser>, AppError> {
    let service = IdentityService::new(state.db.clone());
    let user = service.get_user(id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %id, "failed to fetch user");
        AppError::internal("failed to fetch user")
    })?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found("user not found")),
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub featured_image_url: Option<String>,
}

pub async fn create_post(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<crate::domain::post::Post>, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title cannot be empty"));
    }

    let author_id = resolve_user(&state, &identity).await?;
    let service = PostService::new(state.db.clone());
    let post = service
        .create_post(
            author_id,
            payload.title,
            payload.content,
            payload.tags,
            payload.category,
            payload.featured_image_url,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok(Json(post))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub featured_image_url: Option<String>,
}

pub async fn update_post(
    Path(id): Path<Uuid>,
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<crate::domain::post::Post>, AppError> {
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("title cannot be empty"));
        }
    }

    let author_id = resolve_user(&state, &identity).await?;
    let service = PostService::new(state.db.clone());
    let post = service
        .update_post(
            id,
            author_id,
            PostChanges {
                title: payload.title,
                content: payload.content,
                tags: payload.tags,
                category: payload.category,
                featured_image_url: payload.featured_image_url,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to update post");
            AppError::internal("failed to update post")
        })?;

    match post {
        Some(post) => {
            if post.status == PostStatus::Published {
                FeedService::new(state.db.clone(), state.cache.clone())
                    .invalidate()
                    .await;
            }
            Ok(Json(post))
        }
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn publish_post(
    Path(id): Path<Uuid>,
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::post::Post>, AppError> {
    let author_id = resolve_user(&state, &identity).await?;
    let service = PostService::new(state.db.clone());
    let post = service.publish_post(id, author_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to publish post");
        AppError::internal("failed to publish post")
    })?;

    match post {
        Some(post) => {
            FeedService::new(state.db.clone(), state.cache.clone())
                .invalidate()
                .await;
            Ok(Json(post))
        }
        None => Err(AppError::not_found("post is not a draft owned by you")),
    }
}

#[derive(Deserialize)]
pub struct SchedulePostRequest {
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
}

pub async fn schedule_post(
    Path(id): Path<Uuid>,
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<SchedulePostRequest>,
) -> Result<Json<crate::domain::post::Post>, AppError> {
    let author_id = resolve_user(&state, &identity).await?;
    let service = PostService::new(state.db.clone());
    let post = service
        .schedule_post(id, author_id, payload.scheduled_at)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to schedule post");
            AppError::internal("failed to schedule post")
        })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post is not a draft owned by you")),
    }
}

pub async fn get_post(
    Path(id): Path<Uuid>,
    identity: Option<Identity>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::post::Post>, AppError> {
    let viewer_id = resolve_viewer(&state, identity.as_ref()).await?;
    let service = PostService::new(state.db.clone());
    let post = service.get_post(id, viewer_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn delete_post(
    Path(id): Path<Uuid>,
    identity: Identity,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let author_id = resolve_user(&state, &identity).await?;
    let service = PostService::new(state.db.clone());
    let deleted = service.delete_post(id, author_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to delete post");
        AppError::internal("failed to delete post")
    })?;

    if deleted {
        FeedService::new(state.db.clone(), state.cache.clone())
            .invalidate()
            .await;
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("post not found"))
    }
}

#[derive(Deserialize)]
pub struct UserPostsQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub status: Option<String>,
}

pub async fn list_user_posts(
    Path(id): Path<Uuid>,
    identity: Option<Identity>,
    State(state): State<AppState>,
    Query(query): Query<UserPostsQuery>,
) -> Result<Json<ListResponse<crate::domain::post::Post>>, AppError> {
    let limit = check_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;
    let status = query
        .status
        .as_deref()
        .map(|status| {
            PostStatus::from_db(status)
                .ok_or_else(|| AppError::bad_request("status must be draft or published"))
        })
        .transpose()?;
    let viewer_id = resolve_viewer(&state, identity.as_ref()).await?;

    let service = PostService::new(state.db.clone());
    let posts = service
        .list_by_author(id, viewer_id, status, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list posts");
            AppError::internal("failed to list posts")
        })?;

    let next_cursor = if posts.len() == limit as usize {
        posts
            .last()
            .map(|post| (post.created_at, post.id))
            .and_then(|cursor| encode_cursor(Some(cursor)))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: posts,
        next_cursor,
    }))
}

#[derive(Serialize)]
pub struct ViewResponse {
    pub recorded: bool,
}

pub async fn record_post_view(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ViewResponse>, AppError> {
    let service = PostService::new(state.db.clone());
    let recorded = service.record_view(id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to record view");
        AppError::internal("failed to record view")
    })?;

    if recorded {
        Ok(Json(ViewResponse { recorded }))
    } else {
        Err(AppError::not_found("post not found"))
    }
}

pub async fn post_stats(
    Path(id): Path<Uuid>,
    identity: Identity,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<crate::domain::stats::DailyStat>>, AppError> {
    let limit = check_limit(query.limit)?;
    let author_id = resolve_user(&state, &identity).await?;

    let service = PostService::new(state.db.clone());
    let stats = service
        .daily_stats(id, author_id, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to fetch post stats");
            AppError::internal("failed to fetch post stats")
        })?;

    match stats {
        Some(stats) => Ok(Json(stats)),
        None => Err(AppError::not_found("post not found")),
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

pub async fn public_feed(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<crate::domain::post::Post>>, AppError> {
    let limit = check_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = FeedService::new(state.db.clone(), state.cache.clone());
    let (posts, next_cursor) = service.public_feed(cursor, limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to fetch feed");
        AppError::internal("failed to fetch feed")
    })?;

    Ok(Json(ListResponse {
        items: posts,
        next_cursor: encode_cursor(next_cursor),
    }))
}

// ---------------------------------------------------------------------------
// Social graph
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct FollowResponse {
    pub following: bool,
}

pub async fn toggle_follow(
    Path(id): Path<Uuid>,
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<FollowResponse>, AppError> {
    let follower_id = resolve_user(&state, &identity).await?;
    if follower_id == id {
        return Err(AppError::bad_request("cannot follow yourself"));
    }

    let service = SocialService::new(state.db.clone());
    let following = service.toggle_follow(follower_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %id, "failed to toggle follow");
        AppError::internal("failed to toggle follow")
    })?;

    match following {
        Some(following) => Ok(Json(FollowResponse { following })),
        None => Err(AppError::not_found("user not found")),
    }
}

pub async fn list_followers(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<crate::app::social::FollowEdgeUser>>, AppError> {
    let limit = check_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = SocialService::new(state.db.clone());
    let followers = service
        .list_followers(id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list followers");
            AppError::internal("failed to list followers")
        })?;

    let next_cursor = if followers.len() == limit as usize {
        followers
            .last()
            .map(|edge| (edge.followed_at, edge.user_id))
            .and_then(|cursor| encode_cursor(Some(cursor)))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: followers,
        next_cursor,
    }))
}

pub async fn list_following(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<crate::app::social::FollowEdgeUser>>, AppError> {
    let limit = check_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = SocialService::new(state.db.clone());
    let following = service
        .list_following(id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list following");
            AppError::internal("failed to list following")
        })?;

    let next_cursor = if following.len() == limit as usize {
        following
            .last()
            .map(|edge| (edge.followed_at, edge.user_id))
            .and_then(|cursor| encode_cursor(Some(cursor)))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: following,
        next_cursor,
    }))
}

// ---------------------------------------------------------------------------
// Engagement
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

pub async fn toggle_like(
    Path(id): Path<Uuid>,
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<LikeResponse>, AppError> {
    let user_id = resolve_user(&state, &identity).await?;

    let service = EngagementService::new(state.db.clone());
    let toggle = service.toggle_like(user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to toggle like");
        AppError::internal("failed to toggle like")
    })?;

    match toggle {
        Some(toggle) => Ok(Json(LikeResponse {
            liked: toggle.liked,
            like_count: toggle.like_count,
        })),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn list_post_likes(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<crate::domain::engagement::Like>>, AppError> {
    let limit = check_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = EngagementService::new(state.db.clone());
    let likes = service.list_likes(id, cursor, limit).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to list likes");
        AppError::internal("failed to list likes")
    })?;

    let next_cursor = if likes.len() == limit as usize {
        likes
            .last()
            .map(|like| (like.created_at, like.id))
            .and_then(|cursor| encode_cursor(Some(cursor)))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: likes,
        next_cursor,
    }))
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

pub async fn create_comment(
    Path(id): Path<Uuid>,
    identity: Option<Identity>,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<crate::domain::engagement::Comment>, AppError> {
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("comment body cannot be empty"));
    }

    let author = match identity {
        Some(identity) => {
            let user_id = resolve_user(&state, &identity).await?;
            let user = IdentityService::new(state.db.clone())
                .current_user(&identity.0.token_identifier)
                .await
                .map_err(|err| {
                    tracing::error!(error = ?err, "failed to fetch comment author");
                    AppError::internal("failed to create comment")
                })?
                .ok_or_else(|| AppError::unauthorized("invalid identity token"))?;
            CommentAuthor::Registered {
                user_id,
                name: user.name,
            }
        }
        None => {
            let name = payload
                .author_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    AppError::bad_request("author_name is required for anonymous comments")
                })?;
            CommentAuthor::Anonymous {
                name: name.to_string(),
                email: payload.author_email,
            }
        }
    };

    let service = EngagementService::new(state.db.clone());
    let comment = service
        .create_comment(id, author, payload.body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to create comment");
            AppError::internal("failed to create comment")
        })?;

    match comment {
        Some(comment) => Ok(Json(comment)),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Deserialize)]
pub struct CommentsQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub status: Option<String>,
}

pub async fn list_post_comments(
    Path(id): Path<Uuid>,
    identity: Option<Identity>,
    State(state): State<AppState>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<ListResponse<crate::domain::engagement::Comment>>, AppError> {
    let limit = check_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;
    let requested_status = query
        .status
        .as_deref()
        .map(|status| {
            CommentStatus::from_db(status)
                .ok_or_else(|| AppError::bad_request("status must be pending, approved or rejected"))
        })
        .transpose()?;

    let viewer_id = resolve_viewer(&state, identity.as_ref()).await?;
    let post = PostService::new(state.db.clone())
        .get_post(id, viewer_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to fetch post");
            AppError::internal("failed to list comments")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    // Only the post's author sees anything beyond approved comments.
    let status = if viewer_id == Some(post.author_id) {
        requested_status.unwrap_or(CommentStatus::Approved)
    } else {
        CommentStatus::Approved
    };

    let service = EngagementService::new(state.db.clone());
    let comments = service
        .list_comments(id, status, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to list comments");
            AppError::internal("failed to list comments")
        })?;

    let next_cursor = if comments.len() == limit as usize {
        comments
            .last()
            .map(|comment| (comment.created_at, comment.id))
            .and_then(|cursor| encode_cursor(Some(cursor)))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: comments,
        next_cursor,
    }))
}

#[derive(Deserialize)]
pub struct ModerateCommentRequest {
    pub status: String,
}

pub async fn moderate_comment(
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<ModerateCommentRequest>,
) -> Result<Json<crate::domain::engagement::Comment>, AppError> {
    let status = match CommentStatus::from_db(&payload.status) {
        Some(CommentStatus::Approved) => CommentStatus::Approved,
        Some(CommentStatus::Rejected) => CommentStatus::Rejected,
        _ => return Err(AppError::bad_request("status must be approved or rejected")),
    };

    let caller_id = resolve_user(&state, &identity).await?;
    let service = EngagementService::new(state.db.clone());
    let comment = service
        .moderate_comment(comment_id, post_id, caller_id, status)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, comment_id = %comment_id, "failed to moderate comment");
            AppError::internal("failed to moderate comment")
        })?;

    match comment {
        Some(comment) => Ok(Json(comment)),
        None => Err(AppError::not_found("comment not found")),
    }
}

pub async fn delete_comment(
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    identity: Identity,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let caller_id = resolve_user(&state, &identity).await?;
    let service = EngagementService::new(state.db.clone());
    let deleted = service
        .delete_comment(comment_id, post_id, caller_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, comment_id = %comment_id, "failed to delete comment");
            AppError::internal("failed to delete comment")
        })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("comment not found"))
    }
}

// ---------------------------------------------------------------------------
// AI generation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct ImproveRequest {
    pub content: String,
    #[serde(default)]
    pub mode: ImproveMode,
}

#[derive(Serialize)]
pub struct AiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn generation_service(state: &AppState) -> GenerationService<crate::infra::genai::GenAiClient> {
    GenerationService::new(
        state.genai.clone(),
        state.genai_models.clone(),
        Duration::from_secs(state.genai_attempt_timeout_seconds),
    )
}

fn ai_response(result: Result<String, GenerationError>) -> Result<Json<AiResponse>, AppError> {
    match result {
        Ok(content) => Ok(Json(AiResponse {
            success: true,
            content: Some(content),
            error: None,
        })),
        Err(err @ (GenerationError::MissingTitle | GenerationError::MissingContent)) => {
            Err(AppError::bad_request(err.to_string()))
        }
        Err(err) => Ok(Json(AiResponse {
            success: false,
            content: None,
            error: Some(err.to_string()),
        })),
    }
}

pub async fn generate_content(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<AiResponse>, AppError> {
    let _user_id = resolve_user(&state, &identity).await?;
    let service = generation_service(&state);
    let result = service
        .generate(&payload.title, &payload.category, &payload.tags)
        .await;
    ai_response(result)
}

pub async fn improve_content(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<ImproveRequest>,
) -> Result<Json<AiResponse>, AppError> {
    let _user_id = resolve_user(&state, &identity).await?;
    let service = generation_service(&state);
    let result = service.improve(&payload.content, payload.mode).await;
    ai_response(result)
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

pub async fn upload_image(
    identity: Identity,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let user_id = resolve_user(&state, &identity).await?;

    let mut file: Option<(bytes::Bytes, Option<String>, Option<String>)> = None;
    let mut override_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("invalid multipart body"))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("failed to read file field"))?;
                file = Some((data, file_name, content_type));
            }
            Some("fileName") => {
                let name = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("failed to read fileName field"))?;
                override_name = Some(name);
            }
            _ => {}
        }
    }

    let Some((data, file_name, content_type)) = file else {
        return Err(AppError::bad_request("no file provided"));
    };
    let file_name = override_name.or(file_name);

    let service = MediaService::new(state.storage.clone(), state.upload_folder.clone());
    match service
        .upload_image(user_id, data, file_name, content_type)
        .await
    {
        Ok(uploaded) => Ok(Json(json!({
            "success": true,
            "url": uploaded.url,
            "file_id": uploaded.file_id,
            "width": uploaded.width,
            "height": uploaded.height,
            "size": uploaded.size,
            "name": uploaded.name,
        }))
        .into_response()),
        Err(UploadError::InvalidImage) => {
            Err(AppError::bad_request("file is not a supported image"))
        }
        Err(UploadError::Provider(details)) => {
            tracing::error!(error = %details, "image upload failed");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "failed to upload image",
                    "details": details,
                })),
            )
                .into_response())
        }
    }
}
