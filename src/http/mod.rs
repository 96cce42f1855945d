use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::Identity;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .merge(routes::identity())
        .merge(routes::users())
        .merge(routes::posts())
        .merge(routes::feed())
        .merge(routes::ai())
        .merge(routes::media());

    Router::new()
        .merge(routes::health())
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.upload_max_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
