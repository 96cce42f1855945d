pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::{cache::RedisCache, db::Db, genai::GenAiClient, storage::ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub storage: ObjectStorage,
    pub genai: GenAiClient,
    pub genai_models: Vec<String>,
    pub genai_attempt_timeout_seconds: u64,
    pub identity_token_key: [u8; 32],
    pub upload_folder: String,
    pub upload_max_bytes: usize,
}
