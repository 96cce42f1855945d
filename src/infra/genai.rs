use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::config::AppConfig;

/// Failure kinds surfaced by the text-generation provider, keyed off the HTTP
/// exchange rather than provider message wording.
#[derive(Debug, Clone, Error)]
pub enum GenAiError {
    #[error("provider rejected the API key")]
    Configuration,
    #[error("provider quota or rate limit exhausted")]
    Throttled,
    #[error("model request timed out")]
    Timeout,
    #[error("{0}")]
    Provider(String),
}

#[derive(Clone)]
pub struct GenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GenAiClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.genai_attempt_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.genai_base_url.clone(),
            api_key: config.genai_api_key.clone(),
        })
    }

    /// One generation request against one named model. Each call is a single
    /// attempt; retry policy lives in the caller.
    pub async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, GenAiError> {
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        let url = format!("{}/v1beta/{}:generateContent", self.base_url, model_path);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GenAiError::Timeout
                } else {
                    GenAiError::Provider(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("provider returned status {}", status));
            return Err(classify_status(status, message));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| GenAiError::Provider(err.to_string()))?;

        let text: String = body
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .collect();

        if text.is_empty() {
            return Err(GenAiError::Provider(format!(
                "model {} returned no content",
                model
            )));
        }

        Ok(text)
    }
}

fn classify_status(status: StatusCode, message: String) -> GenAiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenAiError::Configuration,
        StatusCode::TOO_MANY_REQUESTS => GenAiError::Throttled,
        _ => GenAiError::Provider(message),
    }
}
