use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::infra::genai::GenAiError;

/// Seam to the text-generation provider: one model, one prompt, one attempt.
pub trait TextModel {
    fn complete(
        &self,
        model: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, GenAiError>> + Send;
}

impl TextModel for crate::infra::genai::GenAiClient {
    fn complete(
        &self,
        model: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, GenAiError>> + Send {
        self.generate_text(model, prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImproveMode {
    #[default]
    Enhance,
    Expand,
    Simplify,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("title is required to generate content")]
    MissingTitle,
    #[error("content is required for improvement")]
    MissingContent,
    #[error("generated content is too short or empty")]
    ContentTooShort,
    #[error("{0}")]
    Exhausted(String),
}

/// Generated drafts shorter than this are treated as a failed generation even
/// when the provider call itself succeeded.
const MIN_GENERATED_CHARS: usize = 100;

#[derive(Clone)]
pub struct GenerationService<M> {
    model_api: M,
    models: Vec<String>,
    attempt_timeout: Duration,
}

impl<M: TextModel> GenerationService<M> {
    pub fn new(model_api: M, models: Vec<String>, attempt_timeout: Duration) -> Self {
        Self {
            model_api,
            models,
            attempt_timeout,
        }
    }

    /// Draft a post body from its title plus optional category and tags.
    /// Fails before any network call when the title is empty.
    pub async fn generate(
        &self,
        title: &str,
        category: &str,
        tags: &[String],
    ) -> Result<String, GenerationError> {
        if title.trim().is_empty() {
            return Err(GenerationError::MissingTitle);
        }

        let prompt = build_post_prompt(title, category, tags);
        let content = self.run_fallback(&prompt).await?;
        let content = content.trim();
        if content.chars().count() < MIN_GENERATED_CHARS {
            return Err(GenerationError::ContentTooShort);
        }

        Ok(content.to_string())
    }

    /// Rework existing content in the requested mode. No length floor here;
    /// a simplify pass may legitimately come back short.
    pub async fn improve(
        &self,
        content: &str,
        mode: ImproveMode,
    ) -> Result<String, GenerationError> {
        if content.trim().is_empty() {
            return Err(GenerationError::MissingContent);
        }

        let prompt = build_improve_prompt(content, mode);
        let improved = self.run_fallback(&prompt).await?;
        Ok(improved.trim().to_string())
    }

    /// Try each model once, in list order, first non-empty response wins.
    /// Timeouts count as ordinary failures. Exhaustion surfaces the last
    /// error, mapped to a caller-facing message by kind.
    async fn run_fallback(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut last_error: Option<GenAiError> = None;

        for model in &self.models {
            let attempt = match timeout(
                self.attempt_timeout,
                self.model_api.complete(model, prompt),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(GenAiError::Timeout),
            };

            match attempt {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!(model = %model, "model produced content");
                    return Ok(text);
                }
                Ok(_) => {
                    tracing::warn!(model = %model, "model returned empty content");
                    last_error = Some(GenAiError::Provider(format!(
                        "model {} returned no content",
                        model
                    )));
                }
                Err(err) => {
                    tracing::warn!(model = %model, error = %err, "model attempt failed");
                    last_error = Some(err);
                }
            }
        }

        let err = last_error
            .unwrap_or_else(|| GenAiError::Provider("no models configured".to_string()));
        Err(GenerationError::Exhausted(classify_failure(&err)))
    }
}

fn classify_failure(err: &GenAiError) -> String {
    match err {
        GenAiError::Configuration => {
            "AI service configuration error. Please try again later.".to_string()
        }
        GenAiError::Throttled => {
            "AI service is temporarily unavailable. Please try again later.".to_string()
        }
        other => other.to_string(),
    }
}

fn build_post_prompt(title: &str, category: &str, tags: &[String]) -> String {
    let mut prompt = format!(
        "Write a comprehensive blog post with the title: \"{}\"\n\n",
        title
    );
    if !category.is_empty() {
        prompt.push_str(&format!("Category: {}\n", category));
    }
    if !tags.is_empty() {
        prompt.push_str(&format!("Tags: {}\n", tags.join(", ")));
    }
    prompt.push_str(
        "\nRequirements:\n\
         - Write engaging, informative content that matches the title\n\
         - Use proper HTML formatting with headers (h2, h3), paragraphs, lists, and emphasis\n\
         - Include 3-5 main sections with clear subheadings\n\
         - Write in a conversational yet professional tone\n\
         - Make it approximately 800-1200 words\n\
         - Include practical insights, examples, or actionable advice where relevant\n\
         - Use <h2> for main sections and <h3> for subsections\n\
         - Use <p> tags for paragraphs\n\
         - Use <ul> and <li> for bullet points when appropriate\n\
         - Use <strong> and <em> for emphasis\n\n\
         Do not include the title in the content as it will be added separately.\n\
         Start directly with the introduction paragraph.\n",
    );
    prompt
}

fn build_improve_prompt(content: &str, mode: ImproveMode) -> String {
    match mode {
        ImproveMode::Expand => format!(
            "Take this blog content and expand it with more details, examples, and insights:\n\n\
             {}\n\n\
             Requirements:\n\
             - Keep the existing structure and main points\n\
             - Add more depth and detail to each section\n\
             - Include practical examples and insights\n\
             - Maintain the original tone and style\n\
             - Return the improved content in the same HTML format\n",
            content
        ),
        ImproveMode::Simplify => format!(
            "Take this blog content and make it more concise and easier to read:\n\n\
             {}\n\n\
             Requirements:\n\
             - Keep all main points but make them clearer\n\
             - Remove unnecessary complexity\n\
             - Use simpler language where possible\n\
             - Maintain the HTML formatting\n",
            content
        ),
        ImproveMode::Enhance => format!(
            "Improve this blog content by making it more engaging and well-structured:\n\n\
             {}\n\n\
             Requirements:\n\
             - Improve the flow and readability\n\
             - Add engaging transitions between sections\n\
             - Enhance with better examples or explanations\n\
             - Maintain the original HTML structure\n\
             - Keep the same length approximately\n",
            content
        ),
    }
}
