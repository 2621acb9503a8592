use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::Instrument;

use crate::config::GenerationSettings;
use crate::models::{
    CreativeSuggestionsRequest, CreativeSuggestionsResponse, GenerateChapterRequest,
    GenerateChapterResponse, GenerationMetadata, SummarizeChapterRequest,
    SummarizeChapterResponse, word_count,
};
use crate::services::llm::{GenerationError, TextGenerator};
use crate::services::parser::{self, SummaryParse};
use crate::services::prompts;

pub const MIN_LENGTH_IN_PAGES: u32 = 1;
pub const MAX_LENGTH_IN_PAGES: u32 = 50;
pub const MIN_SUGGESTIONS: u32 = 1;
pub const MAX_SUGGESTIONS: u32 = 20;
pub const MIN_CHAPTER_TEXT_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Runs each request through prompt building, one model call, and parsing.
#[derive(Clone)]
pub struct StoryService {
    generator: Arc<dyn TextGenerator>,
    settings: Arc<GenerationSettings>,
}

impl StoryService {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: Arc<GenerationSettings>) -> Self {
        StoryService {
            generator,
            settings,
        }
    }

    pub async fn generate_chapter(
        &self,
        request: &GenerateChapterRequest,
    ) -> Result<GenerateChapterResponse, ServiceError> {
        validate_chapter(request)?;

        let span = tracing::info_span!(
            "generate_chapter",
            request_id = %uuid::Uuid::new_v4(),
            project_id = %request.project_id,
            chapter_id = %request.chapter_id,
            mode = ?request.mode,
        );

        async {
            tracing::info!(
                chapter_title = %request.chapter_title,
                previous_chapters = request.previous_chapters.len(),
                "generating chapter"
            );

            let prompt = prompts::build_chapter_prompt(request);
            let text = self.complete(&prompt).await?;
            let tokens_used = word_count(&text);

            tracing::info!(tokens_used, "chapter generated");

            Ok::<_, ServiceError>(GenerateChapterResponse {
                text,
                tokens_used,
                metadata: GenerationMetadata {
                    model: self.settings.model.clone(),
                    created_at: Utc::now(),
                    temperature: self.settings.temperature,
                    max_tokens: self.settings.max_output_tokens,
                },
            })
        }
        .instrument(span)
        .await
    }

    pub async fn creative_suggestions(
        &self,
        request: &CreativeSuggestionsRequest,
    ) -> Result<CreativeSuggestionsResponse, ServiceError> {
        validate_suggestions(request)?;

        let span = tracing::info_span!(
            "creative_suggestions",
            request_id = %uuid::Uuid::new_v4(),
            kind = request.kind.as_str(),
        );

        async {
            tracing::info!(count = request.count, "generating creative suggestions");

            let prompt = prompts::build_suggestions_prompt(request);
            let text = self.complete(&prompt).await?;

            let parsed = parser::parse_suggestions(&text, request.count as usize);
            if parsed.is_fallback() {
                tracing::warn!("no suggestion blocks found, fell back to line parsing");
            }
            let suggestions = parsed.into_suggestions();
            if suggestions.len() < request.count as usize {
                tracing::warn!(
                    parsed = suggestions.len(),
                    requested = request.count,
                    "fewer suggestions than requested"
                );
            }

            tracing::info!(count = suggestions.len(), "creative suggestions generated");
            Ok::<_, ServiceError>(CreativeSuggestionsResponse { suggestions })
        }
        .instrument(span)
        .await
    }

    pub async fn summarize_chapter(
        &self,
        request: &SummarizeChapterRequest,
    ) -> Result<SummarizeChapterResponse, ServiceError> {
        validate_summary(request)?;

        let span = tracing::info_span!(
            "summarize_chapter",
            request_id = %uuid::Uuid::new_v4(),
            chapter_title = request.chapter_title.as_deref().unwrap_or(""),
        );

        async {
            tracing::info!(
                chapter_chars = request.chapter_text.chars().count(),
                "summarizing chapter"
            );

            let prompt = prompts::build_summary_prompt(request);
            let text = self.complete(&prompt).await?;

            let summary = match parser::parse_summary(&text) {
                SummaryParse::Structured { summary, missing } => {
                    if !missing.is_empty() {
                        tracing::warn!(?missing, "summary sections missing, using placeholders");
                    }
                    summary
                }
                SummaryParse::Raw(summary) => {
                    tracing::warn!("no summary section markers found, returning raw text");
                    summary
                }
            };

            let summary = summary.to_text();
            let tokens_used = word_count(&summary);
            tracing::info!(tokens_used, "chapter summarized");

            Ok::<_, ServiceError>(SummarizeChapterResponse {
                summary,
                tokens_used,
            })
        }
        .instrument(span)
        .await
    }

    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let text = self.generator.generate(prompt).await?;
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse.into());
        }
        Ok(text)
    }
}

fn require(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn validate_chapter(request: &GenerateChapterRequest) -> Result<(), ServiceError> {
    if !(MIN_LENGTH_IN_PAGES..=MAX_LENGTH_IN_PAGES).contains(&request.length_in_pages) {
        return Err(ServiceError::Validation(format!(
            "lengthInPages must be between {} and {}, got {}",
            MIN_LENGTH_IN_PAGES, MAX_LENGTH_IN_PAGES, request.length_in_pages
        )));
    }
    require("projectTitle", &request.project_title)?;
    require("chapterTitle", &request.chapter_title)?;
    require("chapterSummary", &request.chapter_summary)?;
    require("language", &request.language)?;
    Ok(())
}

fn validate_suggestions(request: &CreativeSuggestionsRequest) -> Result<(), ServiceError> {
    if !(MIN_SUGGESTIONS..=MAX_SUGGESTIONS).contains(&request.count) {
        return Err(ServiceError::Validation(format!(
            "count must be between {} and {}, got {}",
            MIN_SUGGESTIONS, MAX_SUGGESTIONS, request.count
        )));
    }
    Ok(())
}

fn validate_summary(request: &SummarizeChapterRequest) -> Result<(), ServiceError> {
    let chars = request.chapter_text.trim().chars().count();
    if chars < MIN_CHAPTER_TEXT_CHARS {
        return Err(ServiceError::Validation(format!(
            "chapterText must have at least {} characters, got {}",
            MIN_CHAPTER_TEXT_CHARS, chars
        )));
    }
    require("language", &request.language)?;
    Ok(())
}
