//! Uploaded document -> extracted text -> generated summary.

use crate::error::AgentError;
use crate::services::extractor::{ExtractError, TextExtractor};
use crate::services::metrics;
use crate::services::providers::{FinishReason, TextProvider};
use bytes::Bytes;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tempfile::{NamedTempFile, TempPath};

/// Characters of extracted text sent to the provider.
pub const MAX_PROMPT_CHARS: usize = 8000;

pub const PROMPT_PREFIX: &str = "Please provide a comprehensive summary of the following text:\n\n";

/// First `max` Unicode scalar values of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_prompt(text: &str) -> String {
    format!("{}{}", PROMPT_PREFIX, truncate_chars(text, MAX_PROMPT_CHARS))
}

#[derive(Clone)]
pub struct Summarizer {
    extractor: Arc<dyn TextExtractor>,
    provider: Arc<dyn TextProvider>,
}

impl Summarizer {
    pub fn new(extractor: Arc<dyn TextExtractor>, provider: Arc<dyn TextProvider>) -> Self {
        Self {
            extractor,
            provider,
        }
    }

    pub fn provider(&self) -> &Arc<dyn TextProvider> {
        &self.provider
    }

    #[tracing::instrument(skip(self, document), fields(size = document.len()))]
    pub async fn summarize(&self, document: Bytes) -> Result<String, AgentError> {
        let result = self.run(document).await;
        metrics::record_summary(if result.is_ok() { "success" } else { "failure" });
        result
    }

    async fn run(&self, document: Bytes) -> Result<String, AgentError> {
        if document.is_empty() {
            return Err(ExtractError::Empty.into());
        }

        let extractor = Arc::clone(&self.extractor);
        let (text, temp_path) = tokio::task::spawn_blocking(move || extract(&*extractor, &document))
            .await
            .map_err(|e| AgentError::Parse(format!("Text extraction task failed: {}", e)))??;

        let prompt = build_prompt(&text);
        tracing::debug!(
            extracted_chars = text.chars().count(),
            prompt_chars = prompt.chars().count(),
            "Submitting prompt"
        );

        let model = self.provider.model().to_string();
        let started = Instant::now();
        let response = self.provider.generate(&prompt).await;
        metrics::record_provider_latency(&model, started.elapsed().as_secs_f64());
        let response = response?;
        metrics::record_tokens(&model, response.input_tokens, response.output_tokens);
        if response.finish_reason == FinishReason::Length {
            tracing::warn!(
                model = %model,
                output_tokens = response.output_tokens,
                "Summary stopped at the output token limit"
            );
        }

        if let Err(e) = temp_path.close() {
            tracing::warn!(error = %e, "Failed to remove temporary upload");
        }

        Ok(response.text)
    }
}

/// Writes the upload to a temp file, closes the handle, then extracts every page.
///
/// The returned path deletes the file when dropped.
fn extract(
    extractor: &dyn TextExtractor,
    document: &[u8],
) -> Result<(String, TempPath), AgentError> {
    let storage = |e: std::io::Error| AgentError::Storage(format!("Failed to buffer upload: {}", e));

    let mut file = NamedTempFile::new().map_err(storage)?;
    file.write_all(document).map_err(storage)?;
    file.flush().map_err(storage)?;
    let path = file.into_temp_path();

    let pages = extractor.extract_pages(&path)?;
    Ok((pages.concat(), path))
}
