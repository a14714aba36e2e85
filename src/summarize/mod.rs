//! Summarization Orchestrator: two-phase map/reduce over document chunks.
//!
//! The pipeline moves through [`SummaryPhase::Chunking`], [`SummaryPhase::MapPhase`],
//! [`SummaryPhase::ReducePhase`], and [`SummaryPhase::Done`]. The map phase fans out one
//! completion per chunk and waits for every call to settle; a failed call becomes a
//! placeholder [`PartialSummary`] instead of aborting its siblings, so the reduce phase always
//! sees one partial per chunk, in document order. The reduce reply must be a bare JSON object
//! matching [`StructuredSummary`]; a reply that does not parse is reported as
//! [`SummarizeError::SummarizationFailed`] and never retried.

mod prompts;

use crate::chunking::{Chunk, ChunkingError, chunk_text};
use crate::config::Config;
use crate::extraction::ExtractedDocument;
use crate::gateway::{Gateway, GatewayError};
use crate::metrics::PipelineMetrics;
use futures_util::{StreamExt, future::join_all, stream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Text used in place of a chunk summary whose completion call failed.
pub const PLACEHOLDER_SUMMARY: &str = "Summary unavailable for this section.";
const DISPLAY_TRUNCATION_MARKER: &str = "... [truncated]";
const PROCESSING_TRUNCATION_MARKER: &str = "... [truncated for processing]";

/// Errors surfaced by the summarization pipeline.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// The chunker rejected its configuration.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The reduce-phase completion call failed.
    #[error("Summarization request failed: {0}")]
    Gateway(#[from] GatewayError),
    /// The model replied, but not with the required JSON object.
    #[error("The document was processed but summarization failed: {reason}")]
    SummarizationFailed {
        /// Parser diagnostic.
        reason: String,
        /// Extracted text the caller may still display.
        display: Option<DisplayText>,
    },
}

/// Pipeline stage, used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryPhase {
    /// Splitting the document.
    Chunking,
    /// Per-chunk summaries in flight.
    MapPhase,
    /// Merging partial summaries.
    ReducePhase,
    /// Structured summary produced.
    Done,
}

/// Map-phase result for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSummary {
    /// Index of the originating chunk.
    pub chunk_index: usize,
    /// Summary text, or [`PLACEHOLDER_SUMMARY`] when `failed`.
    pub text: String,
    /// Whether the completion call for this chunk failed.
    pub failed: bool,
}

impl PartialSummary {
    /// Successful chunk summary.
    pub fn succeeded(chunk_index: usize, text: String) -> Self {
        Self {
            chunk_index,
            text,
            failed: false,
        }
    }

    /// Placeholder for a chunk whose call failed.
    pub fn failed(chunk_index: usize) -> Self {
        Self {
            chunk_index,
            text: PLACEHOLDER_SUMMARY.to_string(),
            failed: true,
        }
    }

    fn from_result(chunk_index: usize, result: Result<String, GatewayError>) -> Self {
        match result {
            Ok(text) => Self::succeeded(chunk_index, text),
            Err(error) => {
                tracing::warn!(chunk_index, error = %error, "Chunk summary failed; using placeholder");
                Self::failed(chunk_index)
            }
        }
    }
}

/// Reduce-phase output parsed from the model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredSummary {
    /// Short prose summary.
    pub summary: String,
    /// Risks called out by the model.
    pub risks: Vec<String>,
    /// Important keywords.
    pub keywords: Vec<String>,
}

impl StructuredSummary {
    /// Parse a model reply that must be exactly one JSON object with the three fields.
    pub fn parse(reply: &str) -> Result<Self, String> {
        serde_json::from_str(reply.trim()).map_err(|error| error.to_string())
    }
}

/// Extracted text prepared for display next to a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayText {
    /// Possibly truncated text.
    pub text: String,
    /// Character count of the untruncated text.
    pub full_length: usize,
    /// Whether `text` was cut at the display cap.
    pub truncated: bool,
}

impl DisplayText {
    /// Cap `raw` at `cap` characters unless `full_text` is requested.
    pub fn new(raw: &str, cap: usize, full_text: bool) -> Self {
        let full_length = raw.chars().count();
        if full_text || full_length <= cap {
            return Self {
                text: raw.to_string(),
                full_length,
                truncated: false,
            };
        }
        let mut text: String = raw.chars().take(cap).collect();
        text.push_str(DISPLAY_TRUNCATION_MARKER);
        Self {
            text,
            full_length,
            truncated: true,
        }
    }
}

/// Result of summarizing an uploaded document.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    /// Structured reduce-phase output.
    pub summary: StructuredSummary,
    /// Extracted text for display.
    pub display: DisplayText,
    /// Number of chunks sent through the map phase.
    pub chunk_count: usize,
    /// Chunks that fell back to the placeholder.
    pub failed_chunks: usize,
}

/// Result of summarizing pasted text.
#[derive(Debug, Clone)]
pub struct TextSummary {
    /// Structured model output.
    pub summary: StructuredSummary,
    /// Character count of the submitted text.
    pub original_length: usize,
    /// Character count of the text actually sent to the model.
    pub processed_length: usize,
    /// Whether the submitted text was cut before prompting.
    pub truncated: bool,
}

/// Limits used by the summarization pipeline.
#[derive(Debug, Clone)]
pub struct SummarySettings {
    /// Chunker window size in characters.
    pub chunk_size: usize,
    /// Optional cap on simultaneous map-phase calls; `None` fans out fully.
    pub max_concurrency: Option<usize>,
    /// Display cap applied to extracted text.
    pub max_raw_text_length: usize,
    /// Input cap for pasted-text summaries.
    pub max_text_length_for_model: usize,
}

impl SummarySettings {
    /// Settings described by the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.summary_chunk_size,
            max_concurrency: config.summary_max_concurrency,
            max_raw_text_length: config.max_raw_text_length,
            max_text_length_for_model: config.max_text_length_for_model,
        }
    }
}

/// Drives chunking, the map phase, and the reduce phase for one request at a time.
///
/// Holds no per-request state; construct once and share through an `Arc`.
pub struct SummarizationService {
    gateway: Gateway,
    settings: SummarySettings,
    metrics: Arc<PipelineMetrics>,
}

impl SummarizationService {
    /// Build a service over the shared gateway.
    pub fn new(gateway: Gateway, settings: SummarySettings, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            gateway,
            settings,
            metrics,
        }
    }

    /// Summarize an extracted document into a [`DocumentSummary`].
    ///
    /// When `full_text` is false the returned display text is capped at the configured length.
    pub async fn summarize(
        &self,
        document: &ExtractedDocument,
        full_text: bool,
    ) -> Result<DocumentSummary, SummarizeError> {
        let display = DisplayText::new(
            document.raw_text(),
            self.settings.max_raw_text_length,
            full_text,
        );

        tracing::debug!(phase = ?SummaryPhase::Chunking, chars = document.length(), "Summarizing document");
        let chunks = chunk_text(document.raw_text(), self.settings.chunk_size)?;

        tracing::debug!(phase = ?SummaryPhase::MapPhase, chunks = chunks.len(), "Summarizing chunks");
        let partials = self.map_chunks(&chunks).await;
        let failed_chunks = partials.iter().filter(|partial| partial.failed).count();

        tracing::debug!(phase = ?SummaryPhase::ReducePhase, failed_chunks, "Merging partial summaries");
        let summary = self.reduce(&partials).await.map_err(|error| match error {
            SummarizeError::SummarizationFailed { reason, .. } => {
                SummarizeError::SummarizationFailed {
                    reason,
                    display: Some(display.clone()),
                }
            }
            other => other,
        })?;

        let truncated = display.truncated;
        tracing::info!(
            phase = ?SummaryPhase::Done,
            format = %document.source_format(),
            chunks = chunks.len(),
            failed_chunks,
            truncated,
            "Document summarized"
        );
        Ok(DocumentSummary {
            summary,
            display,
            chunk_count: chunks.len(),
            failed_chunks,
        })
    }

    /// Request a short summary for every chunk and wait for all of them to settle.
    ///
    /// Always returns exactly one [`PartialSummary`] per chunk, ordered by chunk index.
    pub async fn map_chunks(&self, chunks: &[Chunk]) -> Vec<PartialSummary> {
        let calls: Vec<_> = chunks
            .iter()
            .map(|chunk| self.summarize_chunk(chunk))
            .collect();
        let partials: Vec<PartialSummary> = match self.settings.max_concurrency {
            Some(limit) => stream::iter(calls).buffered(limit.max(1)).collect().await,
            None => join_all(calls).await,
        };

        let failed = partials.iter().filter(|partial| partial.failed).count();
        self.metrics
            .record_map_phase(partials.len() as u64, failed as u64);
        partials
    }

    async fn summarize_chunk(&self, chunk: &Chunk) -> PartialSummary {
        let prompt = prompts::chunk_summary_prompt(&chunk.text);
        let result = self.gateway.complete(&prompt).await;
        PartialSummary::from_result(chunk.index, result)
    }

    /// Merge partial summaries into the structured summary with a single completion call.
    pub async fn reduce(
        &self,
        partials: &[PartialSummary],
    ) -> Result<StructuredSummary, SummarizeError> {
        let prompt = prompts::merge_prompt(partials);
        let reply = self.gateway.complete(&prompt).await.inspect_err(|_| {
            self.metrics.record_summarization_failure();
        })?;
        self.parse_reply(&reply)
    }

    /// Summarize pasted text with a single structured-summary prompt.
    ///
    /// Input longer than the configured cap is cut and marked before prompting.
    pub async fn summarize_text(&self, text: &str) -> Result<TextSummary, SummarizeError> {
        let original_length = text.chars().count();
        let cap = self.settings.max_text_length_for_model;
        let truncated = original_length > cap;
        let processed = if truncated {
            let mut head: String = text.chars().take(cap).collect();
            head.push_str(PROCESSING_TRUNCATION_MARKER);
            head
        } else {
            text.to_string()
        };

        let reply = self
            .gateway
            .complete(&prompts::text_summary_prompt(&processed))
            .await
            .inspect_err(|_| self.metrics.record_summarization_failure())?;
        let summary = self.parse_reply(&reply)?;

        tracing::info!(original_length, truncated, "Text summarized");
        Ok(TextSummary {
            summary,
            original_length,
            processed_length: processed.chars().count(),
            truncated,
        })
    }

    fn parse_reply(&self, reply: &str) -> Result<StructuredSummary, SummarizeError> {
        StructuredSummary::parse(reply).map_err(|reason| {
            self.metrics.record_summarization_failure();
            tracing::error!(
                reason = %reason,
                reply_chars = reply.chars().count(),
                "Model reply is not a valid structured summary"
            );
            SummarizeError::SummarizationFailed {
                reason,
                display: None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::DocumentFormat;
    use crate::gateway::testing::{ScriptedClient, gateway};

    const SUMMARY_JSON: &str =
        r#"{"summary": "A lease.", "risks": ["late fees"], "keywords": ["lease", "rent"]}"#;

    fn settings(chunk_size: usize) -> SummarySettings {
        SummarySettings {
            chunk_size,
            max_concurrency: None,
            max_raw_text_length: 50,
            max_text_length_for_model: 40,
        }
    }

    fn service(client: Arc<ScriptedClient>, settings: SummarySettings) -> SummarizationService {
        SummarizationService::new(gateway(client), settings, Arc::new(PipelineMetrics::new()))
    }

    fn document(text: &str) -> ExtractedDocument {
        ExtractedDocument::new(text.to_string(), DocumentFormat::Txt)
    }

    fn is_chunk_prompt(prompt: &str) -> bool {
        prompt.starts_with("Give a very short structured summary")
    }

    /// Three chunks whose bodies start with a distinct marker word.
    fn three_chunk_text() -> String {
        ["alpha", "bravo", "charlie"]
            .iter()
            .map(|word| {
                let mut block = format!("{word} ");
                block.push_str(&"x".repeat(98));
                block.push('.');
                block
            })
            .collect()
    }

    fn marker(prompt: &str) -> &str {
        let body = prompt.rsplit("\n\n").next().unwrap_or("");
        body.split_whitespace().next().unwrap_or("")
    }

    #[tokio::test]
    async fn merge_prompt_lists_partials_in_document_order() {
        let client = ScriptedClient::new(|prompt| {
            if is_chunk_prompt(prompt) {
                Ok(format!("summary-of-{}", marker(prompt)))
            } else {
                Ok(SUMMARY_JSON.to_string())
            }
        });
        let service = service(client.clone(), settings(110));

        let result = service
            .summarize(&document(&three_chunk_text()), false)
            .await
            .expect("summary");

        assert_eq!(result.chunk_count, 3);
        assert_eq!(result.failed_chunks, 0);
        assert_eq!(result.summary.keywords, vec!["lease", "rent"]);

        let prompts = client.prompts();
        let merge = prompts.iter().find(|p| !is_chunk_prompt(p)).expect("merge prompt");
        let alpha = merge.find("summary-of-alpha").expect("alpha");
        let bravo = merge.find("summary-of-bravo").expect("bravo");
        let charlie = merge.find("summary-of-charlie").expect("charlie");
        assert!(alpha < bravo && bravo < charlie);
    }

    #[tokio::test]
    async fn map_phase_covers_every_chunk_when_all_calls_fail() {
        let client = ScriptedClient::failing();
        let service = service(client, settings(110));
        let chunks = chunk_text(&three_chunk_text(), 110).expect("chunks");

        let partials = service.map_chunks(&chunks).await;

        assert_eq!(partials.len(), chunks.len());
        for (index, partial) in partials.iter().enumerate() {
            assert_eq!(partial.chunk_index, index);
            assert!(partial.failed);
            assert_eq!(partial.text, PLACEHOLDER_SUMMARY);
        }
    }

    #[tokio::test]
    async fn isolated_chunk_failure_becomes_placeholder() {
        let client = ScriptedClient::new(|prompt| {
            if is_chunk_prompt(prompt) {
                if marker(prompt) == "bravo" {
                    Err(GatewayError::UpstreamStatus {
                        status: 503,
                        body: "busy".into(),
                    })
                } else {
                    Ok(format!("summary-of-{}", marker(prompt)))
                }
            } else {
                Ok(SUMMARY_JSON.to_string())
            }
        });
        let service = service(client.clone(), settings(110));

        let result = service
            .summarize(&document(&three_chunk_text()), false)
            .await
            .expect("summary");
        assert_eq!(result.failed_chunks, 1);

        let prompts = client.prompts();
        let merge = prompts.iter().find(|p| !is_chunk_prompt(p)).expect("merge prompt");
        assert_eq!(merge.matches(PLACEHOLDER_SUMMARY).count(), 1);
        assert!(merge.find("summary-of-alpha") < merge.find(PLACEHOLDER_SUMMARY));
    }

    #[tokio::test]
    async fn bounded_fan_out_preserves_order() {
        let client = ScriptedClient::new(|prompt| {
            if is_chunk_prompt(prompt) {
                Ok(format!("summary-of-{}", marker(prompt)))
            } else {
                Ok(SUMMARY_JSON.to_string())
            }
        });
        let mut bounded = settings(110);
        bounded.max_concurrency = Some(1);
        let service = service(client, bounded);
        let chunks = chunk_text(&three_chunk_text(), 110).expect("chunks");

        let partials = service.map_chunks(&chunks).await;
        let texts: Vec<&str> = partials.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["summary-of-alpha", "summary-of-bravo", "summary-of-charlie"]
        );
    }

    #[tokio::test]
    async fn malformed_merge_reply_is_summarization_failed_with_display_text() {
        let client = ScriptedClient::new(|prompt| {
            if is_chunk_prompt(prompt) {
                Ok("fine".into())
            } else {
                Ok("Here is the JSON: {not json}".into())
            }
        });
        let metrics = Arc::new(PipelineMetrics::new());
        let service = SummarizationService::new(gateway(client), settings(110), metrics.clone());
        let text = three_chunk_text();

        let error = service
            .summarize(&document(&text), false)
            .await
            .expect_err("parse failure");

        match error {
            SummarizeError::SummarizationFailed { display, .. } => {
                let display = display.expect("display text");
                assert!(display.truncated);
                assert_eq!(display.full_length, text.chars().count());
                assert!(display.text.starts_with("alpha"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(metrics.snapshot().summarization_failures, 1);
    }

    #[tokio::test]
    async fn merge_gateway_failure_is_not_a_parse_failure() {
        let client = ScriptedClient::new(|prompt| {
            if is_chunk_prompt(prompt) {
                Ok("fine".into())
            } else {
                Err(GatewayError::Unreachable("down".into()))
            }
        });
        let service = service(client, settings(110));
        let error = service
            .summarize(&document("Short text."), false)
            .await
            .expect_err("gateway failure");
        assert!(matches!(error, SummarizeError::Gateway(_)));
    }

    #[test]
    fn structured_summary_parse_is_strict() {
        assert!(StructuredSummary::parse(SUMMARY_JSON).is_ok());
        assert!(StructuredSummary::parse(&format!("\n {SUMMARY_JSON} \n")).is_ok());
        assert!(StructuredSummary::parse(&format!("```json\n{SUMMARY_JSON}\n```")).is_err());
        assert!(StructuredSummary::parse(r#"{"summary": "x", "risks": []}"#).is_err());
        assert!(
            StructuredSummary::parse(
                r#"{"summary": "x", "risks": [], "keywords": [], "extra": 1}"#
            )
            .is_err()
        );
    }

    #[test]
    fn display_text_respects_cap_and_full_text_flag() {
        let raw = "a".repeat(60);
        let capped = DisplayText::new(&raw, 50, false);
        assert!(capped.truncated);
        assert_eq!(capped.full_length, 60);
        assert_eq!(capped.text, format!("{}... [truncated]", "a".repeat(50)));

        let full = DisplayText::new(&raw, 50, true);
        assert!(!full.truncated);
        assert_eq!(full.text, raw);

        let short = DisplayText::new("abc", 50, false);
        assert!(!short.truncated);
        assert_eq!(short.text, "abc");
    }

    #[tokio::test]
    async fn pasted_text_is_truncated_before_prompting() {
        let client = ScriptedClient::new(|_| Ok(SUMMARY_JSON.to_string()));
        let service = service(client.clone(), settings(2000));
        let text = "b".repeat(100);

        let result = service.summarize_text(&text).await.expect("summary");

        assert!(result.truncated);
        assert_eq!(result.original_length, 100);
        assert_eq!(
            result.processed_length,
            40 + PROCESSING_TRUNCATION_MARKER.chars().count()
        );
        let prompt = &client.prompts()[0];
        assert!(prompt.contains(&format!("{}{}", "b".repeat(40), PROCESSING_TRUNCATION_MARKER)));
        assert!(!prompt.contains(&"b".repeat(41)));
    }
}
