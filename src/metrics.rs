use std::sync::atomic::{AtomicU64, Ordering};

use crate::translation::TranslationTier;

/// Thread-safe counters describing pipeline activity since startup.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicU64,
    chunks_summarized: AtomicU64,
    chunk_failures: AtomicU64,
    summarization_failures: AtomicU64,
    phrase_translations: AtomicU64,
    model_translations: AtomicU64,
    word_fallback_translations: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed map phase: total chunks and how many fell back to the placeholder.
    pub fn record_map_phase(&self, chunk_count: u64, failed: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized.fetch_add(chunk_count, Ordering::Relaxed);
        self.chunk_failures.fetch_add(failed, Ordering::Relaxed);
    }

    /// Record a reduce phase whose reply could not be parsed or whose call failed.
    pub fn record_summarization_failure(&self) {
        self.summarization_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record which cascade tier produced a translation.
    pub fn record_translation(&self, tier: TranslationTier) {
        let counter = match tier {
            TranslationTier::Phrase => &self.phrase_translations,
            TranslationTier::Model => &self.model_translations,
            TranslationTier::WordFallback => &self.word_fallback_translations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            chunk_failures: self.chunk_failures.load(Ordering::Relaxed),
            summarization_failures: self.summarization_failures.load(Ordering::Relaxed),
            phrase_translations: self.phrase_translations.load(Ordering::Relaxed),
            model_translations: self.model_translations.load(Ordering::Relaxed),
            word_fallback_translations: self.word_fallback_translations.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Documents that completed the map phase.
    pub documents_processed: u64,
    /// Chunks sent through the map phase.
    pub chunks_summarized: u64,
    /// Chunks whose summary was replaced with the placeholder.
    pub chunk_failures: u64,
    /// Reduce phases that failed.
    pub summarization_failures: u64,
    /// Translations answered by the phrase dictionary.
    pub phrase_translations: u64,
    /// Translations answered by the model.
    pub model_translations: u64,
    /// Translations answered by word-by-word substitution.
    pub word_fallback_translations: u64,
}
