//! Translation Resolver: dictionary phrases, then the model, then word-by-word substitution.
//!
//! Each tier runs only when the previous one was inconclusive. The phrase tier covers every
//! dictionary entry, phrases and single words alike, and is trusted as soon as one matches.
//! A model reply is validated before use; an empty reply, an echo of the input, or a reply
//! whose word set is too similar to the input is rejected. Rejections stay internal. The
//! word-by-word tier cannot fail, so [`TranslationService::translate`] always yields text.

mod dictionary;

pub use dictionary::{LanguageTable, PhraseDictionary, translate_word_by_word};

use crate::gateway::{Gateway, GatewayError};
use crate::metrics::PipelineMetrics;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Word-set similarity above which a model reply is treated as an echo.
pub const MAX_ECHO_SIMILARITY: f64 = 0.8;

/// Cascade stage that produced a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TranslationTier {
    /// Built-in phrase dictionary.
    Phrase,
    /// Language model reply that passed validation.
    Model,
    /// Token-by-token dictionary substitution.
    WordFallback,
}

/// Failures of the model tier. These are logged and never leave the resolver.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// The completion call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The model replied, but the reply is not a usable translation.
    #[error("Model translation rejected: {0}")]
    ValidationFailed(String),
}

/// Result of running the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    /// Translated text; the input unchanged when nothing could be translated.
    pub text: String,
    /// Tier that produced `text`.
    pub tier: TranslationTier,
    /// Set when the completion call failed and the last tier replaced nothing.
    ///
    /// Carries the gateway failure so the caller can report a partial result. A rejected
    /// model reply never sets it.
    pub unresolved: Option<String>,
}

/// Three-tier translation resolver.
pub struct TranslationService {
    gateway: Gateway,
    dictionary: PhraseDictionary,
    metrics: Arc<PipelineMetrics>,
}

impl TranslationService {
    /// Build a resolver over the built-in dictionary.
    pub fn new(gateway: Gateway, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            gateway,
            dictionary: PhraseDictionary::builtin(),
            metrics,
        }
    }

    /// Translate `text` into the language named by `target_language`.
    pub async fn translate(&self, text: &str, target_language: &str) -> TranslationOutcome {
        let code = normalize_language_code(target_language);
        let table = self.dictionary.table(&code);
        tracing::info!(
            language = %code,
            chars = text.chars().count(),
            has_dictionary = table.is_some(),
            "Translating text"
        );

        if let Some(table) = table {
            let (translated, matched) = table.replace_phrases(text);
            if matched > 0 {
                tracing::debug!(matched, "Phrase dictionary translation");
                return self.finish(translated, TranslationTier::Phrase, None);
            }
        }

        let model_error = match self.translate_with_model(text, &code).await {
            Ok(translated) => return self.finish(translated, TranslationTier::Model, None),
            Err(error) => {
                tracing::warn!(error = %error, "Model translation unusable; using word fallback");
                error
            }
        };

        let (translated, replaced) = translate_word_by_word(text, table);
        let unresolved = match model_error {
            TranslationError::Gateway(error) if replaced == 0 => Some(error.to_string()),
            _ => None,
        };
        self.finish(translated, TranslationTier::WordFallback, unresolved)
    }

    async fn translate_with_model(
        &self,
        text: &str,
        code: &str,
    ) -> Result<String, TranslationError> {
        let prompt = translation_prompt(text, language_name(code).unwrap_or(code));
        let reply = self.gateway.complete(&prompt).await?;
        validate_model_reply(text, &reply)
    }

    fn finish(
        &self,
        text: String,
        tier: TranslationTier,
        unresolved: Option<String>,
    ) -> TranslationOutcome {
        self.metrics.record_translation(tier);
        TranslationOutcome {
            text,
            tier,
            unresolved,
        }
    }
}

fn translation_prompt(text: &str, language: &str) -> String {
    format!(
        "You are a professional translator. Translate the following text to {language}.\n\
         Maintain the original meaning, tone, and context.\n\
         Provide only the translation, no explanations.\n\
         If you cannot translate certain proper nouns or technical terms, keep them in English.\n\n\
         Text to translate: \"{text}\"\n\n\
         Translation:"
    )
}

/// Reject replies that are empty, echo the input, or share too many words with it.
fn validate_model_reply(input: &str, reply: &str) -> Result<String, TranslationError> {
    let reply = reply.trim();
    if reply.is_empty() {
        return Err(TranslationError::ValidationFailed("empty reply".into()));
    }
    if reply == input.trim() {
        return Err(TranslationError::ValidationFailed("reply echoes the input".into()));
    }
    let similarity = jaccard_similarity(input, reply);
    if similarity > MAX_ECHO_SIMILARITY {
        return Err(TranslationError::ValidationFailed(format!(
            "reply too similar to the input ({similarity:.2})"
        )));
    }
    Ok(reply.to_string())
}

/// Lowercase the code and keep its first two characters.
pub fn normalize_language_code(code: &str) -> String {
    code.trim().to_lowercase().chars().take(2).collect()
}

/// Jaccard similarity of the lowercase word sets of `a` and `b`; 0 when either is empty.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left = word_set(a);
    let right = word_set(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// English name of a language code, used to phrase the model prompt.
pub fn language_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "es" => "Spanish",
        "fr" => "French",
        "hi" => "Hindi",
        "gu" => "Gujarati",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "zh" => "Chinese",
        "ja" => "Japanese",
        "ar" => "Arabic",
        "en" => "English",
        _ => return None,
    };
    Some(name)
}
