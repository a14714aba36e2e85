//! Simplification and question answering: single prompts over the gateway.

use crate::gateway::{Gateway, GatewayError};
use serde::Serialize;

/// Reading level used when the caller does not name one.
pub const DEFAULT_SIMPLIFY_LEVEL: &str = "standard";

/// Simplified rewrite together with its size statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Simplification {
    /// Rewritten text.
    pub simplified: String,
    /// Input length in characters.
    pub original_length: usize,
    /// Output length in characters.
    pub simplified_length: usize,
    /// Percentage by which the text shrank; negative when it grew.
    pub reduction: i64,
}

impl Simplification {
    fn new(original: &str, simplified: String) -> Self {
        let original_length = original.chars().count();
        let simplified_length = simplified.chars().count();
        Self {
            reduction: reduction_percent(original_length, simplified_length),
            simplified,
            original_length,
            simplified_length,
        }
    }
}

/// `round((1 - simplified / original) * 100)`, or 0 for empty input.
pub fn reduction_percent(original_length: usize, simplified_length: usize) -> i64 {
    if original_length == 0 {
        return 0;
    }
    let ratio = simplified_length as f64 / original_length as f64;
    ((1.0 - ratio) * 100.0).round() as i64
}

/// Thin prompt wrappers for the simplify and ask routes.
pub struct AssistService {
    gateway: Gateway,
}

impl AssistService {
    /// Build the service over a gateway.
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Rewrite `text` at the requested reading level, `standard` when none is given.
    pub async fn simplify(
        &self,
        text: &str,
        level: Option<&str>,
    ) -> Result<Simplification, GatewayError> {
        let level = level
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .unwrap_or(DEFAULT_SIMPLIFY_LEVEL);
        let prompt = format!("Simplify the following text to a {level} reading level:\n\n{text}");
        let simplified = self.gateway.complete(&prompt).await?;
        let result = Simplification::new(text, simplified);
        tracing::info!(level, reduction = result.reduction, "Simplified text");
        Ok(result)
    }

    /// Answer `question` using `context` as the only source.
    pub async fn answer_question(
        &self,
        question: &str,
        context: &str,
    ) -> Result<String, GatewayError> {
        let prompt = format!(
            "Context:\n{context}\n\nQuestion: {question}\n\nProvide a clear, concise answer."
        );
        let answer = self.gateway.complete(&prompt).await?;
        tracing::debug!(chars = answer.chars().count(), "Answered question");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{ScriptedClient, gateway};

    #[test]
    fn reduction_rounds_and_can_be_negative() {
        assert_eq!(reduction_percent(200, 50), 75);
        assert_eq!(reduction_percent(3, 2), 33);
        assert_eq!(reduction_percent(10, 15), -50);
        assert_eq!(reduction_percent(0, 10), 0);
    }

    #[tokio::test]
    async fn simplify_defaults_to_standard_level() {
        let client = ScriptedClient::new(|_| Ok("Short.".into()));
        let service = AssistService::new(gateway(client.clone()));

        let result = service
            .simplify("A considerably longer sentence.", None)
            .await
            .expect("simplified");

        assert_eq!(result.simplified, "Short.");
        assert_eq!(result.original_length, 31);
        assert_eq!(result.simplified_length, 6);
        assert_eq!(result.reduction, 81);
        assert!(client.prompts()[0].starts_with("Simplify the following text to a standard reading level"));
    }

    #[tokio::test]
    async fn simplify_uses_requested_level() {
        let client = ScriptedClient::new(|_| Ok("ok".into()));
        let service = AssistService::new(gateway(client.clone()));
        service
            .simplify("text", Some("elementary"))
            .await
            .expect("simplified");
        assert!(client.prompts()[0].contains("to a elementary reading level"));
    }

    #[tokio::test]
    async fn answer_includes_context_and_question() {
        let client = ScriptedClient::new(|_| Ok("Thirty days.".into()));
        let service = AssistService::new(gateway(client.clone()));

        let answer = service
            .answer_question("How long is the notice period?", "Notice is thirty days.")
            .await
            .expect("answer");

        assert_eq!(answer, "Thirty days.");
        let prompt = &client.prompts()[0];
        assert!(prompt.starts_with("Context:\nNotice is thirty days."));
        assert!(prompt.contains("Question: How long is the notice period?"));
    }

    #[tokio::test]
    async fn gateway_failures_propagate() {
        let service = AssistService::new(gateway(ScriptedClient::failing()));
        assert!(service.answer_question("q", "c").await.is_err());
        assert!(service.simplify("t", None).await.is_err());
    }
}
