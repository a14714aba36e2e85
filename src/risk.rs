//! Risk Analyzer: asks the model for a JSON risk list and degrades to line parsing.
//!
//! The analyzer never fails. A reply containing a parseable `[...]` array is returned as
//! parsed; otherwise each non-empty reply line becomes one item with a keyword-inferred
//! severity. A gateway failure yields a single high-severity item describing the failure.

use crate::config::Config;
use crate::gateway::Gateway;
use serde::Serialize;
use serde_json::Value;

const TITLE_MAX_CHARS: usize = 50;

/// Severity attached to a risk item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor or informational.
    #[default]
    Low,
    /// Worth attention.
    Medium,
    /// Serious or critical.
    High,
}

impl Severity {
    /// Infer a severity from free text by keyword.
    pub fn infer(text: &str) -> Self {
        let lower = text.to_lowercase();
        if ["high", "critical", "severe"]
            .iter()
            .any(|keyword| lower.contains(keyword))
        {
            Self::High
        } else if ["medium", "moderate"]
            .iter()
            .any(|keyword| lower.contains(keyword))
        {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One identified risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskItem {
    /// Short title.
    pub title: String,
    /// Longer explanation.
    pub description: String,
    /// Assessed severity.
    pub severity: Severity,
}

impl RiskItem {
    /// Item built from one line of an unstructured reply.
    pub fn from_line(line: &str) -> Self {
        Self {
            title: line.chars().take(TITLE_MAX_CHARS).collect(),
            description: line.to_string(),
            severity: Severity::infer(line),
        }
    }

    /// Item built from one element of a model-produced array.
    ///
    /// Objects contribute whatever fields they carry; anything that is not a string is
    /// rendered as JSON text, and a non-string severity reads as low. Other elements are
    /// treated like a reply line.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self {
                title: text_field(fields.get("title")),
                description: text_field(fields.get("description")),
                severity: match fields.get("severity") {
                    Some(Value::String(severity)) => Severity::infer(severity),
                    _ => Severity::Low,
                },
            },
            Value::String(line) => Self::from_line(&line),
            other => Self::from_line(&other.to_string()),
        }
    }

    /// Synthetic item reported when analysis could not run.
    pub fn analysis_failed(reason: &str) -> Self {
        Self {
            title: "Analysis Error".to_string(),
            description: format!("Failed to analyze risks: {reason}"),
            severity: Severity::High,
        }
    }

    fn none_identified() -> Self {
        Self {
            title: "No Risks Identified".to_string(),
            description: "The analysis did not identify any risks in the provided text."
                .to_string(),
            severity: Severity::Low,
        }
    }
}

/// Produces risk lists for arbitrary text through the gateway.
pub struct RiskAnalyzer {
    gateway: Gateway,
    input_cap: usize,
}

impl RiskAnalyzer {
    /// Build an analyzer that considers at most `input_cap` leading characters.
    pub fn new(gateway: Gateway, input_cap: usize) -> Self {
        Self { gateway, input_cap }
    }

    /// Build an analyzer using the configured input cap.
    pub fn from_config(gateway: Gateway, config: &Config) -> Self {
        Self::new(gateway, config.risk_analysis_input_cap)
    }

    /// Analyze `text` for risks; the result is never empty.
    pub async fn analyze_risks(&self, text: &str) -> Vec<RiskItem> {
        let excerpt: String = text.chars().take(self.input_cap).collect();
        let prompt = build_prompt(&excerpt);

        match self.gateway.complete(&prompt).await {
            Ok(reply) => {
                let risks = parse_reply(&reply);
                tracing::info!(risks = risks.len(), "Risk analysis completed");
                risks
            }
            Err(error) => {
                tracing::error!(error = %error, "Risk analysis failed");
                vec![RiskItem::analysis_failed(&error.to_string())]
            }
        }
    }
}

fn build_prompt(excerpt: &str) -> String {
    format!(
        "Analyze the following text and identify potential risks, compliance issues, and warnings.\n\
         Return your response as a JSON array with each risk having:\n\
         - title: short risk title\n\
         - description: detailed description\n\
         - severity: high/medium/low\n\n\
         Text: {excerpt}"
    )
}

/// Turn a model reply into risk items, preferring an embedded JSON array.
pub(crate) fn parse_reply(reply: &str) -> Vec<RiskItem> {
    if let Some(items) = parse_embedded_array(reply) {
        return if items.is_empty() {
            vec![RiskItem::none_identified()]
        } else {
            items
        };
    }

    let items: Vec<RiskItem> = reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(RiskItem::from_line)
        .collect();

    if items.is_empty() {
        vec![RiskItem::none_identified()]
    } else {
        items
    }
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Parse the span from the first `[` to the last `]` as a risk array.
///
/// Only the array itself must be valid JSON; each element is decoded leniently.
fn parse_embedded_array(reply: &str) -> Option<Vec<RiskItem>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Vec<Value>>(&reply[start..=end]) {
        Ok(items) => Some(items.into_iter().map(RiskItem::from_json).collect()),
        Err(error) => {
            tracing::warn!(error = %error, "Risk reply array did not parse; using line fallback");
            None
        }
    }
}
