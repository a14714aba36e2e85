//! Prompt builders for the map and reduce phases.

use super::PartialSummary;

/// Separator placed between partial summaries in the merge prompt.
pub(crate) const PARTIAL_DELIMITER: &str = "\n\n---\n\n";

/// Prompt asking for a short summary of one chunk.
pub(crate) fn chunk_summary_prompt(chunk: &str) -> String {
    format!("Give a very short structured summary of this text (max 3 sentences):\n\n{chunk}")
}

/// Prompt merging partial summaries, in document order, into the structured JSON object.
pub(crate) fn merge_prompt(partials: &[PartialSummary]) -> String {
    let joined = partials
        .iter()
        .map(|partial| partial.text.as_str())
        .collect::<Vec<_>>()
        .join(PARTIAL_DELIMITER);

    format!(
        "You are an AI assistant.\n\
         Combine these partial summaries into one final JSON object with the following structure only:\n\n\
         {schema}\n\n\
         {rules}\n\
         Partial summaries:\n{joined}",
        schema = SCHEMA_BLOCK,
        rules = STRICT_RULES,
    )
}

/// Prompt summarizing pasted text directly into the structured JSON object.
pub(crate) fn text_summary_prompt(text: &str) -> String {
    format!(
        "Summarize the following text into one JSON object with the following structure only:\n\n\
         {schema}\n\n\
         {rules}\n\
         Text:\n{text}",
        schema = SCHEMA_BLOCK,
        rules = STRICT_RULES,
    )
}

const SCHEMA_BLOCK: &str = r#"{
  "summary": "string, max 5 sentences",
  "risks": ["list of strings"],
  "keywords": ["list of important keywords"]
}"#;

const STRICT_RULES: &str = "Strict rules:\n\
- Output must be ONLY valid JSON\n\
- Use exactly the fields summary, risks, and keywords\n\
- Do not include explanations, comments, markdown, code fences, or extra text outside the JSON\n\
- Arrays must use double quotes\n\
- Do not prefix with \"Here is\", \"Final JSON output\", or anything else\n";
