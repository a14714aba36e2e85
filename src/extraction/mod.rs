//! Text Extractor: raw upload bytes plus declared type in, plain text out.
//!
//! Dispatch is a closed match over [`DocumentFormat`]. PDF input must carry the `%PDF-` magic
//! header before the parser sees it. Word documents go through `docx-rs`; any failure there is
//! collapsed into [`ExtractionError::ExtractionFailed`]. Every successful extraction is trimmed
//! and guaranteed non-empty.

mod format;

pub use format::{DocumentFormat, extension_of};

use serde::Serialize;
use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Errors produced while turning an upload into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Neither the MIME type nor the extension names a supported format.
    #[error("Unsupported file type ({0}); only PDF, TXT, DOC, and DOCX files are supported")]
    UnsupportedFormat(String),
    /// The bytes do not form a readable document of the declared format.
    #[error("The document appears to be corrupted or has an unsupported structure: {0}")]
    CorruptDocument(String),
    /// Extraction succeeded but produced only whitespace.
    #[error("No text extracted from document")]
    EmptyDocument,
    /// The Word extractor failed.
    #[error("Failed to extract text from Word document")]
    ExtractionFailed,
}

/// Plain text extracted from a single upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    raw_text: String,
    source_format: DocumentFormat,
    length: usize,
}

impl ExtractedDocument {
    /// Wrap already-extracted text; `length` is the character count.
    pub fn new(raw_text: String, source_format: DocumentFormat) -> Self {
        let length = raw_text.chars().count();
        Self {
            raw_text,
            source_format,
            length,
        }
    }

    /// Extracted text.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Format the text was extracted from.
    pub fn source_format(&self) -> DocumentFormat {
        self.source_format
    }

    /// Character count of the extracted text.
    pub fn length(&self) -> usize {
        self.length
    }
}

/// Extract plain text from `bytes` using the declared MIME type and extension.
///
/// CPU-bound; async callers should run it on a blocking thread.
pub fn extract(
    bytes: &[u8],
    declared_mime: Option<&str>,
    declared_extension: Option<&str>,
) -> Result<ExtractedDocument, ExtractionError> {
    let format = DocumentFormat::resolve(declared_mime, declared_extension)?;
    let text = match format {
        DocumentFormat::Pdf => extract_pdf(bytes)?,
        DocumentFormat::Txt => String::from_utf8_lossy(bytes).into_owned(),
        DocumentFormat::Doc | DocumentFormat::Docx => extract_word(bytes)?,
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::EmptyDocument);
    }

    let document = ExtractedDocument::new(trimmed.to_string(), format);
    tracing::debug!(
        format = %format,
        bytes = bytes.len(),
        chars = document.length(),
        "Extracted document text"
    );
    Ok(document)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ExtractionError::CorruptDocument(
            "missing %PDF- header".to_string(),
        ));
    }

    // pdf-extract panics on some malformed inputs instead of returning an error.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(error)) => Err(ExtractionError::CorruptDocument(error.to_string())),
        Err(_) => Err(ExtractionError::CorruptDocument(
            "PDF parser aborted on malformed input".to_string(),
        )),
    }
}

fn extract_word(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|error| {
        tracing::warn!(error = %error, "Word extraction failed");
        ExtractionError::ExtractionFailed
    })?;

    let mut text = String::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for child in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}
