//! Declared-type resolution for uploaded documents.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use super::ExtractionError;

/// Closed set of document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Plain UTF-8 text.
    Txt,
    /// Legacy binary Word document.
    Doc,
    /// Office Open XML Word document.
    Docx,
}

impl DocumentFormat {
    /// Map a file extension (with or without the leading dot) to a format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let normalized = extension.trim().trim_start_matches('.').to_lowercase();
        match normalized.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Map a MIME type (parameters such as `charset` are ignored) to a format.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::Txt),
            "application/msword" => Some(Self::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            _ => None,
        }
    }

    /// Resolve the format from the declared MIME type and extension.
    ///
    /// The extension is authoritative: when both map to known formats and disagree, the
    /// extension wins and the mismatch is logged. The MIME type is used only when the
    /// extension is absent or unknown.
    pub fn resolve(
        declared_mime: Option<&str>,
        declared_extension: Option<&str>,
    ) -> Result<Self, ExtractionError> {
        let by_extension = declared_extension.and_then(Self::from_extension);
        let by_mime = declared_mime.and_then(Self::from_mime);

        match (by_extension, by_mime) {
            (Some(extension), Some(mime)) => {
                if extension != mime {
                    tracing::warn!(
                        extension = %extension,
                        mime = %mime,
                        declared_mime = declared_mime.unwrap_or_default(),
                        "Declared MIME type disagrees with extension; using extension"
                    );
                }
                Ok(extension)
            }
            (Some(format), None) | (None, Some(format)) => Ok(format),
            (None, None) => Err(ExtractionError::UnsupportedFormat(format!(
                "mime={} extension={}",
                declared_mime.unwrap_or("none"),
                declared_extension.unwrap_or("none")
            ))),
        }
    }

    /// Lowercase name used in logs and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
            Self::Doc => "doc",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the lowercase extension (with leading dot) from an uploaded file name.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}
