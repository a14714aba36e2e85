//! Upload admission and scoped staging.
//!
//! [`UploadPolicy`] rejects oversize or disallowed uploads before the extractor runs.
//! [`StagedUpload`] holds the upload on disk for the duration of one request. It owns a
//! [`NamedTempFile`], which deletes the file when dropped, so cleanup happens on every exit
//! path including early returns and errors.

use crate::config::Config;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

const ALLOWED_EXTENSIONS: [&str; 4] = [".pdf", ".doc", ".docx", ".txt"];
const ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Reasons an upload is refused before extraction.
#[derive(Debug, Error)]
pub enum UploadRejected {
    /// The upload exceeds the configured size limit.
    #[error("File size must be less than {limit_mb}MB")]
    TooLarge {
        /// Limit rendered in whole megabytes.
        limit_mb: usize,
    },
    /// Extension or MIME type is not on the allow list.
    #[error("Only PDF, DOC, DOCX, and TXT files are allowed")]
    InvalidType,
    /// The multipart body carried no `document` field.
    #[error("No document uploaded")]
    Missing,
    /// The multipart body could not be read.
    #[error("Malformed upload: {0}")]
    Malformed(String),
}

/// Size and type constraints applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_bytes: usize,
}

impl UploadPolicy {
    /// Build a policy with the given byte limit.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Build the policy described by the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_upload_bytes)
    }

    /// Configured size limit in bytes.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Error returned for uploads over the limit.
    pub fn too_large(&self) -> UploadRejected {
        UploadRejected::TooLarge {
            limit_mb: self.max_bytes.div_ceil(1024 * 1024),
        }
    }

    /// Check the declared type and size of an upload.
    ///
    /// Both the extension and the MIME type must be allowed.
    pub fn check(
        &self,
        extension: Option<&str>,
        mime: Option<&str>,
        size: usize,
    ) -> Result<(), UploadRejected> {
        if size > self.max_bytes {
            return Err(self.too_large());
        }

        let extension_ok = extension
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        let mime_ok = mime
            .map(|value| {
                let essence = value.split(';').next().unwrap_or("").trim().to_lowercase();
                ALLOWED_MIME_TYPES.contains(&essence.as_str())
            })
            .unwrap_or(false);

        if extension_ok && mime_ok {
            Ok(())
        } else {
            tracing::debug!(?extension, ?mime, "Rejected upload type");
            Err(UploadRejected::InvalidType)
        }
    }
}

/// An upload written to a uniquely named file that is removed on drop.
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    /// Write `bytes` into a fresh file under `dir`, keeping the original extension.
    pub fn stage(dir: &Path, bytes: &[u8], extension: Option<&str>) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(extension.unwrap_or(""))
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        tracing::debug!(path = %file.path().display(), bytes = bytes.len(), "Staged upload");
        Ok(Self { file })
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Resolve the upload directory from configuration.
pub fn upload_dir(config: &Config) -> PathBuf {
    PathBuf::from(&config.upload_dir)
}
