//! Sentence-aware character chunking for the summarization map phase.
//!
//! Text is walked in windows of `max_chunk_size` characters. Inside the trailing
//! [`BOUNDARY_SEARCH_CHARS`] characters of a full window the chunker looks backward for the
//! last `.` and cuts right after it; the next window starts at the following character.
//! Without a period in that region the window is cut at its raw boundary, which may split a
//! sentence. Chunks are contiguous slices, so joining them reproduces the input exactly.

use serde::Serialize;
use thiserror::Error;

/// Size of the trailing region searched for a sentence boundary.
pub const BOUNDARY_SEARCH_CHARS: usize = 500;

/// Errors produced while chunking text.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// A zero-sized window can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Contiguous slice of a document processed independently in the map phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Position of the chunk in document order.
    pub index: usize,
    /// Chunk contents.
    pub text: String,
    /// Whether the cut was moved back to a sentence boundary.
    pub boundary_adjusted: bool,
}

/// Split `text` into ordered chunks of at most `max_chunk_size` characters.
///
/// Text no longer than `max_chunk_size` yields a single chunk; empty text yields none.
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Result<Vec<Chunk>, ChunkingError> {
    if max_chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let rest = &text[start..];
        let Some(window_end) = byte_offset_of_char(rest, max_chunk_size) else {
            chunks.push(Chunk {
                index: chunks.len(),
                text: rest.to_string(),
                boundary_adjusted: false,
            });
            break;
        };

        let window = &rest[..window_end];
        let search_from =
            byte_offset_of_char(window, max_chunk_size.saturating_sub(BOUNDARY_SEARCH_CHARS))
                .unwrap_or(0);

        let (cut, boundary_adjusted) = match window[search_from..].rfind('.') {
            Some(position) => (search_from + position + 1, true),
            None => (window_end, false),
        };

        chunks.push(Chunk {
            index: chunks.len(),
            text: rest[..cut].to_string(),
            boundary_adjusted,
        });
        start += cut;
    }

    tracing::debug!(
        chunks = chunks.len(),
        max_chunk_size,
        adjusted = chunks.iter().filter(|chunk| chunk.boundary_adjusted).count(),
        "Chunked document"
    );
    Ok(chunks)
}

/// Byte offset at which the `n`th character starts, or `None` when `text` has at most `n` characters.
fn byte_offset_of_char(text: &str, n: usize) -> Option<usize> {
    text.char_indices().nth(n).map(|(offset, _)| offset)
}
