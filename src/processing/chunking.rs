//! Size estimation and positional chunking.
//!
//! Documents whose estimated token count fits under the safe threshold are summarized in one
//! shot, whatever their absolute length. Longer documents are cut into consecutive fixed-size
//! character windows with no overlap, so the chunks concatenate back to the original text.

use crate::config::{DEFAULT_CHUNK_CHARS, DEFAULT_SAFE_TOKEN_THRESHOLD};

use super::types::ChunkingError;

/// Characters per estimated token.
const CHARS_PER_TOKEN: usize = 4;

/// Thresholds controlling when and how text is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingPolicy {
    /// Largest estimated token count summarized in a single call.
    pub safe_token_threshold: usize,
    /// Characters per chunk once splitting is required.
    pub window_chars: usize,
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self {
            safe_token_threshold: DEFAULT_SAFE_TOKEN_THRESHOLD,
            window_chars: DEFAULT_CHUNK_CHARS,
        }
    }
}

impl ChunkingPolicy {
    /// Reject policies that cannot split text.
    pub fn validate(&self) -> Result<(), ChunkingError> {
        if self.window_chars == 0 {
            return Err(ChunkingError::InvalidWindowSize);
        }
        Ok(())
    }
}

/// Contiguous slice of the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Zero-based position.
    pub index: usize,
    /// The slice itself.
    pub text: &'a str,
    /// Length of `text` in characters.
    pub char_len: usize,
}

/// Token estimate used for the one-shot decision: characters divided by four, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Split `text` according to `policy`.
///
/// Returns exactly one chunk when the estimate is within the threshold, otherwise
/// `ceil(chars / window_chars)` chunks. Windows never split a character.
pub fn chunk_text<'a>(
    text: &'a str,
    policy: &ChunkingPolicy,
) -> Result<Vec<Chunk<'a>>, ChunkingError> {
    policy.validate()?;

    if estimate_tokens(text) <= policy.safe_token_threshold {
        return Ok(vec![Chunk {
            index: 0,
            text,
            char_len: text.chars().count(),
        }]);
    }

    let window = policy.window_chars;
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in text.char_indices() {
        if count == window {
            chunks.push(Chunk {
                index: chunks.len(),
                text: &text[start..offset],
                char_len: count,
            });
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if count > 0 {
        chunks.push(Chunk {
            index: chunks.len(),
            text: &text[start..],
            char_len: count,
        });
    }

    Ok(chunks)
}
