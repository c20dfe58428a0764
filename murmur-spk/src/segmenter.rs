//! Sentence segmentation and word counting

use crate::error::SpeechError;
use unicode_segmentation::UnicodeSegmentation;

/// Splits text into an ordered sequence of sentences
///
/// Implementations must be deterministic and must not lose text: joining the
/// returned sentences covers every non-whitespace character of the input, in
/// order.
pub trait Segmenter: Send + Sync {
    fn split(&self, text: &str) -> Result<Vec<String>, SpeechError>;
}

/// Default input limit (10 MiB)
pub const DEFAULT_MAX_TEXT_BYTES: usize = 10 * 1024 * 1024;

/// Unicode (UAX #29) sentence segmenter
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    max_text_bytes: usize,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self::with_max_bytes(DEFAULT_MAX_TEXT_BYTES)
    }

    /// Reject input larger than `max_text_bytes`
    pub fn with_max_bytes(max_text_bytes: usize) -> Self {
        Self { max_text_bytes }
    }
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for SentenceSegmenter {
    fn split(&self, text: &str) -> Result<Vec<String>, SpeechError> {
        if text.len() > self.max_text_bytes {
            return Err(SpeechError::Segmentation(format!(
                "Text too long ({} bytes, max {} bytes)",
                text.len(),
                self.max_text_bytes
            )));
        }

        if text.contains('\0') {
            return Err(SpeechError::Segmentation("Text contains null bytes".to_string()));
        }

        // split_sentence_bounds covers the whole input, so nothing is dropped
        // beyond the whitespace between sentences
        Ok(text
            .split_sentence_bounds()
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Number of Unicode words in `text`
pub fn count_words(text: &str) -> usize {
    text.unicode_words().count()
}
