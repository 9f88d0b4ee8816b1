//! Text chunking with configurable size and overlap.

use mathtutor_core::config::IngestSettings;
use mathtutor_core::{AppError, AppResult};

/// Splits text into overlapping fixed-size character windows.
///
/// Windows are `[start, start + chunk_size)` in characters, advancing by
/// `chunk_size - overlap`, and the last one may be shorter. Positions count
/// `char`s, not bytes, so multi-byte text never splits inside a code point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Requires `0 <= overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_settings(settings: &IngestSettings) -> AppResult<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Chunk text into overlapping windows.
    ///
    /// Text no longer than `chunk_size` (including empty text) yields exactly
    /// one window equal to the input.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        // Byte offset of every char, plus the end of the text
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = bounds.len() - 1;

        let mut chunks = Vec::with_capacity(char_count / self.step() + 1);
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_count);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            if end == char_count {
                break;
            }
            start += self.step();
        }

        tracing::trace!(
            "Chunked {} chars into {} chunks (size: {}, overlap: {})",
            char_count,
            chunks.len(),
            self.chunk_size,
            self.overlap
        );

        chunks
    }
}

/// Chunk text with explicit parameters.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<String>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collapse the duplicated overlap regions back into one string.
    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let skip = if i == 0 { 0 } else { overlap };
            out.extend(chunk.chars().skip(skip));
        }
        out
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_text("Question: What is 2+2?\nAnswer: 4", 1000, 200).unwrap();
        assert_eq!(chunks, vec!["Question: What is 2+2?\nAnswer: 4"]);
    }

    #[test]
    fn test_exact_size_is_single_chunk() {
        let text = "a".repeat(100);
        assert_eq!(chunk_text(&text, 100, 20).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_text_is_single_empty_chunk() {
        assert_eq!(chunk_text("", 10, 2).unwrap(), vec![String::new()]);
    }

    #[test]
    fn test_windows_and_overlap() {
        let chunks = chunk_text("abcdefghij", 4, 1).unwrap();
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);

        let chunks = chunk_text("abcdefghijk", 4, 1).unwrap();
        assert_eq!(chunks, vec!["abcd", "defg", "ghij", "jk"]);
    }

    #[test]
    fn test_zero_overlap() {
        let chunks = chunk_text("abcdefg", 3, 0).unwrap();
        assert_eq!(chunks, vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_reconstructs_input() {
        let text = "The derivative of x^2 is 2x. ∫ 2x dx = x² + C. ".repeat(40);
        for (size, overlap) in [(1000, 200), (50, 10), (7, 6), (3, 0), (1, 0)] {
            let chunks = chunk_text(&text, size, overlap).unwrap();
            assert_eq!(reconstruct(&chunks, overlap), text, "size={size} overlap={overlap}");
            assert!(chunks.iter().all(|c| c.chars().count() <= size));
        }
    }

    #[test]
    fn test_multibyte_chars_are_not_split() {
        let text = "αβγδεζηθ";
        let chunks = chunk_text(text, 3, 1).unwrap();
        assert_eq!(chunks, vec!["αβγ", "γδε", "εζη", "ηθ"]);
    }

    #[test]
    fn test_invalid_overlap_is_config_error() {
        assert!(matches!(chunk_text("abc", 4, 4), Err(AppError::Config(_))));
        assert!(matches!(chunk_text("abc", 4, 9), Err(AppError::Config(_))));
        assert!(matches!(Chunker::new(0, 0), Err(AppError::Config(_))));
    }

    #[test]
    fn test_from_settings() {
        let chunker = Chunker::from_settings(&IngestSettings::default()).unwrap();
        assert_eq!(chunker.chunk_size(), 1000);
        assert_eq!(chunker.overlap(), 200);
    }
}
