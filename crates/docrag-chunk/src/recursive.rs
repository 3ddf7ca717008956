//! Recursive character text chunker.
//!
//! Splits text by trying progressively smaller separators until every piece
//! fits within the chunk size, then merges neighbouring pieces back up to the
//! size limit while carrying an overlap between consecutive chunks.

use std::collections::VecDeque;

use tracing::warn;

use docrag_core::{ChunkConfig, ChunkData, Chunker, RagError, Result};

/// Default separators: paragraphs, lines, words, characters.
const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Recursive chunker that splits text by multiple separators.
///
/// Separators stay attached to the start of the piece that follows them, so
/// concatenating the pieces reproduces the input. Chunk lengths are counted in
/// characters unless a custom length function is supplied.
pub struct RecursiveChunker {
    separators: Vec<String>,

    /// Function measuring text length. Character count if None.
    length_function: Option<Box<dyn Fn(&str) -> usize + Send + Sync>>,
}

impl RecursiveChunker {
    /// Create a chunker with the default separators and character lengths.
    pub fn new() -> Self {
        Self {
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            length_function: None,
        }
    }

    /// Create a chunker with a custom length function.
    pub fn with_length_function<F>(length: F) -> Self
    where
        F: Fn(&str) -> usize + Send + Sync + 'static,
    {
        Self {
            length_function: Some(Box::new(length)),
            ..Self::new()
        }
    }

    fn length(&self, text: &str) -> usize {
        match &self.length_function {
            Some(length) => length(text),
            None => text.chars().count(),
        }
    }

    /// Recursively split text into pieces no longer than the chunk size where possible.
    fn split_text(&self, text: &str, separators: &[String], config: &ChunkConfig) -> Vec<String> {
        // First separator present in the text; "" always matches
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, s) in separators.iter().enumerate() {
            if s.is_empty() {
                separator = "";
                break;
            }
            if text.contains(s.as_str()) {
                separator = s.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            if self.length(piece) < config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge_splits(&fitting, config));
                fitting.clear();
            }

            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_text(piece, remaining, config));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_splits(&fitting, config));
        }

        chunks
    }

    /// Merge small pieces into chunks, keeping up to `chunk_overlap` of trailing context.
    fn merge_splits(&self, splits: &[&str], config: &ChunkConfig) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = self.length(piece);

            if total + len > config.chunk_size {
                if total > config.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, config.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(doc) = join_pieces(&current) {
                        docs.push(doc);
                    }

                    while total > config.chunk_overlap
                        || (total + len > config.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(front) => total = total.saturating_sub(self.length(front)),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_pieces(&current) {
            docs.push(doc);
        }

        docs
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<ChunkData>> {
        if config.chunk_size == 0 {
            return Err(RagError::chunking("chunk_size must be positive"));
        }
        if config.chunk_overlap > config.chunk_size {
            return Err(RagError::chunking(format!(
                "chunk_overlap ({}) is larger than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let pieces = self.split_text(text, &self.separators, config);

        // Locate each chunk after the previous one's start
        let mut chunks = Vec::with_capacity(pieces.len());
        let mut search_from = 0usize;
        for content in pieces {
            let byte_start = text
                .get(search_from..)
                .and_then(|rest| rest.find(content.as_str()))
                .map(|rel| search_from + rel);

            if let Some(start) = byte_start {
                search_from = start + content.chars().next().map_or(1, char::len_utf8);
            }

            chunks.push(ChunkData {
                length: self.length(&content),
                start_index: byte_start.map(|b| text[..b].chars().count()),
                content,
            });
        }

        Ok(chunks)
    }
}

/// Split on `separator`, attaching each separator to the start of the following piece.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        // Character-level split as last resort
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    pieces.push(&text[start..]);

    pieces.into_iter().filter(|s| !s.is_empty()).collect()
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkConfig {
        ChunkConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn test_simple_chunk() {
        let chunker = RecursiveChunker::new();
        let text = "Hello world. This is a test.";
        let chunks = chunker.chunk(text, &ChunkConfig::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].start_index, Some(0));
        assert_eq!(chunks[0].length, text.len());
    }

    #[test]
    fn test_paragraph_split() {
        let chunker = RecursiveChunker::new();
        let paragraphs = ["a".repeat(300), "b".repeat(300), "c".repeat(300)];
        let text = paragraphs.join("\n\n");

        let chunks = chunker.chunk(&text, &config(500, 50)).unwrap();

        assert_eq!(chunks.len(), 3);
        for (chunk, paragraph) in chunks.iter().zip(&paragraphs) {
            assert_eq!(&chunk.content, paragraph);
        }
        assert_eq!(chunks[1].start_index, Some(302));
        assert_eq!(chunks[2].start_index, Some(604));
    }

    #[test]
    fn test_word_overlap() {
        let chunker = RecursiveChunker::new();
        let text = (0..300)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ");

        let chunks = chunker.chunk(&text, &config(100, 20)).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.length <= 100, "chunk too long: {}", chunk.length);
            let start = chunk.start_index.unwrap();
            assert!(text[start..].starts_with(&chunk.content));
        }
        for pair in chunks.windows(2) {
            let prev_end = pair[0].start_index.unwrap() + pair[0].length;
            assert!(pair[1].start_index.unwrap() < prev_end, "expected overlap");
        }
    }

    #[test]
    fn test_character_fallback() {
        let chunker = RecursiveChunker::new();
        let text = "x".repeat(1200);

        let chunks = chunker.chunk(&text, &config(500, 50)).unwrap();

        let lengths: Vec<usize> = chunks.iter().map(|c| c.length).collect();
        assert_eq!(lengths, vec![500, 500, 300]);
    }

    #[test]
    fn test_multibyte_lengths_in_chars() {
        let chunker = RecursiveChunker::new();
        let text = "αβγδεζηθικ";
        let chunks = chunker.chunk(text, &config(4, 0)).unwrap();

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["αβγδ", "εζηθ", "ικ"]);
        assert_eq!(chunks[1].start_index, Some(4));
    }

    #[test]
    fn test_custom_length_function() {
        let chunker = RecursiveChunker::with_length_function(|s| s.split_whitespace().count());
        let text = "one two three four five six seven eight";
        let chunks = chunker.chunk(text, &config(3, 0)).unwrap();
        assert!(chunks.len() >= 3);
    }

    #[test]
    fn test_empty_content() {
        let chunker = RecursiveChunker::new();

        assert!(chunker.chunk("", &ChunkConfig::default()).unwrap().is_empty());
        assert!(chunker.chunk(" \n\n ", &ChunkConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_overlap_larger_than_size() {
        let chunker = RecursiveChunker::new();
        assert!(matches!(
            chunker.chunk("text", &config(10, 20)),
            Err(RagError::Chunking { .. })
        ));
    }

    #[test]
    fn test_split_keeps_separator() {
        assert_eq!(
            split_keep_separator("a\n\n\n\nb", "\n\n"),
            vec!["a", "\n\n", "\n\nb"]
        );
        assert_eq!(split_keep_separator("\n\nb", "\n\n"), vec!["\n\nb"]);
    }
}
