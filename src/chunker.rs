//! Splits extracted page text into overlapping passages.
//!
//! Passages are bounded in length and carry the page they came from.
//! Splits prefer paragraph breaks, then line breaks, then sentence ends,
//! then word boundaries, falling back to a hard cut.

use crate::config::RetrievalConfig;
use crate::document::Document;
use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};

/// A bounded chunk of document text tagged with its source page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text.
    pub content: String,
    /// Page label: `physical_index + 1 - page_offset`. Signed, since the
    /// offset can push front-matter passages to 0 or below.
    pub page: i64,
    /// Position in the corpus sequence. Identity for ranking and fusion
    /// tie-breaks; duplicate content across pages is legal.
    pub ordinal: usize,
}

/// Boundary preference order: paragraph, line, sentence, word.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Chunk a document into passages.
///
/// Each page is chunked independently so the configured overlap only ties
/// together consecutive passages from the same page. A document that yields
/// zero passages is reported as [`RagError::EmptyDocument`].
pub fn chunk_document(document: &Document, config: &RetrievalConfig) -> Result<Vec<Passage>> {
    let mut passages = Vec::new();

    for page in &document.pages {
        let page_label = page.physical_index as i64 + 1 - config.page_offset;
        for text in chunk_text(&page.content, config.chunk_size, config.chunk_overlap) {
            passages.push(Passage {
                content: text,
                page: page_label,
                ordinal: passages.len(),
            });
        }
    }

    if passages.is_empty() {
        return Err(RagError::EmptyDocument);
    }

    Ok(passages)
}

/// Split one page's text into overlapping chunks of at most `chunk_size`
/// characters, preferring to end each chunk at the latest boundary inside
/// the window.
fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let text_len = chars.len();
    let mut chunks = Vec::new();

    if text_len == 0 || chunk_size == 0 {
        return chunks;
    }

    let mut start = 0;

    while start < text_len {
        let window_end = (start + chunk_size).min(text_len);

        // The final window needs no boundary adjustment.
        let end = if window_end == text_len {
            window_end
        } else {
            best_break(&chars, start, window_end)
        };

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= text_len {
            break;
        }

        // Step back by the overlap, always moving forward by at least one.
        let next_start = end.saturating_sub(chunk_overlap);
        start = if next_start <= start { start + 1 } else { next_start };
    }

    chunks
}

/// Latest boundary position in `chars[start..window_end]`, trying each
/// separator in preference order. Falls back to a hard cut at the window end.
fn best_break(chars: &[char], start: usize, window_end: usize) -> usize {
    let window: String = chars[start..window_end].iter().collect();

    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            // Char offset of the match; rfind returns a byte offset.
            let char_pos = window[..pos].chars().count();
            // Keep the sentence terminator with its chunk, drop the trailing
            // space (the chunk gets trimmed anyway).
            let cut = start + char_pos + sep.chars().count();
            if cut > start && cut <= window_end {
                return cut;
            }
        }
    }

    window_end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> RetrievalConfig {
        RetrievalConfig {
            chunk_size,
            chunk_overlap,
            ..RetrievalConfig::default()
        }
    }

    #[test]
    fn test_passages_respect_max_length() {
        let text = "word ".repeat(300);
        let doc = Document::from_pages("doc", vec![text]);
        let passages = chunk_document(&doc, &config(512, 100)).unwrap();

        assert!(passages.len() > 1);
        for p in &passages {
            assert!(p.content.chars().count() <= 512);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let chunks = chunk_text(&text, 60, 10);

        assert_eq!(chunks[0], "a".repeat(40));
    }

    #[test]
    fn test_sentence_boundary_keeps_terminator() {
        let text = "First sentence here. Second sentence follows and runs longer.";
        let chunks = chunk_text(text, 30, 5);

        assert_eq!(chunks[0], "First sentence here.");
    }

    #[test]
    fn test_overlap_between_consecutive_chunks() {
        let text = "abcdefghij".repeat(20); // no boundaries, hard cuts
        let chunks = chunk_text(&text, 50, 10);

        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(10).collect::<Vec<_>>().iter().rev().collect();
            assert!(pair[1].starts_with(&tail));
        }
    }

    #[test]
    fn test_page_labels_use_offset() {
        let doc = Document::from_pages("doc", vec!["front matter".into(), "body".into()]);
        let passages = chunk_document(&doc, &config(512, 100)).unwrap();

        assert_eq!(passages[0].page, 0);
        assert_eq!(passages[1].page, 1);
    }

    #[test]
    fn test_ordinals_are_corpus_positions() {
        let doc = Document::from_pages("doc", vec!["one".into(), "two".into(), "three".into()]);
        let passages = chunk_document(&doc, &config(512, 100)).unwrap();

        let ordinals: Vec<usize> = passages.iter().map(|p| p.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_blank_document_is_empty_document_error() {
        let doc = Document::from_pages("blank", vec!["".into(), "   \n  ".into()]);
        let err = chunk_document(&doc, &config(512, 100)).unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument));
    }

    #[test]
    fn test_chunking_is_idempotent() {
        let text = "Metformin is continued unless eGFR falls. Dose adjustments follow the protocol schedule.\n\nPermanent discontinuation criteria are listed separately.";
        let doc = Document::from_pages("doc", vec![text.into()]);
        let cfg = config(64, 16);

        let first = chunk_document(&doc, &cfg).unwrap();
        let second = chunk_document(&doc, &cfg).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.content, b.content);
            assert_eq!(a.page, b.page);
            assert_eq!(a.ordinal, b.ordinal);
        }
    }
}
