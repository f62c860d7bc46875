//! Chunking utilities for splitting extracted PDF text into overlapping
//! word windows.
//!
//! Chunks are measured in words rather than characters or model tokens.
//! Splitting on whitespace is fast and agnostic to whichever embedding or
//! ranking model runs downstream. Each chunk records the range of pages it
//! was drawn from so answers can cite their sources.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default chunk size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Default overlap between adjacent chunks in words.
pub const DEFAULT_CHUNK_OVERLAP: usize = 32;

/// Word-window chunking parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Maximum chunk size in words.
    pub chunk_size: usize,
    /// Words shared between adjacent chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    /// Check that the window can make forward progress.
    ///
    /// The overlap must be strictly smaller than the chunk size, otherwise
    /// the accumulator never drains.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Source location metadata attached to every chunk.
///
/// `page_range` is 0-indexed; the end bound is exclusive of the next page
/// boundary actually consumed, so a chunk drawn entirely from the first
/// page carries `(0, 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMetadata {
    pub path: String,
    pub page_range: (usize, usize),
}

impl TextMetadata {
    /// Human-readable page label: `(p 3)` for a single page, `(pp 3-7)`
    /// for a span.
    pub fn page_label(&self) -> String {
        let (start, end) = self.page_range;
        if start == end {
            format!("(p {start})")
        } else {
            format!("(pp {start}-{end})")
        }
    }
}

/// A bounded window of a document's words, tagged with its page range.
///
/// Produced by [`chunk_pages`]. Immutable once created; the vector store
/// treats the text as an opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    pub metadata: TextMetadata,
}

/// Normalize one page of raw extracted text before word splitting.
///
/// Collapses line breaks and tabs to spaces and re-joins words that the
/// PDF layout hyphen-broke across lines (`"exam- ple"` becomes
/// `"exam-ple"`), then strips stray hyphens and spaces at the edges.
pub fn normalize_page_text(text: &str) -> String {
    text.replace("\n\r", " ")
        .replace('\n', " ")
        .replace('\t', " ")
        .replace("- ", "-")
        .trim_matches('-')
        .trim_matches(' ')
        .to_string()
}

/// Split a document's pages into overlapping word-window chunks.
///
/// Pages are consumed lazily, one at a time: the accumulator is topped up
/// until it holds at least `chunk_size` words (or pages run out), then a
/// window of up to `chunk_size` words is emitted and the accumulator
/// advances by `chunk_size - chunk_overlap` words. The final window takes
/// whatever remains, without padding.
///
/// Every chunk is tagged `(start_page, current_page)` where `current_page`
/// counts pages consumed so far, which makes the ranges of consecutive
/// chunks contiguous even though their words overlap.
///
/// The caller is expected to have validated `config`; an oversized overlap
/// is clamped rather than looping forever.
///
/// # Examples
///
/// ```
/// use ragbert::chunking::{chunk_pages, ChunkingConfig};
///
/// let config = ChunkingConfig { chunk_size: 4, chunk_overlap: 1 };
/// let pages = vec!["one two three".to_string(), "four five six".to_string()];
/// let chunks = chunk_pages("doc.pdf", pages, &config);
///
/// assert_eq!(chunks[0].text, "one two three four");
/// assert_eq!(chunks[0].metadata.page_range, (0, 2));
/// ```
pub fn chunk_pages<I>(path: &str, pages: I, config: &ChunkingConfig) -> Vec<TextChunk>
where
    I: IntoIterator<Item = String>,
{
    let step = config
        .chunk_size
        .saturating_sub(config.chunk_overlap)
        .max(1);

    let mut pages = pages.into_iter();
    let mut words: Vec<String> = Vec::new();
    let mut chunks = Vec::new();
    let mut start_page = 0usize;
    let mut current_page = 0usize;
    let mut exhausted = false;

    loop {
        while words.len() < config.chunk_size && !exhausted {
            match pages.next() {
                Some(raw) => {
                    words.extend(
                        normalize_page_text(&raw)
                            .split_whitespace()
                            .map(str::to_string),
                    );
                    current_page += 1;
                }
                None => exhausted = true,
            }
        }

        if words.is_empty() {
            break;
        }

        let take = words.len().min(config.chunk_size);
        chunks.push(TextChunk {
            text: words[..take].join(" "),
            metadata: TextMetadata {
                path: path.to_string(),
                page_range: (start_page, current_page),
            },
        });
        start_page = current_page;

        // The last window swallows everything left, overlap tail included.
        if exhausted && words.len() <= config.chunk_size {
            break;
        }
        words.drain(..step);
    }

    chunks
}
