//! Token budget and chunking for long inputs.
//!
//! This module splits text that exceeds a model call's token budget into
//! chunks that end on natural boundaries, and merges per-chunk suggestions
//! back into a single ordered list.
//!
//! # Design
//!
//! - Token counts are estimated at four characters per token
//! - Chunk ends are pulled back to the nearest paragraph break, sentence end,
//!   comma or space within a bounded window
//! - Every chunk after the first repeats a tail of the previous one as
//!   leading context, so issues spanning a cut are still seen whole
//! - Offsets are character (not byte) positions in the source text

use std::collections::HashSet;

use super::result::Suggestion;

/// Estimated characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Default backward search window for a break, in characters.
pub const DEFAULT_BOUNDARY_WINDOW: usize = 100;

/// Estimate the token count of a text.
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    (chars + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}

/// Whether a text exceeds a token limit.
pub fn needs_chunking(text: &str, limit: usize) -> bool {
    estimate_tokens(text) > limit
}

/// A contiguous slice of the source text, sized for one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Chunk text, leading overlap included
    pub text: String,
    pub index: usize,
    /// Where `text` begins in the source (start of the overlap)
    pub start_offset: usize,
    /// Exclusive end of this chunk in the source
    pub end_offset: usize,
    pub is_first: bool,
    pub is_last: bool,
    /// Leading characters repeated from the previous chunk
    pub overlap_chars: usize,
}

impl Chunk {
    /// Start of the span this chunk owns (overlap excluded).
    pub fn span_start(&self) -> usize {
        self.start_offset + self.overlap_chars
    }

    /// Character length of the owned span.
    pub fn span_len(&self) -> usize {
        self.end_offset - self.span_start()
    }

    /// Estimated tokens of the full chunk text.
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.text)
    }
}

/// Summary figures for a set of chunks. Reporting only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkStats {
    pub chunk_count: usize,
    /// Characters of the source covered (overlap not double-counted)
    pub total_chars: usize,
    pub estimated_tokens: usize,
    pub average_chunk_chars: usize,
    /// Characters sent twice because of overlap
    pub overlap_chars: usize,
}

/// Splits text into token-bounded chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    boundary_window: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            boundary_window: DEFAULT_BOUNDARY_WINDOW,
        }
    }
}

impl TextChunker {
    /// Create a chunker with a custom break search window.
    pub fn new(boundary_window: usize) -> Self {
        Self { boundary_window }
    }

    /// Split `text` into chunks of at most `limit` tokens plus `overlap`
    /// tokens of leading context.
    ///
    /// Text within the limit comes back as one chunk spanning all of it.
    pub fn chunk(&self, text: &str, limit: usize, overlap: usize) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();

        if !needs_chunking(text, limit) {
            return vec![Chunk {
                text: text.to_string(),
                index: 0,
                start_offset: 0,
                end_offset: total,
                is_first: true,
                is_last: true,
                overlap_chars: 0,
            }];
        }

        let max_chars = limit.saturating_mul(CHARS_PER_TOKEN).max(1);
        let overlap_chars = overlap.saturating_mul(CHARS_PER_TOKEN);

        let mut chunks = Vec::new();
        let mut position = 0;
        let mut previous_span_start = 0;

        while position < total {
            let ideal_end = position.saturating_add(max_chars).min(total);
            let end = if ideal_end < total {
                let window_start = ideal_end.saturating_sub(self.boundary_window).max(position);
                find_break(&chars, window_start, ideal_end).unwrap_or(ideal_end)
            } else {
                ideal_end
            };

            // Overlap never reaches past the previous chunk's own span
            let start = if position == 0 {
                0
            } else {
                position.saturating_sub(overlap_chars).max(previous_span_start)
            };

            chunks.push(Chunk {
                text: chars[start..end].iter().collect(),
                index: chunks.len(),
                start_offset: start,
                end_offset: end,
                is_first: position == 0,
                is_last: end == total,
                overlap_chars: position - start,
            });

            previous_span_start = position;
            position = end;
        }

        chunks
    }

    /// Summarize a set of chunks.
    pub fn chunk_stats(chunks: &[Chunk]) -> ChunkStats {
        if chunks.is_empty() {
            return ChunkStats::default();
        }

        let total_chars: usize = chunks.iter().map(|c| c.span_len()).sum();
        let overlap_chars: usize = chunks.iter().map(|c| c.overlap_chars).sum();
        let estimated_tokens = chunks.iter().map(|c| c.estimated_tokens()).sum();

        ChunkStats {
            chunk_count: chunks.len(),
            total_chars,
            estimated_tokens,
            average_chunk_chars: (total_chars + overlap_chars) / chunks.len(),
            overlap_chars,
        }
    }
}

/// Find the best break in `chars[lo..hi]`, searching backward from `hi`.
///
/// Returns the exclusive end of the chunk. Breaks in priority order:
/// paragraph (double newline), sentence end followed by whitespace, comma,
/// space. The returned end is always greater than `lo`.
fn find_break(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    if lo >= hi {
        return None;
    }

    let paragraph = (lo + 1..hi)
        .rev()
        .find(|&i| chars[i] == '\n' && chars[i - 1] == '\n');
    if let Some(i) = paragraph {
        return Some(i + 1);
    }

    let sentence = (lo + 1..hi)
        .rev()
        .find(|&i| chars[i].is_whitespace() && matches!(chars[i - 1], '.' | '!' | '?'));
    if let Some(i) = sentence {
        return Some(i + 1);
    }

    if let Some(i) = (lo..hi).rev().find(|&i| chars[i] == ',') {
        return Some(i + 1);
    }

    (lo..hi).rev().find(|&i| chars[i] == ' ').map(|i| i + 1)
}

/// Merge per-chunk suggestion lists into one ordered list.
///
/// Inputs must already carry absolute offsets. Suggestions repeated by
/// overlapping chunks (same offset, length and category) collapse to the
/// first one seen; the output is sorted ascending by offset.
pub fn merge_chunk_results(lists: Vec<Vec<Suggestion>>) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Suggestion> = lists
        .into_iter()
        .flatten()
        .filter(|s| seen.insert(s.dedup_key()))
        .collect();

    merged.sort_by_key(|s| s.offset);
    merged
}
