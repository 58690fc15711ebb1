//! Recursive character text splitter.
//!
//! Splits loaded [`Segment`]s into overlapping [`Chunk`]s of at most
//! `chunk_size` characters, trying coarse separators first and falling back
//! to finer ones only for pieces that are still too large.
//!
//! # Algorithm
//!
//! 1. Pick the first separator in `["\n\n", "\n", " ", ""]` that occurs in
//!    the text (`""` always matches and splits into characters).
//! 2. Split on it. Pieces shorter than `chunk_size` are queued for merging;
//!    longer pieces are split recursively with the remaining separators.
//! 3. Queued pieces are merged back with the separator into windows of at
//!    most `chunk_size` characters. When a window is emitted, pieces are
//!    dropped from its front until at most `chunk_overlap` characters remain,
//!    so consecutive windows share that tail.
//! 4. Windows are trimmed and empty ones discarded.
//!
//! Lengths are counted in Unicode scalar values, never bytes, so multibyte
//! text is never cut inside a character.
//!
//! # Example
//!
//! ```rust
//! use kira_core::chunk::{split_text, ChunkParams};
//!
//! let params = ChunkParams::new(20, 5).unwrap();
//! let pieces = split_text("Hola Monito.\n\nSoy Kira, tu copiloto.", &params);
//! assert_eq!(pieces, vec!["Hola Monito.", "Soy Kira, tu", "tu copiloto."]);
//! ```

use std::collections::VecDeque;

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

use crate::models::{Chunk, Segment};

/// Separators tried in order, coarsest first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;

/// Window size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkParams {
    /// Validates `chunk_size > 0` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split every segment and number the resulting chunks contiguously.
///
/// Chunk order follows segment order, then position within the segment, so
/// `chunk_index` reflects where the text sits in the source document.
pub fn split_segments(segments: &[Segment], params: &ChunkParams) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for segment in segments {
        for text in split_text(&segment.text, params) {
            chunks.push(make_chunk(chunks.len(), text, segment));
        }
    }
    chunks
}

/// Split a single text into overlapping windows.
pub fn split_text(text: &str, params: &ChunkParams) -> Vec<String> {
    split_recursive(text, &SEPARATORS, params)
}

fn split_recursive(text: &str, separators: &[&str], params: &ChunkParams) -> Vec<String> {
    let (separator, rest) = pick_separator(text, separators);

    let pieces: Vec<&str> = if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|p| !p.is_empty()).collect()
    };

    let mut out = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for piece in pieces {
        if char_len(piece) < params.chunk_size {
            pending.push(piece);
            continue;
        }
        if !pending.is_empty() {
            out.extend(merge_pieces(&pending, separator, params));
            pending.clear();
        }
        if rest.is_empty() {
            out.push(piece.to_string());
        } else {
            out.extend(split_recursive(piece, rest, params));
        }
    }

    if !pending.is_empty() {
        out.extend(merge_pieces(&pending, separator, params));
    }
    out
}

/// Returns the first separator present in `text` and the finer ones after it.
fn pick_separator<'a, 's>(text: &str, separators: &'a [&'s str]) -> (&'s str, &'a [&'s str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (*sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn merge_pieces(pieces: &[&str], separator: &str, params: &ChunkParams) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut windows = Vec::new();
    let mut current: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        let joiner = if current.is_empty() { 0 } else { sep_len };

        if total + len + joiner > params.chunk_size && !current.is_empty() {
            push_window(&mut windows, &current, separator);

            loop {
                let joiner = if current.is_empty() { 0 } else { sep_len };
                let too_long = total > params.chunk_overlap
                    || (total > 0 && total + len + joiner > params.chunk_size);
                if !too_long {
                    break;
                }
                let Some((_, front_len)) = current.pop_front() else {
                    break;
                };
                let front_joiner = if current.is_empty() { 0 } else { sep_len };
                total = total.saturating_sub(front_len + front_joiner);
            }
        }

        let joiner = if current.is_empty() { 0 } else { sep_len };
        current.push_back((piece, len));
        total += len + joiner;
    }

    push_window(&mut windows, &current, separator);
    windows
}

fn push_window(windows: &mut Vec<String>, current: &VecDeque<(&str, usize)>, separator: &str) {
    let joined = current
        .iter()
        .map(|(piece, _)| *piece)
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        windows.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn make_chunk(index: usize, text: String, segment: &Segment) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        chunk_index: index,
        text,
        metadata: segment.metadata.clone(),
        hash,
    }
}
