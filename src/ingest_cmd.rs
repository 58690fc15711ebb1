//! `kira ingest`: load and chunk a file without embedding it.
//!
//! Useful for checking that a document parses and how many chunks it
//! produces under the current `[chunking]` settings. Needs no API key.

use std::path::Path;

use anyhow::Result;

use kira_core::chunk::split_segments;

use crate::config::Config;
use crate::loader::load_document;

pub fn run_ingest(config: &Config, path: &Path) -> Result<()> {
    let params = config.chunking.params()?;
    let segments = load_document(path)?;
    let chunks = split_segments(&segments, &params);

    println!("ingest {}", path.display());
    println!("  segments: {}", segments.len());
    println!("  chunks: {}", chunks.len());
    println!(
        "  chunk_size: {}, chunk_overlap: {}",
        params.chunk_size(),
        params.chunk_overlap()
    );
    Ok(())
}
