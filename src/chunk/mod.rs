//! Streaming segmentation of byte sources into indexable text chunks.
//!
//! The [`Chunker`] walks a byte stream in windows of roughly `chunk_size`
//! bytes, repairs UTF-8 at window edges, prefers splitting on boundary
//! characters, and replays a configurable overlap so a match that straddles
//! two chunks is still found. [`read_chunk`] is the inverse operation used
//! at query time to show matched content.

mod chunker;
mod processor;
mod reader;
mod worker;

pub use chunker::Chunker;
pub use processor::{build_index, ChunkProcessor, ProcessResult};
pub use reader::{read_chunk, read_chunk_with_context, ChunkContext};
pub use worker::WorkerPool;

use std::collections::HashMap;

/// One chunk of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte position of this chunk's first byte in the source stream.
    pub offset: u64,
    /// Chunk text; always valid UTF-8.
    pub content: String,
    /// True for the final chunk of the stream.
    pub complete: bool,
    /// Free-form annotations attached by producers.
    pub metadata: HashMap<String, String>,
}

/// Chunking parameters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Target chunk length in bytes.
    pub chunk_size: usize,
    /// Bytes replayed from the end of one chunk into the next.
    pub overlap_size: usize,
    /// Prefer splitting just after a boundary character.
    pub split_on_boundary: bool,
    /// Byte values treated as split boundaries.
    pub boundary_chars: Vec<u8>,
    /// Hard cap on a single chunk's length.
    pub max_chunk_size: usize,
    /// Pass newlines through unchanged. The chunker never rewrites bytes,
    /// so this is accepted for interface compatibility and is always
    /// honored.
    pub preserve_newlines: bool,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            overlap_size: 256,
            split_on_boundary: true,
            boundary_chars: b".!?\n".to_vec(),
            max_chunk_size: 6144,
            preserve_newlines: true,
        }
    }
}
