//! Windowed streaming chunker.

use crate::chunk::{Chunk, ChunkConfig};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How far back from the target split position the boundary scan looks.
const BOUNDARY_SCAN_WINDOW: usize = 100;

/// Streaming chunker over any byte reader.
///
/// Yields `Result<Chunk>`; an I/O error ends the stream. For fixed
/// parameters and input bytes the emitted chunk sequence is deterministic.
pub struct Chunker<R> {
    reader: R,
    config: ChunkConfig,
    /// Display label for error context; the source path when known.
    source: PathBuf,
    /// Logical offset of the next chunk's first byte.
    offset: u64,
    /// Tail of the previous chunk, replayed at the front of the next one.
    overlap: Vec<u8>,
    /// Lookahead byte carried between windows so EOF is known at emit time.
    carry: Vec<u8>,
    done: bool,
}

impl Chunker<BufReader<File>> {
    /// Open `path` for chunking.
    pub fn from_path(path: impl AsRef<Path>, config: ChunkConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::input(path, e))?;
        Ok(Self::with_source(BufReader::new(file), config, path))
    }
}

impl<R: Read> Chunker<R> {
    /// Chunk an arbitrary reader.
    pub fn new(reader: R, config: ChunkConfig) -> Self {
        Self::with_source(reader, config, "<stream>")
    }

    fn with_source(reader: R, config: ChunkConfig, source: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            config,
            source: source.into(),
            offset: 0,
            overlap: Vec::new(),
            carry: Vec::new(),
            done: false,
        }
    }

    /// Read the next window of `chunk_size` bytes, plus one lookahead byte
    /// so the final window is recognized while it is being emitted. Returns
    /// the window and whether the stream ends with it.
    fn fill_window(&mut self) -> std::io::Result<(Vec<u8>, bool)> {
        let target = self.config.chunk_size + 1;
        let mut window = std::mem::take(&mut self.carry);
        let mut buf = [0u8; 8192];

        while window.len() < target {
            let want = (target - window.len()).min(buf.len());
            let n = self.reader.read(&mut buf[..want])?;
            if n == 0 {
                return Ok((window, true));
            }
            window.extend_from_slice(&buf[..n]);
        }

        self.carry = window.split_off(self.config.chunk_size);
        Ok((window, false))
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let (window, eof) = match self.fill_window() {
            Ok(v) => v,
            Err(e) => {
                self.done = true;
                return Some(Err(Error::input(self.source.clone(), e)));
            }
        };
        if eof {
            self.done = true;
        }
        if window.is_empty() {
            return None;
        }

        // Replay the previous chunk's tail in front of the new bytes.
        let mut data = std::mem::take(&mut self.overlap);
        data.extend_from_slice(&window);

        // Repair UTF-8 at the window edge by keeping the longest valid
        // prefix. A window of pure non-text bytes degrades to a lossy
        // decode so indexing still makes progress.
        let raw_len = data.len();
        let (text, split_cap) = match std::str::from_utf8(&data) {
            Ok(s) => (s, raw_len),
            Err(e) if e.valid_up_to() > 0 => {
                let valid = e.valid_up_to();
                // Unwrap is fine: valid_up_to marks a valid prefix.
                (std::str::from_utf8(&data[..valid]).unwrap(), valid)
            }
            Err(_) => {
                let mut content = String::from_utf8_lossy(&data).into_owned();
                if content.len() > self.config.max_chunk_size {
                    let mut cut = self.config.max_chunk_size;
                    while !content.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    content.truncate(cut);
                }
                let chunk = Chunk {
                    offset: self.offset,
                    content,
                    complete: eof,
                    metadata: HashMap::new(),
                };
                self.offset += raw_len as u64;
                return Some(Ok(chunk));
            }
        };

        let mut split = split_cap;
        if self.config.split_on_boundary && split_cap > self.config.chunk_size / 2 {
            split = find_boundary(
                text.as_bytes(),
                self.config.chunk_size,
                &self.config.boundary_chars,
            );
        }
        split = split.min(self.config.max_chunk_size).min(split_cap);
        while !text.is_char_boundary(split) {
            split -= 1;
        }

        let chunk = Chunk {
            offset: self.offset,
            content: text[..split].to_string(),
            complete: eof,
            metadata: HashMap::new(),
        };
        debug!(
            offset = chunk.offset,
            len = split,
            complete = chunk.complete,
            "emitting chunk"
        );

        if split < split_cap && self.config.overlap_size > 0 {
            let start = split.saturating_sub(self.config.overlap_size);
            self.overlap = data[start..split].to_vec();
        }
        self.offset += split as u64;

        Some(Ok(chunk))
    }
}

/// Find a split position at or before `preferred`, scanning backwards up to
/// [`BOUNDARY_SCAN_WINDOW`] bytes for a boundary character. The split lands
/// one past the boundary byte; with no boundary in range, `preferred` wins.
fn find_boundary(text: &[u8], preferred: usize, boundary_chars: &[u8]) -> usize {
    if text.is_empty() {
        return 0;
    }

    let start = preferred.min(text.len() - 1);
    let lower = preferred.saturating_sub(BOUNDARY_SCAN_WINDOW);
    for i in (lower..=start).rev() {
        if boundary_chars.contains(&text[i]) {
            return i + 1;
        }
    }
    preferred.min(text.len())
}
