//! Re-reading chunk content at query time.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A chunk re-read with surrounding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkContext {
    /// Up to `before` bytes preceding the chunk, decoded lossily.
    pub before: String,
    /// The chunk content itself.
    pub content: String,
    /// Up to `after` bytes following the chunk, decoded lossily.
    pub after: String,
}

/// Read `len` bytes at `offset` from `path` as best-effort UTF-8.
///
/// The result is truncated to the longest valid UTF-8 prefix, mirroring
/// the chunker's own repair, so re-read content lines up with what was
/// fingerprinted. Reading past EOF returns whatever was available.
pub fn read_chunk(path: impl AsRef<Path>, offset: u64, len: usize) -> Result<String> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| Error::input(path, e))?;
    read_window(&mut file, path, offset, len).map(|bytes| {
        let valid = match std::str::from_utf8(&bytes) {
            Ok(s) => return s.to_string(),
            Err(e) => e.valid_up_to(),
        };
        String::from_utf8_lossy(&bytes[..valid]).into_owned()
    })
}

/// Read a chunk plus pre/post context windows of `before` and `after`
/// bytes. Context windows may start or end inside a code point, so they
/// are decoded lossily rather than truncated.
pub fn read_chunk_with_context(
    path: impl AsRef<Path>,
    offset: u64,
    len: usize,
    before: usize,
    after: usize,
) -> Result<ChunkContext> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| Error::input(path, e))?;

    let pre_start = offset.saturating_sub(before as u64);
    let pre_len = (offset - pre_start) as usize;
    let pre = read_window(&mut file, path, pre_start, pre_len)?;

    let content = read_window(&mut file, path, offset, len)?;
    let content = match std::str::from_utf8(&content) {
        Ok(s) => s.to_string(),
        Err(e) => String::from_utf8_lossy(&content[..e.valid_up_to()]).into_owned(),
    };

    let post = read_window(&mut file, path, offset + len as u64, after)?;

    Ok(ChunkContext {
        before: String::from_utf8_lossy(&pre).into_owned(),
        content,
        after: String::from_utf8_lossy(&post).into_owned(),
    })
}

fn read_window(file: &mut File, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| Error::input(path, e))?;
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = file
            .read(&mut buf[filled..])
            .map_err(|e| Error::input(path, e))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}
