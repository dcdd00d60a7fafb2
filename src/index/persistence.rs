//! On-disk format for shards and index metadata.
//!
//! # File layout
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ Magic bytes (4B): "SDXS" / "SDXM"   │
//! ├─────────────────────────────────────┤
//! │ Format version (4B, little-endian)  │
//! ├─────────────────────────────────────┤
//! │ postcard payload                    │
//! │   shard: positions + lsh_buckets    │
//! │   meta:  everything but payloads    │
//! └─────────────────────────────────────┘
//! ```
//!
//! Shard files live at `<index_dir>/<prefix>.<shard_id>` with decimal ids.
//! The metadata file is user-named and records everything needed to reopen
//! the index except the shard payloads themselves. One format version
//! covers the index's whole lifetime; a version bump invalidates old files
//! rather than attempting migration.

use crate::error::{Error, Result};
use crate::index::shard::IndexShard;
use crate::simhash::{Hyperplanes, PermutationTable};
use memmap2::Mmap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Magic bytes for shard files.
pub const SHARD_MAGIC: [u8; 4] = *b"SDXS";

/// Magic bytes for index metadata files.
pub const META_MAGIC: [u8; 4] = *b"SDXM";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

/// Index metadata record; the inverse of [`read_meta`] reconstructs an
/// index shell whose shards are loaded on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct IndexMeta {
    pub source_file: String,
    pub chunk_size: u64,
    pub shard_count: u64,
    pub hyperplanes: Hyperplanes,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
    pub index_dir: String,
    pub shard_prefix: String,
    pub lsh: PermutationTable,
}

/// File name of shard `shard_id` under a given prefix.
pub fn shard_file_name(prefix: &str, shard_id: usize) -> String {
    format!("{prefix}.{shard_id}")
}

/// Serialize a shard to `path`.
pub fn write_shard(path: impl AsRef<Path>, shard: &IndexShard) -> Result<()> {
    let path = path.as_ref();
    write_record(path, SHARD_MAGIC, shard)?;
    debug!(shard_id = shard.shard_id(), path = %path.display(), "persisted shard");
    Ok(())
}

/// Load a shard from `path` through a memory map.
pub fn read_shard(path: impl AsRef<Path>) -> Result<IndexShard> {
    let path = path.as_ref();
    let shard: IndexShard = read_record(path, SHARD_MAGIC)?;
    debug!(shard_id = shard.shard_id(), path = %path.display(), "loaded shard");
    Ok(shard)
}

pub(crate) fn write_meta(path: impl AsRef<Path>, meta: &IndexMeta) -> Result<()> {
    write_record(path.as_ref(), META_MAGIC, meta)
}

pub(crate) fn read_meta(path: impl AsRef<Path>) -> Result<IndexMeta> {
    read_record(path.as_ref(), META_MAGIC)
}

fn write_record<T: Serialize>(path: &Path, magic: [u8; 4], record: &T) -> Result<()> {
    let payload = postcard::to_allocvec(record)
        .map_err(|e| Error::Internal(format!("encode {}: {e}", path.display())))?;

    let mut file = File::create(path).map_err(|e| Error::shard_io(path, e))?;
    file.write_all(&magic).map_err(|e| Error::shard_io(path, e))?;
    file.write_all(&FORMAT_VERSION.to_le_bytes())
        .map_err(|e| Error::shard_io(path, e))?;
    file.write_all(&payload).map_err(|e| Error::shard_io(path, e))?;
    file.flush().map_err(|e| Error::shard_io(path, e))?;
    Ok(())
}

fn read_record<T: DeserializeOwned>(path: &Path, magic: [u8; 4]) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::shard_io(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| Error::shard_io(path, e))?
        .len();
    if (len as usize) < HEADER_LEN {
        return Err(Error::shard_decode(path, "file shorter than header"));
    }

    // Safety: the mapping is read-only and dropped before this call
    // returns; shard files are not mutated once written.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::shard_io(path, e))?;

    if mmap[..4] != magic {
        return Err(Error::shard_decode(path, "bad magic bytes"));
    }
    let version = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]);
    if version != FORMAT_VERSION {
        return Err(Error::shard_decode(
            path,
            format!("unsupported format version {version}"),
        ));
    }

    postcard::from_bytes(&mmap[HEADER_LEN..]).map_err(|e| Error::shard_decode(path, e.to_string()))
}
