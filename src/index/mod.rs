//! Sharded, disk-backed fingerprint index.
//!
//! The index appends fingerprints to an in-memory active shard; when the
//! active shard fills it is rotated: persisted to
//! `<index_dir>/<prefix>.<shard_id>` and replaced by a fresh shard. Rotated
//! shards are immutable; queries load them on demand through an LRU cache.
//! A metadata file written by [`Index::save`] records everything needed to
//! reopen the index with [`Index::load`].
//!
//! # Locking
//!
//! One reader-writer lock protects the shard list, the active-shard
//! pointer, and the fingerprint-to-shard hint map; writes serialize on it
//! and queries share it. The LRU cache of disk-loaded shards sits under
//! its own mutex so concurrent readers can fault shards in without
//! upgrading to the writer lock.

mod cache;
pub mod persistence;
mod query;
mod shard;

pub use query::{ExactMatches, FuzzyMatches};
pub use shard::IndexShard;

use crate::error::{Error, Result};
use crate::simhash::{Hyperplanes, PermutationTable, SimHash};
use cache::ShardCache;
use parking_lot::{Mutex, RwLock};
use persistence::{shard_file_name, IndexMeta};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Default number of distinct fingerprints that triggers shard rotation.
pub const MAX_SHARD_SIZE: usize = 100_000;

/// Rotation also triggers when total offsets reach this multiple of the
/// shard size, so colliding fingerprints cannot grow one shard without
/// limit.
const POSITIONS_PER_KEY_BOUND: u64 = 8;

/// Index construction parameters.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Vector dimensionality `D` shared by vectorizer and hyperplanes.
    pub vector_dims: usize,
    /// Hyperplane count `H`; equals the fingerprint bit width.
    pub num_hyperplanes: usize,
    /// LSH band count.
    pub bands: usize,
    /// Bits sampled per band; `bands * bits_per_band` must divide 64
    /// evenly.
    pub bits_per_band: usize,
    /// Distinct-fingerprint threshold that triggers shard rotation.
    pub max_shard_size: usize,
    /// Maximum disk-loaded shards kept in the LRU cache; `0` disables
    /// caching.
    pub shard_cache: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            vector_dims: 128,
            num_hyperplanes: 64,
            bands: 8,
            bits_per_band: 8,
            max_shard_size: MAX_SHARD_SIZE,
            shard_cache: 5,
        }
    }
}

impl IndexConfig {
    fn validate(&self) -> Result<()> {
        if self.vector_dims == 0 {
            return Err(Error::InvalidConfig("vector_dims must be positive".into()));
        }
        if self.num_hyperplanes == 0 || self.num_hyperplanes > 64 {
            return Err(Error::InvalidConfig(format!(
                "num_hyperplanes must be 1-64, got {}",
                self.num_hyperplanes
            )));
        }
        if self.max_shard_size == 0 {
            return Err(Error::InvalidConfig("max_shard_size must be positive".into()));
        }
        Ok(())
    }
}

/// Index statistics over currently loaded shards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub source_file: PathBuf,
    pub chunk_size: usize,
    pub created_at: SystemTime,
    pub shard_count: usize,
    /// Distinct fingerprints, summed over loaded shards.
    pub unique_hashes: u64,
    /// Total offsets, summed over loaded shards.
    pub total_positions: u64,
}

pub(crate) struct IndexState {
    /// Shard slots by id; `None` marks a shard that lives only on disk.
    shards: Vec<Option<IndexShard>>,
    /// Index into `shards` of the one shard accepting writes.
    active: usize,
    /// Fingerprint -> shard id recorded at insert time, for O(1) exact
    /// lookup. Populated only while building; last insert wins.
    hint: HashMap<SimHash, usize>,
}

/// Sharded SimHash index over one source document.
pub struct Index {
    source_file: PathBuf,
    chunk_size: usize,
    hyperplanes: Arc<Hyperplanes>,
    created_at: SystemTime,
    lsh: PermutationTable,
    index_dir: PathBuf,
    shard_prefix: String,
    max_shard_size: usize,
    state: RwLock<IndexState>,
    cache: Mutex<ShardCache>,
}

impl Index {
    /// Create a fresh index rooted at `index_dir` with one empty active
    /// shard.
    pub fn create(
        source_file: impl AsRef<Path>,
        index_dir: impl AsRef<Path>,
        chunk_size: usize,
        hyperplanes: Arc<Hyperplanes>,
        config: &IndexConfig,
    ) -> Result<Self> {
        config.validate()?;
        let lsh = PermutationTable::new(config.bands * config.bits_per_band, config.bands)?;

        let index_dir = index_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&index_dir).map_err(|e| Error::shard_io(&index_dir, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&index_dir, std::fs::Permissions::from_mode(0o755))
                .map_err(|e| Error::shard_io(&index_dir, e))?;
        }

        let source_file = source_file.as_ref().to_path_buf();
        let shard_prefix = shard_prefix_for(&source_file);
        debug!(
            index_dir = %index_dir.display(),
            prefix = %shard_prefix,
            "created index"
        );

        Ok(Self {
            source_file,
            chunk_size,
            hyperplanes,
            created_at: SystemTime::now(),
            lsh,
            index_dir,
            shard_prefix,
            max_shard_size: config.max_shard_size,
            state: RwLock::new(IndexState {
                shards: vec![Some(IndexShard::new(0))],
                active: 0,
                hint: HashMap::new(),
            }),
            cache: Mutex::new(ShardCache::new(config.shard_cache)),
        })
    }

    /// Record `offset` under `fp` in the active shard, rotating the shard
    /// out to disk once it fills.
    pub fn add(&self, fp: SimHash, offset: u64) -> Result<()> {
        let mut state = self.state.write();

        let (shard_id, rotate) = {
            let active = state.active;
            let shard = state
                .shards
                .get_mut(active)
                .and_then(Option::as_mut)
                .ok_or_else(|| Error::Internal("active shard is not loaded".into()))?;
            shard.add(fp, offset, &self.lsh);
            let full = shard.len() >= self.max_shard_size
                || shard.total_positions()
                    >= self.max_shard_size as u64 * POSITIONS_PER_KEY_BOUND;
            (shard.shard_id(), full)
        };
        state.hint.insert(fp, shard_id);

        if rotate {
            self.rotate(&mut state)?;
        }
        Ok(())
    }

    /// Persist the active shard and open a fresh one.
    fn rotate(&self, state: &mut IndexState) -> Result<()> {
        let active = state.active;
        let shard = state
            .shards
            .get(active)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::Internal("rotation raced with close".into()))?;
        persistence::write_shard(self.shard_path(shard.shard_id()), shard)?;
        info!(
            shard_id = shard.shard_id(),
            unique_hashes = shard.len(),
            "rotated shard"
        );

        let next_id = state.shards.len();
        state.shards.push(Some(IndexShard::new(next_id)));
        state.active = next_id;
        Ok(())
    }

    /// Flush the active shard, then write the metadata file.
    ///
    /// The active shard is written even when empty so that every shard id
    /// the metadata announces has a file behind it. The metadata records
    /// everything needed to reopen the index except the shard payloads
    /// themselves.
    pub fn save(&self, metadata_path: impl AsRef<Path>) -> Result<()> {
        let state = self.state.read();
        if let Some(shard) = state.shards.get(state.active).and_then(Option::as_ref) {
            persistence::write_shard(self.shard_path(shard.shard_id()), shard)?;
        }

        let created_at = self
            .created_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        let meta = IndexMeta {
            source_file: self.source_file.display().to_string(),
            chunk_size: self.chunk_size as u64,
            shard_count: state.shards.len() as u64,
            hyperplanes: (*self.hyperplanes).clone(),
            created_at,
            index_dir: self.index_dir.display().to_string(),
            shard_prefix: self.shard_prefix.clone(),
            lsh: self.lsh.clone(),
        };
        persistence::write_meta(metadata_path, &meta)
    }

    /// Reopen an index from its metadata file.
    ///
    /// The shard list is allocated at the recorded length with only shard 0
    /// eagerly loaded; the rest load on demand during queries.
    pub fn load(metadata_path: impl AsRef<Path>) -> Result<Self> {
        let meta = persistence::read_meta(metadata_path)?;
        let defaults = IndexConfig::default();

        let index_dir = PathBuf::from(&meta.index_dir);
        let mut shards: Vec<Option<IndexShard>> = vec![None; meta.shard_count as usize];
        if !shards.is_empty() {
            let path = index_dir.join(shard_file_name(&meta.shard_prefix, 0));
            shards[0] = Some(persistence::read_shard(path)?);
        }

        Ok(Self {
            source_file: PathBuf::from(&meta.source_file),
            chunk_size: meta.chunk_size as usize,
            hyperplanes: Arc::new(meta.hyperplanes),
            created_at: UNIX_EPOCH + Duration::from_secs(meta.created_at),
            lsh: meta.lsh,
            index_dir,
            shard_prefix: meta.shard_prefix,
            max_shard_size: defaults.max_shard_size,
            state: RwLock::new(IndexState {
                shards,
                active: 0,
                hint: HashMap::new(),
            }),
            cache: Mutex::new(ShardCache::new(defaults.shard_cache)),
        })
    }

    /// Flush the active shard if non-empty and drop in-memory shard state.
    /// Idempotent; reports the first error encountered.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        let result = self.flush_active(&state);

        for slot in &mut state.shards {
            *slot = None;
        }
        state.hint.clear();
        self.cache.lock().clear();
        debug!(source = %self.source_file.display(), "closed index");
        result
    }

    /// Statistics over currently loaded shards.
    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        let loaded = state.shards.iter().flatten();
        let (mut unique, mut total) = (0u64, 0u64);
        for shard in loaded {
            unique += shard.len() as u64;
            total += shard.total_positions();
        }
        IndexStats {
            source_file: self.source_file.clone(),
            chunk_size: self.chunk_size,
            created_at: self.created_at,
            shard_count: state.shards.len(),
            unique_hashes: unique,
            total_positions: total,
        }
    }

    /// The hyperplane set fingerprints must be computed with to be
    /// comparable against this index.
    pub fn hyperplanes(&self) -> &Hyperplanes {
        &self.hyperplanes
    }

    /// The permutation table banding this index's fingerprints.
    pub fn lsh_table(&self) -> &PermutationTable {
        &self.lsh
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    fn flush_active(&self, state: &IndexState) -> Result<()> {
        if let Some(shard) = state.shards.get(state.active).and_then(Option::as_ref) {
            if !shard.is_empty() {
                persistence::write_shard(self.shard_path(shard.shard_id()), shard)?;
            }
        }
        Ok(())
    }

    fn shard_path(&self, shard_id: usize) -> PathBuf {
        self.index_dir
            .join(shard_file_name(&self.shard_prefix, shard_id))
    }

    /// Run `f` against shard `shard_id`, faulting it in from disk through
    /// the LRU cache when it is not resident.
    pub(crate) fn with_shard<T>(
        &self,
        state: &IndexState,
        shard_id: usize,
        f: impl FnOnce(&IndexShard) -> T,
    ) -> Result<T> {
        if let Some(shard) = state.shards.get(shard_id).and_then(Option::as_ref) {
            return Ok(f(shard));
        }

        let mut cache = self.cache.lock();
        if let Some(shard) = cache.get(shard_id) {
            return Ok(f(shard));
        }

        let shard = persistence::read_shard(self.shard_path(shard_id))?;
        let out = f(&shard);
        cache.put(shard);
        Ok(out)
    }

    pub(crate) fn state(&self) -> &RwLock<IndexState> {
        &self.state
    }
}

impl IndexState {
    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub(crate) fn hint_for(&self, fp: SimHash) -> Option<usize> {
        self.hint.get(&fp).copied()
    }
}

/// Sanitized base name of the source path, suffixed with `.shard`.
fn shard_prefix_for(source: &Path) -> String {
    let base = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{clean}.shard")
}
