//! A bounded segment of the fingerprint index.

use crate::simhash::{PermutationTable, SimHash};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

/// One shard: a map from fingerprints to source offsets plus the LSH
/// buckets covering those fingerprints.
///
/// Every fingerprint key in `positions` also appears in each bucket its
/// band signatures select; `add` maintains this jointly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexShard {
    /// Fingerprint -> offsets, in insertion order. Duplicate offsets are
    /// retained.
    positions: HashMap<SimHash, Vec<u64>>,
    /// `(band_index, band_signature)` -> fingerprints in that bucket.
    lsh_buckets: HashMap<(u32, u64), HashSet<SimHash>>,
    shard_id: usize,
    /// Running count of all offsets; kept so rotation checks stay O(1).
    total_positions: u64,
    /// Wall time of the last read or write; drives LRU eviction.
    #[serde(skip, default = "SystemTime::now")]
    last_access: SystemTime,
}

impl IndexShard {
    pub fn new(shard_id: usize) -> Self {
        Self {
            positions: HashMap::new(),
            lsh_buckets: HashMap::new(),
            shard_id,
            total_positions: 0,
            last_access: SystemTime::now(),
        }
    }

    pub fn shard_id(&self) -> usize {
        self.shard_id
    }

    pub fn last_access(&self) -> SystemTime {
        self.last_access
    }

    /// Record `offset` for `fp` and insert `fp` into every bucket its band
    /// signatures select.
    pub fn add(&mut self, fp: SimHash, offset: u64, table: &PermutationTable) {
        self.positions.entry(fp).or_default().push(offset);
        self.total_positions += 1;
        for (band, sig) in table.band_signatures(fp).into_iter().enumerate() {
            self.lsh_buckets
                .entry((band as u32, sig))
                .or_default()
                .insert(fp);
        }
        self.last_access = SystemTime::now();
    }

    /// Offsets recorded for exactly `fp`; empty when absent.
    pub fn lookup_exact(&self, fp: SimHash) -> &[u64] {
        self.positions.get(&fp).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Union of the fingerprints in the buckets `fp`'s band signatures
    /// select in this shard.
    pub fn candidates_for(&self, fp: SimHash, table: &PermutationTable) -> HashSet<SimHash> {
        let mut candidates = HashSet::new();
        for (band, sig) in table.band_signatures(fp).into_iter().enumerate() {
            if let Some(bucket) = self.lsh_buckets.get(&(band as u32, sig)) {
                candidates.extend(bucket.iter().copied());
            }
        }
        candidates
    }

    /// Number of distinct fingerprints.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Total offsets across all fingerprints.
    pub fn total_positions(&self) -> u64 {
        self.total_positions
    }

    pub(crate) fn touch(&mut self) {
        self.last_access = SystemTime::now();
    }
}

impl PartialEq for IndexShard {
    fn eq(&self, other: &Self) -> bool {
        // Access time is runtime bookkeeping, not shard identity.
        self.shard_id == other.shard_id
            && self.positions == other.positions
            && self.lsh_buckets == other.lsh_buckets
    }
}
