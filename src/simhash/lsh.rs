//! Banded LSH over SimHash fingerprints.
//!
//! A permutation table splits the fingerprint's bits into `B` bands; two
//! fingerprints that agree on every sampled bit of at least one band are
//! candidates for similarity. The table is drawn once from a seeded
//! permutation, frozen, and persisted with the index; the same table must
//! band both the indexed fingerprints and the query, or candidate recall is
//! undefined.

use crate::error::{Error, Result};
use crate::simhash::SimHash;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Seed for the default permutation table.
pub const DEFAULT_PERMUTATION_SEED: u64 = 0x42_41_4E_44_53_u64; // "BANDS"

/// Band signatures for one fingerprint, in band order. Inline up to the
/// default band count.
pub type BandSignatures = SmallVec<[u64; 8]>;

/// Fixed bit-sampling schedule for banded LSH.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationTable {
    bands: usize,
    bits_per_band: usize,
    /// `bands` rows of `bits_per_band` distinct bit positions each.
    permutations: Vec<Vec<u8>>,
}

impl PermutationTable {
    /// Build a table over `hash_bits` sampled bits split into `bands`
    /// bands, using the default seed.
    ///
    /// `hash_bits` must divide 64 evenly, and `bands` must divide
    /// `hash_bits` evenly.
    pub fn new(hash_bits: usize, bands: usize) -> Result<Self> {
        Self::with_seed(hash_bits, bands, DEFAULT_PERMUTATION_SEED)
    }

    /// Build a table from an explicit seed.
    pub fn with_seed(hash_bits: usize, bands: usize, seed: u64) -> Result<Self> {
        if hash_bits == 0 || hash_bits > 64 || 64 % hash_bits != 0 {
            return Err(Error::InvalidConfig(format!(
                "hash_bits must divide 64 evenly, got {hash_bits}"
            )));
        }
        if bands == 0 || hash_bits % bands != 0 {
            return Err(Error::InvalidConfig(format!(
                "bands ({bands}) must divide hash_bits ({hash_bits}) evenly"
            )));
        }
        let bits_per_band = hash_bits / bands;

        let mut rng = StdRng::seed_from_u64(seed);
        let permutations = (0..bands)
            .map(|_| {
                let mut positions: Vec<u8> = (0..hash_bits as u8).collect();
                positions.shuffle(&mut rng);
                positions.truncate(bits_per_band);
                positions
            })
            .collect();

        Ok(Self {
            bands,
            bits_per_band,
            permutations,
        })
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn bits_per_band(&self) -> usize {
        self.bits_per_band
    }

    /// The signature of band `band` for `fp`: bit `j` of the output is bit
    /// `perm[band][j]` of the fingerprint.
    pub fn band_signature(&self, band: usize, fp: SimHash) -> u64 {
        let mut sig = 0u64;
        for (j, &bit) in self.permutations[band].iter().enumerate() {
            if (fp.0 >> bit) & 1 == 1 {
                sig |= 1u64 << j;
            }
        }
        sig
    }

    /// All band signatures for `fp`, in band order.
    pub fn band_signatures(&self, fp: SimHash) -> BandSignatures {
        (0..self.bands).map(|b| self.band_signature(b, fp)).collect()
    }
}
