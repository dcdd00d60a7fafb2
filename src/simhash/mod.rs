//! SimHash fingerprinting for near-duplicate text detection.
//!
//! SimHash produces binary fingerprints where Hamming distance approximates
//! angular distance between the underlying text vectors.
//!
//! ## Algorithm
//!
//! 1. Vectorize the text into a normalized `D`-dimensional vector
//!    (see [`Vectorizer`])
//! 2. Project the vector onto `H` fixed random hyperplanes
//! 3. Bit `i` of the fingerprint is the sign of the `i`-th projection
//!
//! Equal inputs give equal fingerprints; similar inputs give fingerprints
//! with small Hamming distance.
//!
//! ## Properties
//!
//! - Very fast comparison (XOR + popcount)
//! - Fixed-size fingerprints regardless of document size
//! - Deterministic across runs for a fixed hyperplane set
//!
//! ## References
//!
//! - Charikar (2002). "Similarity estimation techniques from rounding algorithms"
//! - Manku et al. (2007). "Detecting near-duplicates for web crawling"

mod hyperplanes;
mod lsh;
mod similarity;
mod vectorizer;

pub use hyperplanes::Hyperplanes;
pub use lsh::{BandSignatures, PermutationTable};
pub use similarity::{Assessment, Comparison, DocumentSimilarity};
pub use vectorizer::{FrequencyVectorizer, NGramVectorizer, Vectorizer};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default vector dimensionality.
pub const VECTOR_DIMENSIONS: usize = 128;

/// Default hyperplane count, and thus fingerprint bit width.
pub const NUM_HYPERPLANES: usize = 64;

/// A 64-bit locality-sensitive fingerprint.
///
/// Equality and [`hamming_distance`](SimHash::hamming_distance) are the only
/// meaningful operations; the bit pattern itself is opaque and stable only
/// for a fixed hyperplane set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimHash(pub u64);

impl SimHash {
    /// Hamming distance to another fingerprint: the number of differing bit
    /// positions, in `0..=64`.
    pub fn hamming_distance(self, other: SimHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Check if another fingerprint is within `max_distance` bits.
    pub fn is_similar(self, other: SimHash, max_distance: u32) -> bool {
        self.hamming_distance(other) <= max_distance
    }

    /// The raw fingerprint value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SimHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for SimHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for SimHash {
    fn from(value: u64) -> Self {
        SimHash(value)
    }
}

/// Fingerprint `text` with the default frequency vectorizer.
pub fn fingerprint(text: &str, hyperplanes: &Hyperplanes) -> SimHash {
    let vectorizer = FrequencyVectorizer::new(hyperplanes.dims());
    fingerprint_with_vectorizer(text, hyperplanes, &vectorizer)
}

/// Fingerprint `text` with an explicit vectorizer.
///
/// The vectorizer's dimension must match the hyperplane set's.
pub fn fingerprint_with_vectorizer(
    text: &str,
    hyperplanes: &Hyperplanes,
    vectorizer: &dyn Vectorizer,
) -> SimHash {
    debug_assert_eq!(vectorizer.dims(), hyperplanes.dims());
    project(&vectorizer.vectorize(text), hyperplanes)
}

/// Fingerprint the entire contents of a file, decoding lossily.
pub fn fingerprint_file(path: impl AsRef<Path>, hyperplanes: &Hyperplanes) -> Result<SimHash> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::input(path, e))?;
    Ok(fingerprint(&String::from_utf8_lossy(&bytes), hyperplanes))
}

/// Sign-project a vector onto the hyperplane set.
///
/// Bit `i` is set iff `dot(v, h_i) >= 0`. The all-zero vector (empty text)
/// maps to the all-zero fingerprint rather than to the degenerate case where
/// every zero dot product counts as non-negative.
fn project(vector: &[f64], hyperplanes: &Hyperplanes) -> SimHash {
    if vector.iter().all(|&x| x == 0.0) {
        return SimHash(0);
    }

    let mut bits = 0u64;
    for (i, plane) in hyperplanes.iter().enumerate() {
        let dot: f64 = vector.iter().zip(plane.iter()).map(|(v, h)| v * h).sum();
        if dot >= 0.0 {
            bits |= 1u64 << i;
        }
    }
    SimHash(bits)
}
