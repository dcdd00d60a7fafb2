//! Deterministic random-hyperplane generation.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Seed for the default hyperplane set. Changing this invalidates every
/// existing index, since fingerprints are only comparable under the
/// hyperplane set that produced them.
pub const DEFAULT_HYPERPLANE_SEED: u64 = 0x53_49_4D_48_41_53_48; // "SIMHASH"

/// An ordered set of unit-length projection vectors.
///
/// One fingerprint bit per hyperplane; the set is generated once from a
/// fixed seed, persisted with the index metadata, and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperplanes {
    dims: usize,
    planes: Vec<Vec<f64>>,
}

impl Hyperplanes {
    /// Generate `count` unit vectors of dimension `dims` from the default
    /// seed. Two calls always produce the same set.
    pub fn generate(dims: usize, count: usize) -> Self {
        Self::generate_seeded(dims, count, DEFAULT_HYPERPLANE_SEED)
    }

    /// Generate from an explicit seed.
    ///
    /// Each component is a standard normal sample obtained by Box-Muller
    /// over two uniform draws; each vector is then normalized to unit
    /// length so dot products are pure direction comparisons.
    pub fn generate_seeded(dims: usize, count: usize, seed: u64) -> Self {
        assert!(dims > 0, "hyperplane dimension must be positive");
        assert!(count > 0 && count <= 64, "hyperplane count must be 1-64");

        let mut rng = StdRng::seed_from_u64(seed);
        let planes = (0..count)
            .map(|_| {
                let mut v: Vec<f64> = (0..dims).map(|_| standard_normal(&mut rng)).collect();
                let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for x in &mut v {
                        *x /= norm;
                    }
                }
                v
            })
            .collect();

        Self { dims, planes }
    }

    /// Vector dimensionality `D`.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of hyperplanes `H` (= fingerprint bit width).
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Iterate the hyperplanes in bit order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.planes.iter().map(Vec::as_slice)
    }
}

/// One standard normal sample via Box-Muller.
fn standard_normal(rng: &mut StdRng) -> f64 {
    // 1 - gen() maps [0, 1) onto (0, 1] so the log argument is never zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
