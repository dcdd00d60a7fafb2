//! Whole-document similarity comparison.
//!
//! Fingerprints two documents with the n-gram vectorizer and converts the
//! Hamming distance into a percentage plus a qualitative assessment.

use crate::error::{Error, Result};
use crate::simhash::{
    fingerprint_with_vectorizer, Hyperplanes, NGramVectorizer, SimHash, NUM_HYPERPLANES,
    VECTOR_DIMENSIONS,
};
use std::fmt;
use std::path::Path;

/// Default n-gram size for document comparison.
const COMPARE_NGRAM_SIZE: usize = 3;

/// Qualitative bucket for a similarity percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// >= 90%
    NearlyIdentical,
    /// >= 80%
    VerySimilar,
    /// >= 70%
    ModeratelySimilar,
    /// >= 50%
    SomewhatSimilar,
    /// below 50%
    Different,
}

impl Assessment {
    fn from_similarity(similarity: f64) -> Self {
        match similarity {
            s if s >= 90.0 => Assessment::NearlyIdentical,
            s if s >= 80.0 => Assessment::VerySimilar,
            s if s >= 70.0 => Assessment::ModeratelySimilar,
            s if s >= 50.0 => Assessment::SomewhatSimilar,
            _ => Assessment::Different,
        }
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Assessment::NearlyIdentical => "Nearly identical",
            Assessment::VerySimilar => "Very similar",
            Assessment::ModeratelySimilar => "Moderately similar",
            Assessment::SomewhatSimilar => "Somewhat similar",
            Assessment::Different => "Different",
        };
        f.write_str(label)
    }
}

/// Result of comparing two documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// Fingerprint of the first document.
    pub left: SimHash,
    /// Fingerprint of the second document.
    pub right: SimHash,
    /// Hamming distance between the two fingerprints.
    pub distance: u32,
    /// `100 * (bits - distance) / bits`, in `0.0..=100.0`.
    pub similarity: f64,
    /// Qualitative bucket for `similarity`.
    pub assessment: Assessment,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Similarity: {:.2}%", self.similarity)?;
        writeln!(f, "Hamming Distance: {}", self.distance)?;
        writeln!(f, "Assessment: {}", self.assessment)
    }
}

/// Near-duplicate detector for whole documents.
pub struct DocumentSimilarity {
    hyperplanes: Hyperplanes,
    vectorizer: NGramVectorizer,
}

impl DocumentSimilarity {
    /// Detector with the standard geometry (`D=128`, `H=64`) and 3-gram
    /// vectorization.
    pub fn new() -> Self {
        Self::with_hyperplanes(Hyperplanes::generate(VECTOR_DIMENSIONS, NUM_HYPERPLANES))
    }

    /// Detector over an existing hyperplane set, e.g. one loaded from index
    /// metadata so comparisons agree with indexed fingerprints.
    pub fn with_hyperplanes(hyperplanes: Hyperplanes) -> Self {
        let vectorizer = NGramVectorizer::new(hyperplanes.dims(), COMPARE_NGRAM_SIZE);
        Self {
            hyperplanes,
            vectorizer,
        }
    }

    /// Compare two documents.
    pub fn compare(&self, left: &str, right: &str) -> Comparison {
        let l = fingerprint_with_vectorizer(left, &self.hyperplanes, &self.vectorizer);
        let r = fingerprint_with_vectorizer(right, &self.hyperplanes, &self.vectorizer);
        let distance = l.hamming_distance(r);
        let bits = self.hyperplanes.len() as f64;
        let similarity = 100.0 * (bits - distance as f64) / bits;
        Comparison {
            left: l,
            right: r,
            distance,
            similarity,
            assessment: Assessment::from_similarity(similarity),
        }
    }

    /// Compare the contents of two files, decoding lossily.
    pub fn compare_files(
        &self,
        left: impl AsRef<Path>,
        right: impl AsRef<Path>,
    ) -> Result<Comparison> {
        let left = left.as_ref();
        let right = right.as_ref();
        let a = std::fs::read(left).map_err(|e| Error::input(left, e))?;
        let b = std::fs::read(right).map_err(|e| Error::input(right, e))?;
        Ok(self.compare(&String::from_utf8_lossy(&a), &String::from_utf8_lossy(&b)))
    }
}

impl Default for DocumentSimilarity {
    fn default() -> Self {
        Self::new()
    }
}
