//! Text vectorization for SimHash.
//!
//! A vectorizer turns text into a normalized fixed-dimension vector; the
//! fingerprinter only sees the vector. Both shipped vectorizers bucket
//! features into dimensions by MD5: the first 4 digest bytes, read
//! big-endian, reduced modulo the dimension count. MD5 is a format choice,
//! not a security boundary; fingerprints built with one bucketing scheme
//! are incompatible with any other.

use md5::{Digest, Md5};
use std::collections::HashMap;

/// Characters stripped from both ends of a token before hashing.
const TOKEN_TRIM: &[char] = &[
    '.', ',', '!', '?', ':', ';', '"', '\'', '(', ')', '[', ']', '{', '}',
];

/// Converts text into a normalized vector of a fixed dimension.
pub trait Vectorizer {
    /// The dimension of every vector this vectorizer produces. Must match
    /// the hyperplane set it is paired with.
    fn dims(&self) -> usize;

    /// Vectorize `text`. The result is L2-normalized unless it is all-zero.
    fn vectorize(&self, text: &str) -> Vec<f64>;
}

/// Token-frequency vectorizer.
///
/// Tokenizes on whitespace, lowercases, trims punctuation from both ends,
/// and accumulates `+1` into the dimension each surviving token hashes to.
#[derive(Debug, Clone)]
pub struct FrequencyVectorizer {
    dims: usize,
}

impl FrequencyVectorizer {
    pub fn new(dims: usize) -> Self {
        assert!(dims > 0, "vector dimension must be positive");
        Self { dims }
    }
}

impl Vectorizer for FrequencyVectorizer {
    fn dims(&self) -> usize {
        self.dims
    }

    fn vectorize(&self, text: &str) -> Vec<f64> {
        let mut v = vec![0.0; self.dims];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let token = token.trim_matches(TOKEN_TRIM);
            if token.is_empty() {
                continue;
            }
            v[bucket(token.as_bytes(), self.dims)] += 1.0;
        }
        l2_normalize(v)
    }
}

/// Byte-n-gram vectorizer.
///
/// Accumulates frequencies of all contiguous byte n-grams, bucketing each
/// n-gram the same way the frequency vectorizer buckets tokens. Texts
/// shorter than `n` bytes defer to the frequency vectorizer.
#[derive(Debug, Clone)]
pub struct NGramVectorizer {
    dims: usize,
    ngram_size: usize,
    fallback: FrequencyVectorizer,
}

impl NGramVectorizer {
    pub fn new(dims: usize, ngram_size: usize) -> Self {
        assert!(ngram_size > 0, "n-gram size must be positive");
        Self {
            dims,
            ngram_size,
            fallback: FrequencyVectorizer::new(dims),
        }
    }

    pub fn ngram_size(&self) -> usize {
        self.ngram_size
    }
}

impl Vectorizer for NGramVectorizer {
    fn dims(&self) -> usize {
        self.dims
    }

    fn vectorize(&self, text: &str) -> Vec<f64> {
        let bytes = text.as_bytes();
        if bytes.len() < self.ngram_size {
            return self.fallback.vectorize(text);
        }

        let mut counts: HashMap<&[u8], f64> = HashMap::new();
        for gram in bytes.windows(self.ngram_size) {
            *counts.entry(gram).or_insert(0.0) += 1.0;
        }

        let mut v = vec![0.0; self.dims];
        for (gram, count) in counts {
            v[bucket(gram, self.dims)] += count;
        }
        l2_normalize(v)
    }
}

/// Map a feature to a dimension: first 4 MD5 bytes, big-endian, mod `dims`.
fn bucket(feature: &[u8], dims: usize) -> usize {
    let digest = Md5::digest(feature);
    let head = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    head as usize % dims
}

/// L2-normalize in place; the all-zero vector is returned as-is.
fn l2_normalize(mut v: Vec<f64>) -> Vec<f64> {
    let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
