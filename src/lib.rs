//! simdex: near-duplicate text search over SimHash fingerprints.
//!
//! Streams a document into overlapping chunks, fingerprints each chunk with
//! a random-hyperplane SimHash, and maintains a sharded on-disk index from
//! fingerprints to byte offsets. Queries come in two shapes:
//!
//! - **Exact lookup**: every offset whose fingerprint equals the query.
//! - **Fuzzy lookup**: every offset whose fingerprint is within a Hamming
//!   threshold of the query, pre-filtered by banded LSH.
//!
//! # Pipeline
//!
//! | Stage | Module | Role |
//! |-------|--------|------|
//! | Chunker | [`chunk`] | Boundary-aware overlapping segmentation with UTF-8 repair |
//! | Fingerprinter | [`simhash`] | Vectorize + project onto fixed hyperplanes |
//! | Worker pool | [`chunk::WorkerPool`] | Bounded parallel fingerprinting |
//! | Index engine | [`index`] | Shard rotation, persistence, LRU cache |
//! | Query engine | [`index::Index`] | Exact + banded fuzzy lookup |
//!
//! # Example
//!
//! ```
//! use simdex::simhash::{fingerprint, Hyperplanes};
//!
//! let hyperplanes = Hyperplanes::generate(128, 64);
//! let a = fingerprint("the quick brown fox", &hyperplanes);
//! let b = fingerprint("the quick brown fox", &hyperplanes);
//! assert_eq!(a.hamming_distance(b), 0);
//! ```
//!
//! Building and querying an index:
//!
//! ```rust,ignore
//! use simdex::{build_index, ChunkConfig, IndexConfig};
//!
//! let index = build_index(
//!     "corpus.txt",
//!     "corpus.idx.d",
//!     &ChunkConfig::default(),
//!     &IndexConfig::default(),
//! )?;
//! index.save("corpus.meta")?;
//!
//! let matches = index.fuzzy_lookup(query_fp, 3)?;
//! for (fp, offsets) in &matches.matches {
//!     println!("{fp}: {offsets:?}");
//! }
//! ```
//!
//! # Determinism
//!
//! Hyperplanes and LSH permutations derive from fixed seeds, so two
//! independent builds over the same input produce identical fingerprints
//! and candidate schedules. Both are persisted with the index metadata;
//! queries against a loaded index always use the tables it was built with.

pub mod chunk;
pub mod error;
pub mod index;
pub mod simhash;

pub use chunk::{build_index, ChunkConfig};
pub use error::{Error, Result};
pub use index::{ExactMatches, FuzzyMatches, Index, IndexConfig, IndexStats};
pub use simhash::SimHash;
