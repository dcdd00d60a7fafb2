//! Property-based tests for simdex components.
//!
//! These tests verify invariants that should hold regardless of input:
//! - Fingerprinting is deterministic and Hamming distance is a metric
//! - Band signatures stay within their configured width
//! - The chunker tiles inputs without loss when overlap is disabled
//! - Shard persistence round-trips both maps

use proptest::prelude::*;

mod fingerprint_props {
    use super::*;
    use simdex::simhash::{fingerprint, Hyperplanes, SimHash};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn fingerprint_is_deterministic(text in ".{0,400}") {
            let planes = Hyperplanes::generate(64, 32);
            prop_assert_eq!(fingerprint(&text, &planes), fingerprint(&text, &planes));
        }

        #[test]
        fn hamming_distance_is_bounded(a in any::<u64>(), b in any::<u64>()) {
            let d = SimHash(a).hamming_distance(SimHash(b));
            prop_assert!(d <= 64);
        }

        #[test]
        fn hamming_distance_is_symmetric(a in any::<u64>(), b in any::<u64>()) {
            prop_assert_eq!(
                SimHash(a).hamming_distance(SimHash(b)),
                SimHash(b).hamming_distance(SimHash(a))
            );
        }

        #[test]
        fn hamming_distance_to_self_is_zero(a in any::<u64>()) {
            prop_assert_eq!(SimHash(a).hamming_distance(SimHash(a)), 0);
        }

        #[test]
        fn hamming_triangle_inequality(
            a in any::<u64>(),
            b in any::<u64>(),
            c in any::<u64>(),
        ) {
            let ab = SimHash(a).hamming_distance(SimHash(b));
            let bc = SimHash(b).hamming_distance(SimHash(c));
            let ac = SimHash(a).hamming_distance(SimHash(c));
            prop_assert!(ac <= ab + bc);
        }
    }
}

mod vectorizer_props {
    use super::*;
    use simdex::simhash::{FrequencyVectorizer, NGramVectorizer, Vectorizer};

    fn norm(v: &[f64]) -> f64 {
        v.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn frequency_vectors_are_normalized_or_zero(text in ".{0,300}") {
            let v = FrequencyVectorizer::new(64).vectorize(&text);
            let n = norm(&v);
            prop_assert!(n == 0.0 || (n - 1.0).abs() < 1e-9);
        }

        #[test]
        fn ngram_vectors_are_normalized_or_zero(text in ".{0,300}") {
            let v = NGramVectorizer::new(64, 3).vectorize(&text);
            let n = norm(&v);
            prop_assert!(n == 0.0 || (n - 1.0).abs() < 1e-9);
        }

        #[test]
        fn vector_dimension_is_fixed(text in ".{0,200}", dims in 1usize..256) {
            prop_assert_eq!(FrequencyVectorizer::new(dims).vectorize(&text).len(), dims);
        }
    }
}

mod band_props {
    use super::*;
    use simdex::simhash::{PermutationTable, SimHash};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn signatures_fit_in_band_width(fp in any::<u64>()) {
            let table = PermutationTable::new(64, 8).unwrap();
            for sig in table.band_signatures(SimHash(fp)) {
                prop_assert_eq!(sig >> table.bits_per_band(), 0);
            }
        }

        #[test]
        fn equal_fingerprints_share_all_bands(fp in any::<u64>()) {
            let table = PermutationTable::new(64, 8).unwrap();
            prop_assert_eq!(
                table.band_signatures(SimHash(fp)),
                table.band_signatures(SimHash(fp))
            );
        }

        #[test]
        fn signature_count_equals_band_count(fp in any::<u64>(), bands in prop::sample::select(vec![1usize, 2, 4, 8, 16])) {
            let table = PermutationTable::new(64, bands).unwrap();
            prop_assert_eq!(table.band_signatures(SimHash(fp)).len(), bands);
        }
    }
}

mod chunker_props {
    use super::*;
    use simdex::chunk::{ChunkConfig, Chunker};
    use std::io::Cursor;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn ascii_input_tiles_losslessly_without_boundaries(
            input in prop::collection::vec(32u8..127, 0..20_000),
            chunk_size in 16usize..4096,
        ) {
            let config = ChunkConfig {
                chunk_size,
                overlap_size: 0,
                split_on_boundary: false,
                max_chunk_size: chunk_size * 2,
                ..ChunkConfig::default()
            };
            let chunks = Chunker::new(Cursor::new(input.clone()), config)
                .collect::<simdex::Result<Vec<_>>>()
                .unwrap();

            let mut reassembled = Vec::new();
            let mut expected_offset = 0u64;
            for chunk in &chunks {
                prop_assert_eq!(chunk.offset, expected_offset);
                expected_offset += chunk.content.len() as u64;
                reassembled.extend_from_slice(chunk.content.as_bytes());
            }
            prop_assert_eq!(reassembled, input);
            if let Some(last) = chunks.last() {
                prop_assert!(last.complete);
            }
        }

        #[test]
        fn chunks_respect_max_size_and_monotonic_offsets(
            input in prop::collection::vec(any::<u8>(), 0..30_000),
        ) {
            let config = ChunkConfig::default();
            let max = config.max_chunk_size;
            let chunks = Chunker::new(Cursor::new(input), config)
                .collect::<simdex::Result<Vec<_>>>()
                .unwrap();
            for chunk in &chunks {
                prop_assert!(chunk.content.len() <= max);
            }
            for pair in chunks.windows(2) {
                prop_assert!(pair[0].offset < pair[1].offset);
            }
        }

        #[test]
        fn chunk_content_is_always_valid_utf8(
            input in prop::collection::vec(any::<u8>(), 0..10_000),
        ) {
            let chunks = Chunker::new(Cursor::new(input), ChunkConfig::default())
                .collect::<simdex::Result<Vec<_>>>()
                .unwrap();
            for chunk in &chunks {
                prop_assert!(std::str::from_utf8(chunk.content.as_bytes()).is_ok());
            }
        }
    }
}

mod persistence_props {
    use super::*;
    use simdex::index::{persistence, IndexShard};
    use simdex::simhash::{PermutationTable, SimHash};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        #[test]
        fn shard_roundtrip_preserves_content(
            entries in prop::collection::vec((any::<u64>(), any::<u64>()), 0..50),
        ) {
            let table = PermutationTable::new(64, 8).unwrap();
            let mut shard = IndexShard::new(7);
            for (fp, offset) in &entries {
                shard.add(SimHash(*fp), *offset, &table);
            }

            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("prop.shard.7");
            persistence::write_shard(&path, &shard).unwrap();
            let loaded = persistence::read_shard(&path).unwrap();
            prop_assert_eq!(&loaded, &shard);
            for (fp, _) in &entries {
                prop_assert_eq!(
                    loaded.lookup_exact(SimHash(*fp)),
                    shard.lookup_exact(SimHash(*fp))
                );
            }
        }
    }
}
