//! Parallel fingerprinting pipeline.
//!
//! Chunks fan out to the worker pool, fingerprints fan in over a bounded
//! channel, and a single consumer appends them to the index under its
//! writer lock. Results are unordered; each carries the originating
//! chunk's offset, so no ordering needs to be reconstructed.

use crate::chunk::{Chunk, ChunkConfig, Chunker, WorkerPool};
use crate::error::{Error, Result};
use crate::index::{Index, IndexConfig};
use crate::simhash::{fingerprint_with_vectorizer, FrequencyVectorizer, Hyperplanes, SimHash, Vectorizer};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Result envelope for one fingerprint job.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Fingerprint of the chunk's content.
    pub hash: SimHash,
    /// Byte offset of the chunk in the source stream.
    pub offset: u64,
    /// Per-task failure, delivered inline with successful results.
    pub error: Option<String>,
}

/// Fans chunk fingerprinting out to a worker pool.
pub struct ChunkProcessor {
    pool: WorkerPool,
    results_tx: Option<Sender<ProcessResult>>,
    results_rx: Receiver<ProcessResult>,
    hyperplanes: Arc<Hyperplanes>,
    vectorizer: Arc<dyn Vectorizer + Send + Sync>,
}

impl ChunkProcessor {
    /// Processor with `workers` threads (`0` = logical core count) and the
    /// default frequency vectorizer.
    pub fn new(workers: usize, hyperplanes: Arc<Hyperplanes>) -> Self {
        let vectorizer = Arc::new(FrequencyVectorizer::new(hyperplanes.dims()));
        Self::with_vectorizer(workers, hyperplanes, vectorizer)
    }

    /// Processor with an explicit vectorizer.
    pub fn with_vectorizer(
        workers: usize,
        hyperplanes: Arc<Hyperplanes>,
        vectorizer: Arc<dyn Vectorizer + Send + Sync>,
    ) -> Self {
        let pool = WorkerPool::new(workers);
        let (results_tx, results_rx) = bounded(pool.workers() * 2);
        Self {
            pool,
            results_tx: Some(results_tx),
            results_rx,
            hyperplanes,
            vectorizer,
        }
    }

    /// Queue one chunk for fingerprinting. Blocks only when the task queue
    /// is full, never on execution.
    pub fn process_chunk(&self, chunk: Chunk) {
        let Some(tx) = self.results_tx.clone() else {
            return;
        };
        let hyperplanes = Arc::clone(&self.hyperplanes);
        let vectorizer = Arc::clone(&self.vectorizer);
        self.pool.submit(move || {
            let hash = fingerprint_with_vectorizer(&chunk.content, &hyperplanes, &*vectorizer);
            let _ = tx.send(ProcessResult {
                hash,
                offset: chunk.offset,
                error: None,
            });
        });
    }

    /// The receiving side of the result channel. The channel disconnects
    /// once [`close`](ChunkProcessor::close) has drained the pool.
    pub fn results(&self) -> Receiver<ProcessResult> {
        self.results_rx.clone()
    }

    /// Drain outstanding jobs and release the result channel.
    pub fn close(&mut self) {
        self.pool.close();
        self.results_tx.take();
    }
}

/// Chunk `source`, fingerprint every chunk in parallel, and build a
/// persistent index rooted at `index_dir`.
///
/// The hyperplane set is generated from the fixed default seed with the
/// configured geometry, so repeated builds over the same input produce
/// identical fingerprints.
pub fn build_index(
    source: impl AsRef<Path>,
    index_dir: impl AsRef<Path>,
    chunk_config: &ChunkConfig,
    index_config: &IndexConfig,
) -> Result<Index> {
    let source = source.as_ref();
    let hyperplanes = Arc::new(Hyperplanes::generate(
        index_config.vector_dims,
        index_config.num_hyperplanes,
    ));
    let index = Index::create(
        source,
        index_dir.as_ref(),
        chunk_config.chunk_size,
        Arc::clone(&hyperplanes),
        index_config,
    )?;

    let mut processor = ChunkProcessor::new(0, hyperplanes);
    let results = processor.results();

    let (fed, consumed) = std::thread::scope(|scope| {
        let index_ref = &index;
        let consumer = scope.spawn(move || {
            let mut added = 0u64;
            let mut first_err: Option<Error> = None;
            for result in results.iter() {
                if let Some(task_err) = result.error {
                    warn!(offset = result.offset, error = %task_err, "chunk failed");
                    continue;
                }
                match index_ref.add(result.hash, result.offset) {
                    Ok(()) => added += 1,
                    Err(e) if first_err.is_none() => first_err = Some(e),
                    Err(_) => {}
                }
            }
            (added, first_err)
        });

        let fed = (|| -> Result<u64> {
            let mut chunks = 0u64;
            for chunk in Chunker::from_path(source, chunk_config.clone())? {
                processor.process_chunk(chunk?);
                chunks += 1;
            }
            Ok(chunks)
        })();

        // Drain the pool even on a chunker error so the consumer terminates.
        processor.close();
        let consumed = consumer
            .join()
            .map_err(|_| Error::Internal("result consumer panicked".into()));
        (fed, consumed)
    });

    let chunks = fed?;
    let (added, consumer_err) = consumed?;
    if let Some(e) = consumer_err {
        return Err(e);
    }

    info!(
        source = %source.display(),
        chunks,
        positions = added,
        "index build complete"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chunk(offset: u64, content: &str) -> Chunk {
        Chunk {
            offset,
            content: content.to_string(),
            complete: false,
            metadata: HashMap::new(),
        }
    }

    /// Feed chunks through a processor while a drainer thread collects, so
    /// the bounded result channel never backs up.
    fn run(processor: &mut ChunkProcessor, chunks: Vec<Chunk>) -> Vec<ProcessResult> {
        let results = processor.results();
        let drainer = std::thread::spawn(move || results.iter().collect::<Vec<_>>());
        for c in chunks {
            processor.process_chunk(c);
        }
        processor.close();
        drainer.join().unwrap()
    }

    #[test]
    fn results_carry_offsets() {
        let planes = Arc::new(Hyperplanes::generate(64, 32));
        let mut processor = ChunkProcessor::new(2, planes);
        let chunks = (0..20u64)
            .map(|i| chunk(i * 100, &format!("chunk number {i}")))
            .collect();

        let mut offsets: Vec<u64> = run(&mut processor, chunks)
            .into_iter()
            .map(|r| r.offset)
            .collect();
        offsets.sort_unstable();
        assert_eq!(offsets, (0..20).map(|i| i * 100).collect::<Vec<_>>());
    }

    #[test]
    fn equal_chunks_get_equal_hashes() {
        let planes = Arc::new(Hyperplanes::generate(64, 32));
        let mut processor = ChunkProcessor::new(4, planes);
        let chunks = (0..8u64).map(|i| chunk(i, "identical content")).collect();

        let hashes: Vec<SimHash> = run(&mut processor, chunks)
            .into_iter()
            .map(|r| r.hash)
            .collect();
        assert_eq!(hashes.len(), 8);
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    }
}
