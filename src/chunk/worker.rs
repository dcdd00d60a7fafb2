//! Bounded worker pool for CPU-bound chunk jobs.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queue slots per worker; absorbs submission bursts without letting the
/// producer run unboundedly ahead of the workers.
const QUEUE_SLOTS_PER_WORKER: usize = 3;

/// Fixed-size thread pool with a bounded task queue.
///
/// [`submit`](WorkerPool::submit) blocks while the queue is full (or until
/// the pool is cancelled) but never waits for task execution.
/// [`close`](WorkerPool::close) stops acceptance, drains queued tasks, and
/// joins the workers; [`cancel`](WorkerPool::cancel) additionally turns
/// still-queued tasks into no-ops.
pub struct WorkerPool {
    tasks: Option<Sender<Task>>,
    // Dropping this sender is the cancellation signal: every select on
    // `cancel_rx` unblocks at once.
    cancel_tx: Mutex<Option<Sender<()>>>,
    cancel_rx: Receiver<()>,
    cancelled: Arc<AtomicBool>,
    workers: usize,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn a pool of `workers` threads; `0` means one per logical core.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            workers
        };

        let (tasks_tx, tasks_rx) = bounded::<Task>(workers * QUEUE_SLOTS_PER_WORKER);
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let cancelled = Arc::new(AtomicBool::new(false));

        let handles = (0..workers)
            .map(|i| {
                let tasks = tasks_rx.clone();
                let cancel = cancel_rx.clone();
                let flag = Arc::clone(&cancelled);
                std::thread::Builder::new()
                    .name(format!("simdex-worker-{i}"))
                    .spawn(move || worker_loop(tasks, cancel, flag))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            tasks: Some(tasks_tx),
            cancel_tx: Mutex::new(Some(cancel_tx)),
            cancel_rx,
            cancelled,
            workers,
            handles,
        }
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue a task for execution.
    ///
    /// Blocks while the queue is full. Tasks submitted after cancellation
    /// or close are silently dropped.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        if self.cancelled.load(Ordering::Relaxed) {
            return;
        }
        let Some(tasks) = self.tasks.clone() else {
            return;
        };
        let cancel = self.cancel_rx.clone();

        let task: Task = Box::new(task);
        crossbeam_channel::select! {
            send(tasks, task) -> _ => {}
            recv(cancel) -> _ => {}
        }
    }

    /// Signal cancellation: blocked submitters unblock, workers stop at
    /// their next wait point, and queued tasks become no-ops.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        self.cancel_tx.lock().take();
        debug!("worker pool cancelled");
    }

    /// Stop accepting tasks, let workers drain the queue, and join them.
    /// Idempotent.
    pub fn close(&mut self) {
        self.tasks.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(tasks: Receiver<Task>, cancel: Receiver<()>, cancelled: Arc<AtomicBool>) {
    loop {
        crossbeam_channel::select! {
            recv(tasks) -> msg => match msg {
                Ok(task) => {
                    // A task observing cancellation must be a no-op.
                    if !cancelled.load(Ordering::Relaxed) {
                        task();
                    }
                }
                // Channel closed and drained.
                Err(_) => break,
            },
            recv(cancel) -> _ => break,
        }
    }
}
