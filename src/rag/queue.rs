//! Bounded ingest queue.
//!
//! Upload jobs are scheduled on a bounded mpsc channel consumed by a fixed
//! pool of worker tasks, so a burst of uploads produces an explicit
//! queue-full error instead of unbounded spawned tasks. In-flight upload
//! ids and the pending depth are queryable. Jobs are never cancelled; a
//! dequeued job always runs to a terminal upload status.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::ingest::IngestPipeline;
use crate::core::errors::ApiError;

pub struct IngestJob {
    pub upload_id: i64,
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<IngestJob>,
    pending: Arc<AtomicUsize>,
    in_flight: Arc<Mutex<HashSet<i64>>>,
}

impl IngestQueue {
    /// Starts `workers` consumer tasks over a channel of `capacity` slots.
    pub fn start(pipeline: Arc<IngestPipeline>, capacity: usize, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<IngestJob>(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let pending = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(Mutex::new(HashSet::new()));

        for worker_id in 0..workers {
            let rx = rx.clone();
            let pipeline = pipeline.clone();
            let pending = pending.clone();
            let in_flight = in_flight.clone();

            tokio::spawn(async move {
                loop {
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else {
                        break;
                    };

                    pending.fetch_sub(1, Ordering::SeqCst);
                    if let Ok(mut set) = in_flight.lock() {
                        set.insert(job.upload_id);
                    }

                    tracing::debug!(
                        "Worker {} picked up upload {} ({})",
                        worker_id,
                        job.upload_id,
                        job.filename
                    );
                    pipeline.run(job.upload_id, &job.filename, job.bytes).await;

                    if let Ok(mut set) = in_flight.lock() {
                        set.remove(&job.upload_id);
                    }
                }
            });
        }

        Self {
            tx,
            pending,
            in_flight,
        }
    }

    /// Schedules a job without waiting. A full queue is reported to the
    /// caller instead of blocking the request.
    pub fn enqueue(&self, job: IngestJob) -> Result<(), ApiError> {
        // Incremented before the send so a worker picking the job up
        // immediately cannot decrement past zero.
        self.pending.fetch_add(1, Ordering::SeqCst);
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                match err {
                    TrySendError::Full(_) => Err(ApiError::ServiceUnavailable(
                        "ingest queue is full".to_string(),
                    )),
                    TrySendError::Closed(_) => Err(ApiError::ServiceUnavailable(
                        "ingest workers are not running".to_string(),
                    )),
                }
            }
        }
    }

    /// Jobs accepted but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Upload ids currently being processed.
    pub fn in_flight(&self) -> Vec<i64> {
        self.in_flight
            .lock()
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}
