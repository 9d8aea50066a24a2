//! Bounded-queue document update pipeline.
//!
//! Parsed documents are fanned out to a fixed pool of worker threads; each
//! worker turns one document into its per-term event tuples and delivers
//! them to the index in a single `batch_update`, so a document's postings
//! always land in one changeset commit.

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace, warn};

use crate::error::{MagnetarError, Result};
use crate::index::{DocumentIndexManager, EventTuple};
use crate::metrics::IndexMetrics;
use crate::model::FeedDocument;

struct PipelineState {
    tx: Option<Sender<FeedDocument>>,
    workers: Vec<thread::JoinHandle<()>>,
}

/// Worker pool feeding the index from a bounded queue.
///
/// `submit` blocks when the queue is full; nothing is dropped silently.
pub struct DocumentUpdatePipeline {
    index: Arc<DocumentIndexManager>,
    metrics: Arc<IndexMetrics>,
    thread_num: usize,
    queue_size: usize,
    state: Mutex<PipelineState>,
}

impl DocumentUpdatePipeline {
    pub fn new(
        thread_num: usize,
        queue_size: usize,
        index: Arc<DocumentIndexManager>,
        metrics: Arc<IndexMetrics>,
    ) -> Self {
        Self {
            index,
            metrics,
            thread_num: thread_num.max(1),
            queue_size: queue_size.max(1),
            state: Mutex::new(PipelineState {
                tx: None,
                workers: Vec::new(),
            }),
        }
    }

    /// Spawn the worker pool. Calling again while running is a no-op.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.tx.is_some() {
            return;
        }

        let (tx, rx) = bounded::<FeedDocument>(self.queue_size);
        for worker_id in 0..self.thread_num {
            let rx = rx.clone();
            let index = self.index.clone();
            let metrics = self.metrics.clone();
            state.workers.push(thread::spawn(move || {
                worker_loop(worker_id, rx, index, metrics);
            }));
        }
        state.tx = Some(tx);
        debug!(
            threads = self.thread_num,
            queue_size = self.queue_size,
            "update pipeline started"
        );
    }

    /// Enqueue one document, blocking while the queue is full.
    /// Rejected once the pipeline has been stopped.
    pub fn submit(&self, document: FeedDocument) -> Result<()> {
        let tx = self
            .state
            .lock()
            .tx
            .clone()
            .ok_or(MagnetarError::PipelineClosed)?;
        // Block outside the state lock so stop() cannot deadlock behind a
        // full queue.
        tx.send(document)
            .map_err(|_| MagnetarError::PipelineClosed)?;
        trace!(queue_depth = tx.len(), "document enqueued");
        self.metrics.set_queue_depth(tx.len());
        Ok(())
    }

    /// Documents currently waiting in the queue
    pub fn queue_depth(&self) -> usize {
        self.state
            .lock()
            .tx
            .as_ref()
            .map(|tx| tx.len())
            .unwrap_or(0)
    }

    /// Close the queue, let the workers drain it, and join them.
    /// Calling again is a no-op.
    pub fn stop(&self) {
        let (tx, workers) = {
            let mut state = self.state.lock();
            (state.tx.take(), std::mem::take(&mut state.workers))
        };
        // Dropping the sender closes the channel; workers exit after
        // draining whatever is still queued.
        drop(tx);
        for worker in workers {
            if worker.join().is_err() {
                warn!("update pipeline worker panicked");
            }
        }
        debug!("update pipeline stopped");
    }
}

impl Drop for DocumentUpdatePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<FeedDocument>,
    index: Arc<DocumentIndexManager>,
    metrics: Arc<IndexMetrics>,
) {
    debug!(worker_id, "pipeline worker started");
    while let Ok(document) = rx.recv() {
        let tuples: Vec<EventTuple> = document
            .terms
            .iter()
            .map(|&(term_id, weight)| EventTuple {
                doc_id: document.doc_id,
                term_id,
                weight,
                expire_time: document.expire_time,
            })
            .collect();
        let staged = index.batch_update(&tuples);
        metrics.record_feed(staged);
        trace!(
            worker_id,
            doc_id = document.doc_id,
            events = tuples.len(),
            staged,
            "document staged"
        );
    }
    debug!(worker_id, "pipeline worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pipeline(threads: usize, queue: usize) -> DocumentUpdatePipeline {
        let index = Arc::new(DocumentIndexManager::new(16, 1000));
        let metrics = Arc::new(IndexMetrics::default());
        DocumentUpdatePipeline::new(threads, queue, index.clone(), metrics)
    }

    fn doc(doc_id: u64, terms: &[(u64, f32)]) -> FeedDocument {
        FeedDocument {
            doc_id,
            terms: terms.to_vec(),
            expire_time: 1_000,
        }
    }

    #[test]
    fn test_submit_before_start_is_rejected() {
        let pipeline = test_pipeline(2, 4);
        assert!(matches!(
            pipeline.submit(doc(1, &[(7, 0.5)])),
            Err(MagnetarError::PipelineClosed)
        ));
    }

    #[test]
    fn test_stop_drains_queue() {
        let index = Arc::new(DocumentIndexManager::new(16, 1000));
        let metrics = Arc::new(IndexMetrics::default());
        let pipeline =
            DocumentUpdatePipeline::new(2, 64, index.clone(), metrics);
        pipeline.start();

        for doc_id in 1..=20 {
            pipeline.submit(doc(doc_id, &[(7, 0.5), (9, 0.25)])).unwrap();
        }
        pipeline.stop();

        // Every submitted document was staged before the workers exited.
        index.apply(0);
        assert_eq!(index.posting(7).unwrap().len(), 20);
        assert_eq!(index.posting(9).unwrap().len(), 20);
    }

    #[test]
    fn test_submit_after_stop_is_rejected() {
        let pipeline = test_pipeline(1, 4);
        pipeline.start();
        pipeline.stop();
        assert!(matches!(
            pipeline.submit(doc(1, &[(7, 0.5)])),
            Err(MagnetarError::PipelineClosed)
        ));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let pipeline = test_pipeline(1, 4);
        pipeline.start();
        pipeline.stop();
        pipeline.stop();
    }
}
