use parking_lot::{Condvar, Mutex};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::event_index::{BaseEventIndex, EventTuple};
use crate::index::posting::PostingList;
use crate::index::snapshot;
use crate::index::{DocId, ExpireTime, TermId, Weight};

/// Cooperative stop signal for the maintenance worker
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

struct MaintainWorker {
    signal: Arc<StopSignal>,
    handle: thread::JoinHandle<()>,
}

/// Owns a [`BaseEventIndex`] and drives its periodic maintenance:
/// a background worker that expires due postings and commits the staged
/// changeset on every tick. Also the snapshot dump/restore entry point.
pub struct DocumentIndexManager {
    index: Arc<BaseEventIndex>,
    maintain: Mutex<Option<MaintainWorker>>,
}

impl DocumentIndexManager {
    pub fn new(initial_buckets: usize, max_size: usize) -> Self {
        Self {
            index: Arc::new(BaseEventIndex::new(initial_buckets, max_size)),
            maintain: Mutex::new(None),
        }
    }

    /// Restore from `<prefix>.snapshot`. Any I/O or decode failure is
    /// returned; the caller decides whether to start empty instead.
    pub fn restore(initial_buckets: usize, max_size: usize, prefix: &str) -> Result<Self> {
        let path = Self::snapshot_path(prefix);
        let file = File::open(&path)?;
        let data = snapshot::read_snapshot(BufReader::new(file))?;
        info!(
            path = %path.display(),
            postings = data.posting_count(),
            expires = data.expires.len(),
            "restored index from snapshot"
        );
        Ok(Self {
            index: Arc::new(BaseEventIndex::from_snapshot(
                initial_buckets,
                max_size,
                data,
            )),
            maintain: Mutex::new(None),
        })
    }

    /// Snapshot file for a configured prefix
    pub fn snapshot_path(prefix: &str) -> PathBuf {
        PathBuf::from(format!("{prefix}.snapshot"))
    }

    /// Spawn the maintenance worker. The tick is the smaller of the two
    /// intervals; each tick runs one `apply` at the current wall clock.
    pub fn start_maintain(&self, update_interval_s: u64, expire_interval_s: u64) {
        let mut maintain = self.maintain.lock();
        if maintain.is_some() {
            return;
        }

        let tick = Duration::from_secs(update_interval_s.min(expire_interval_s).max(1));
        let signal = Arc::new(StopSignal::default());
        let worker_signal = signal.clone();
        let index = self.index.clone();

        let handle = thread::spawn(move || {
            debug!(tick_secs = tick.as_secs(), "index maintenance started");
            let mut stopped = worker_signal.stopped.lock();
            loop {
                worker_signal.condvar.wait_for(&mut stopped, tick);
                if *stopped {
                    break;
                }
                let now = unix_now();
                let (applied, expired) = index.apply(now);
                if applied > 0 || expired > 0 {
                    debug!(applied, expired, now, "maintenance tick");
                }
            }
            debug!("index maintenance stopped");
        });

        *maintain = Some(MaintainWorker { signal, handle });
    }

    /// Signal the worker and join it. Calling again is a no-op.
    pub fn stop_maintain(&self) {
        let worker = self.maintain.lock().take();
        if let Some(worker) = worker {
            *worker.signal.stopped.lock() = true;
            worker.signal.condvar.notify_all();
            if worker.handle.join().is_err() {
                warn!("index maintenance worker panicked");
            }
        }
    }

    /// Dump the applied state to `<prefix>.snapshot`
    pub fn dump(&self, prefix: &str) -> Result<u64> {
        let path = Self::snapshot_path(prefix);
        let file = File::create(&path)?;
        let bytes = self.index.dump(BufWriter::new(file))?;
        info!(path = %path.display(), bytes, "dumped index snapshot");
        Ok(bytes)
    }

    pub fn update(
        &self,
        doc_id: DocId,
        term_id: TermId,
        weight: Weight,
        expire_time: ExpireTime,
    ) -> usize {
        self.index.update(doc_id, term_id, weight, expire_time)
    }

    pub fn batch_update(&self, batch: &[EventTuple]) -> usize {
        self.index.batch_update(batch)
    }

    /// Run one maintenance pass immediately (tests and snapshot handler)
    pub fn apply(&self, now: ExpireTime) -> (usize, usize) {
        self.index.apply(now)
    }

    pub fn posting(&self, term_id: TermId) -> Option<Arc<PostingList>> {
        self.index.posting(term_id)
    }

    pub fn size(&self) -> usize {
        self.index.size()
    }

    pub fn term_count(&self) -> usize {
        self.index.term_count()
    }

    pub fn expire_table_size(&self) -> usize {
        self.index.expire_table_size()
    }
}

impl Drop for DocumentIndexManager {
    fn drop(&mut self) {
        self.stop_maintain();
    }
}

/// Wall clock in whole seconds since the epoch
pub fn unix_now() -> ExpireTime {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as ExpireTime
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_apply_query() {
        let manager = DocumentIndexManager::new(16, 100);
        manager.update(10, 7, 0.5, unix_now() + 60);
        assert!(manager.posting(7).is_none());

        manager.apply(unix_now());
        assert_eq!(manager.posting(7).unwrap().get(10), Some(0.5));
        assert_eq!(manager.size(), 1);
        assert_eq!(manager.expire_table_size(), 1);
    }

    #[test]
    fn test_stop_maintain_is_idempotent() {
        let manager = DocumentIndexManager::new(16, 100);
        manager.start_maintain(1, 1);
        manager.stop_maintain();
        manager.stop_maintain();
    }

    #[test]
    fn test_start_maintain_twice_keeps_one_worker() {
        let manager = DocumentIndexManager::new(16, 100);
        manager.start_maintain(1, 1);
        manager.start_maintain(1, 1);
        manager.stop_maintain();
    }

    #[test]
    fn test_restore_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent").to_string_lossy().into_owned();
        assert!(DocumentIndexManager::restore(16, 100, &prefix).is_err());
    }

    #[test]
    fn test_dump_restore_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("snap").to_string_lossy().into_owned();

        let manager = DocumentIndexManager::new(16, 100);
        manager.update(10, 7, 0.5, 100);
        manager.update(11, 7, 0.6, 200);
        manager.update(3, 9, 1.5, 300);
        manager.apply(0);
        manager.dump(&prefix).unwrap();

        let restored = DocumentIndexManager::restore(16, 100, &prefix).unwrap();
        assert_eq!(restored.size(), 3);
        assert_eq!(restored.expire_table_size(), 3);
        assert_eq!(restored.posting(7).unwrap().get(11), Some(0.6));
        assert_eq!(restored.posting(9).unwrap().get(3), Some(1.5));
    }
}
