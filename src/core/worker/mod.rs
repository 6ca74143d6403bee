//! # Worker Module
//!
//! Batch partitioning and the concurrent validation pool.
//!
//! Candidates are processed in fixed-size batches. Each batch gets its own
//! set of scoped worker threads draining a shared job channel, and the
//! calling thread collects exactly one record per job before the scope
//! closes. Cancellation is honored at batch boundaries; a batch that has
//! started always completes.
//!
//! Per-file timeouts use a detached thread per validation: the worker waits
//! on a bounded channel with a deadline, and an overrunning check is simply
//! abandoned (its late result lands in a dropped receiver). The stuck
//! thread costs its stack until the decoder returns, which is the price of
//! never letting one pathological file wedge the whole scan.

use crate::config::Config;
use crate::core::scanner::CandidateFile;
use crate::core::validator::{FileRecord, FileStatus, ValidationDispatcher};
use crate::error::ValidateError;
use crate::events::{Event, EventSender, PipelineEvent, ValidateEvent};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Runs the validation checks for one batch across a bounded set of
/// worker threads.
pub struct WorkerPool {
    dispatcher: Arc<ValidationDispatcher>,
    thread_count: usize,
    timeout: Duration,
    max_memory_bytes: u64,
}

impl WorkerPool {
    pub fn new(config: &Config, dispatcher: Arc<ValidationDispatcher>) -> Self {
        Self {
            dispatcher,
            thread_count: config.thread_count.max(1),
            timeout: config.timeout,
            max_memory_bytes: config.max_memory_usage_mb.saturating_mul(1_000_000),
        }
    }

    /// Worker count for a batch, shrunk when the configured thread count
    /// times the largest file in the batch would blow the memory ceiling.
    /// Validations buffer whole files, so the largest file bounds the
    /// per-worker footprint.
    fn workers_for(&self, batch: &[CandidateFile]) -> usize {
        let base = self.thread_count.min(batch.len()).max(1);
        let largest = batch.iter().map(|c| c.size).max().unwrap_or(0);
        if largest == 0 || self.max_memory_bytes == 0 {
            return base;
        }
        let affordable = (self.max_memory_bytes / largest).max(1) as usize;
        base.min(affordable)
    }

    /// Validate every file in the batch, returning exactly one record per
    /// candidate. Blocks until the batch is fully drained.
    pub fn run_batch(
        &self,
        index: usize,
        batch: &[CandidateFile],
        events: &EventSender,
    ) -> Vec<FileRecord> {
        let workers = self.workers_for(batch);
        events.send(Event::Validate(ValidateEvent::BatchStarted {
            index,
            files: batch.len(),
            workers,
        }));

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<CandidateFile>();
        let (record_tx, record_rx) = crossbeam_channel::unbounded::<FileRecord>();
        for candidate in batch {
            // Unbounded send to a live receiver cannot fail
            let _ = job_tx.send(candidate.clone());
        }
        drop(job_tx);

        let mut records = Vec::with_capacity(batch.len());
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let record_tx = record_tx.clone();
                let dispatcher = &self.dispatcher;
                let timeout = self.timeout;
                scope.spawn(move || {
                    for candidate in job_rx.iter() {
                        let record = validate_with_deadline(dispatcher, &candidate, timeout);
                        if record_tx.send(record).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(record_tx);

            // Collector runs inside the scope so records land in order of
            // completion without any shared locking.
            for record in record_rx.iter() {
                if is_timeout(&record) {
                    events.send(Event::Validate(ValidateEvent::TimedOut {
                        path: record.path.clone(),
                    }));
                    tracing::warn!(path = %record.path.display(), "validation timed out, abandoned");
                } else {
                    events.send(Event::Validate(ValidateEvent::FileChecked {
                        path: record.path.clone(),
                        status: record.status,
                        duration_ms: record.duration_ms,
                    }));
                }
                records.push(record);
            }
        });

        events.send(Event::Validate(ValidateEvent::BatchCompleted {
            index,
            completed: records.len(),
        }));
        records
    }
}

/// Run one validation on its own thread with a hard deadline.
///
/// On timeout the thread is abandoned, not killed; its eventual result goes
/// to a receiver nobody holds.
fn validate_with_deadline(
    dispatcher: &Arc<ValidationDispatcher>,
    candidate: &CandidateFile,
    timeout: Duration,
) -> FileRecord {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let dispatcher = Arc::clone(dispatcher);
    let owned = candidate.clone();
    let spawned = std::thread::Builder::new()
        .name("validate".to_string())
        .spawn(move || {
            let _ = tx.send(dispatcher.validate(&owned));
        });

    if let Err(e) = spawned {
        return error_record(candidate, format!("failed to spawn validation thread: {e}"));
    }

    match rx.recv_timeout(timeout) {
        Ok(record) => record,
        Err(crossbeam_channel::RecvTimeoutError::Timeout) => timeout_record(candidate, timeout),
        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
            error_record(candidate, "validation thread exited without a result".to_string())
        }
    }
}

fn is_timeout(record: &FileRecord) -> bool {
    record.status == FileStatus::Error
        && record.reason.as_deref() == Some(TIMEOUT_REASON)
}

const TIMEOUT_REASON: &str = "timeout";

fn timeout_record(candidate: &CandidateFile, timeout: Duration) -> FileRecord {
    debug_assert_eq!(ValidateError::Timeout.to_string(), TIMEOUT_REASON);
    FileRecord {
        path: candidate.path.clone(),
        size: candidate.size,
        extension: candidate.extension.clone(),
        media_type: candidate.media_type,
        status: FileStatus::Error,
        reason: Some(TIMEOUT_REASON.to_string()),
        duration_ms: timeout.as_millis() as u64,
        checked_at: Utc::now(),
    }
}

fn error_record(candidate: &CandidateFile, reason: String) -> FileRecord {
    FileRecord {
        path: candidate.path.clone(),
        size: candidate.size,
        extension: candidate.extension.clone(),
        media_type: candidate.media_type,
        status: FileStatus::Error,
        reason: Some(reason),
        duration_ms: 0,
        checked_at: Utc::now(),
    }
}

/// Splits the candidate set into batches and runs them through the pool,
/// delivering each batch's records to a sink callback as soon as the batch
/// completes.
pub struct BatchCoordinator {
    pool: WorkerPool,
    batch_size: usize,
    cancel: Arc<AtomicBool>,
}

impl BatchCoordinator {
    pub fn new(
        config: &Config,
        dispatcher: Arc<ValidationDispatcher>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            pool: WorkerPool::new(config, dispatcher),
            batch_size: config.batch_size.max(1),
            cancel,
        }
    }

    /// Process all candidates. Returns how many files were actually checked,
    /// which is less than `candidates.len()` only after a cancellation.
    pub fn run<F>(
        &self,
        candidates: &[CandidateFile],
        events: &EventSender,
        mut on_batch: F,
    ) -> usize
    where
        F: FnMut(Vec<FileRecord>),
    {
        let batch_count = candidates.len().div_ceil(self.batch_size);
        events.send(Event::Validate(ValidateEvent::Started {
            total_files: candidates.len(),
            batches: batch_count,
        }));

        let mut total_checked = 0;
        for (index, batch) in candidates.chunks(self.batch_size).enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                events.send(Event::Pipeline(PipelineEvent::CancelRequested));
                tracing::info!(
                    next_batch = index,
                    checked = total_checked,
                    "cancellation requested, stopping at batch boundary"
                );
                break;
            }
            let records = self.pool.run_batch(index, batch, events);
            total_checked += records.len();
            on_batch(records);
        }

        events.send(Event::Validate(ValidateEvent::Completed { total_checked }));
        total_checked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaType;
    use crate::core::validator::{SampleFrame, VideoHeuristics, VideoProbe, VideoScan};
    use crate::events::{null_sender, EventChannel};
    use std::path::Path;
    use std::path::PathBuf;

    struct SlowProbe(Duration);

    impl VideoProbe for SlowProbe {
        fn probe(
            &self,
            _path: &Path,
            _heuristics: &VideoHeuristics,
        ) -> Result<VideoScan, ValidateError> {
            std::thread::sleep(self.0);
            Ok(healthy_scan())
        }
    }

    fn healthy_scan() -> VideoScan {
        VideoScan {
            width: 640,
            height: 480,
            frame_rate: Some(30.0),
            frame_count: Some(300),
            duration_ms: Some(10_000),
            samples: vec![SampleFrame::readable(640, 480); 3],
        }
    }

    fn video_candidate(name: &str, size: u64) -> CandidateFile {
        CandidateFile {
            path: PathBuf::from(format!("/dump/{name}")),
            size,
            extension: "mp4".to_string(),
            media_type: MediaType::Video,
        }
    }

    fn pool_config(threads: usize, timeout_ms: u64) -> Config {
        Config {
            thread_count: threads,
            timeout: Duration::from_millis(timeout_ms),
            ..Default::default()
        }
    }

    #[test]
    fn every_candidate_gets_exactly_one_record() {
        let dispatcher = Arc::new(
            ValidationDispatcher::new()
                .with_video_probe(Box::new(SlowProbe(Duration::from_millis(1)))),
        );
        let pool = WorkerPool::new(&pool_config(4, 5_000), dispatcher);
        let batch: Vec<_> = (0..17)
            .map(|i| video_candidate(&format!("v{i}.mp4"), 100))
            .collect();

        let records = pool.run_batch(0, &batch, &null_sender());

        assert_eq!(records.len(), batch.len());
        let mut paths: Vec<_> = records.iter().map(|r| r.path.clone()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), batch.len());
    }

    #[test]
    fn overrunning_validation_is_abandoned_with_a_timeout_record() {
        let dispatcher = Arc::new(
            ValidationDispatcher::new()
                .with_video_probe(Box::new(SlowProbe(Duration::from_secs(30)))),
        );
        let pool = WorkerPool::new(&pool_config(2, 50), dispatcher);
        let batch = vec![video_candidate("stuck.mp4", 100)];

        let records = pool.run_batch(0, &batch, &null_sender());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, FileStatus::Error);
        assert_eq!(records[0].reason.as_deref(), Some("timeout"));
    }

    #[test]
    fn memory_ceiling_shrinks_the_worker_count() {
        let config = Config {
            thread_count: 8,
            max_memory_usage_mb: 2_000,
            ..Default::default()
        };
        let pool = WorkerPool::new(&config, Arc::new(ValidationDispatcher::new()));

        // 1 GB files: only two fit under a 2 GB ceiling
        let batch: Vec<_> = (0..8)
            .map(|i| video_candidate(&format!("big{i}.mp4"), 1_000_000_000))
            .collect();
        assert_eq!(pool.workers_for(&batch), 2);

        // Small files keep the full thread count
        let batch: Vec<_> = (0..8)
            .map(|i| video_candidate(&format!("small{i}.mp4"), 1_000))
            .collect();
        assert_eq!(pool.workers_for(&batch), 8);

        // Never below one worker, even for a file above the ceiling
        let batch = vec![video_candidate("huge.mp4", 9_000_000_000)];
        assert_eq!(pool.workers_for(&batch), 1);
    }

    #[test]
    fn coordinator_partitions_into_batches_and_reports_each() {
        let dispatcher = Arc::new(
            ValidationDispatcher::new()
                .with_video_probe(Box::new(SlowProbe(Duration::from_millis(1)))),
        );
        let config = Config {
            batch_size: 4,
            thread_count: 2,
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let coordinator =
            BatchCoordinator::new(&config, dispatcher, Arc::new(AtomicBool::new(false)));
        let candidates: Vec<_> = (0..10)
            .map(|i| video_candidate(&format!("v{i}.mp4"), 100))
            .collect();

        let mut batch_sizes = Vec::new();
        let checked = coordinator.run(&candidates, &null_sender(), |records| {
            batch_sizes.push(records.len());
        });

        assert_eq!(checked, 10);
        assert_eq!(batch_sizes, vec![4, 4, 2]);
    }

    #[test]
    fn cancellation_stops_before_the_next_batch() {
        let dispatcher = Arc::new(
            ValidationDispatcher::new()
                .with_video_probe(Box::new(SlowProbe(Duration::from_millis(1)))),
        );
        let config = Config {
            batch_size: 3,
            thread_count: 2,
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let cancel = Arc::new(AtomicBool::new(false));
        let coordinator = BatchCoordinator::new(&config, dispatcher, Arc::clone(&cancel));
        let candidates: Vec<_> = (0..9)
            .map(|i| video_candidate(&format!("v{i}.mp4"), 100))
            .collect();

        // Cancel after the first batch lands
        let checked = coordinator.run(&candidates, &null_sender(), |_records| {
            cancel.store(true, Ordering::SeqCst);
        });

        assert_eq!(checked, 3);
    }

    #[test]
    fn cancellation_is_announced_before_stopping() {
        let dispatcher = Arc::new(
            ValidationDispatcher::new()
                .with_video_probe(Box::new(SlowProbe(Duration::from_millis(1)))),
        );
        let config = Config {
            batch_size: 3,
            thread_count: 2,
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let cancel = Arc::new(AtomicBool::new(false));
        let coordinator = BatchCoordinator::new(&config, dispatcher, Arc::clone(&cancel));
        let candidates: Vec<_> = (0..6)
            .map(|i| video_candidate(&format!("v{i}.mp4"), 100))
            .collect();

        let (sender, receiver) = EventChannel::new();
        coordinator.run(&candidates, &sender, |_records| {
            cancel.store(true, Ordering::SeqCst);
        });
        drop(sender);

        let events: Vec<_> = receiver.iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Pipeline(PipelineEvent::CancelRequested))));
    }
}
