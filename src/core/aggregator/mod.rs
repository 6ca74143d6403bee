//! # Aggregator Module
//!
//! Collects validation records as batches complete and publishes periodic
//! checkpoints so an interrupted scan never loses finished work.
//!
//! Records are keyed by path; a path is recorded exactly once and its
//! status never changes. On resume, records loaded from a prior checkpoint
//! seed the map and their paths are handed to the scanner for exclusion.
//! Checkpoint write failures are logged and surfaced as events but never
//! abort the scan; the next interval tries again.

mod checkpoint;

pub use checkpoint::{Checkpointer, CHECKPOINT_FILE};

use crate::core::validator::FileRecord;
use crate::events::{CheckpointEvent, Event, EventSender};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

pub struct ResultAggregator {
    records: BTreeMap<PathBuf, FileRecord>,
    checkpointer: Option<Checkpointer>,
    /// Checkpoint after this many newly absorbed records
    save_interval: usize,
    since_save: usize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            checkpointer: None,
            save_interval: 0,
            since_save: 0,
        }
    }

    /// Enable incremental checkpointing every `interval` records.
    pub fn with_checkpointing(mut self, checkpointer: Checkpointer, interval: usize) -> Self {
        self.checkpointer = Some(checkpointer);
        self.save_interval = interval.max(1);
        self
    }

    /// Seed the aggregator with records from a prior run's checkpoint.
    pub fn resume_from(mut self, prior: Vec<FileRecord>) -> Self {
        for record in prior {
            self.records.insert(record.path.clone(), record);
        }
        self
    }

    /// Paths that already have a record; the scanner excludes these so
    /// their content is never re-read on resume.
    pub fn completed_paths(&self) -> HashSet<PathBuf> {
        self.records.keys().cloned().collect()
    }

    /// Absorb one completed batch, checkpointing when the interval is due.
    pub fn absorb(&mut self, batch: Vec<FileRecord>, events: &EventSender) {
        for record in batch {
            // First record wins; statuses are terminal
            if self.records.insert(record.path.clone(), record).is_none() {
                self.since_save += 1;
            }
        }
        if self.checkpointer.is_some() && self.since_save >= self.save_interval {
            self.save_checkpoint(events);
        }
    }

    /// Force a checkpoint regardless of the interval (used at the end of
    /// validation so the final state is always on disk).
    pub fn flush(&mut self, events: &EventSender) {
        if self.checkpointer.is_some() && self.since_save > 0 {
            self.save_checkpoint(events);
        }
    }

    fn save_checkpoint(&mut self, events: &EventSender) {
        let Some(checkpointer) = &self.checkpointer else {
            return;
        };
        match checkpointer.save(&self.records) {
            Ok(()) => {
                self.since_save = 0;
                events.send(Event::Checkpoint(CheckpointEvent::Saved {
                    path: checkpointer.path().to_path_buf(),
                    records: self.records.len(),
                }));
                tracing::debug!(records = self.records.len(), "checkpoint saved");
            }
            Err(e) => {
                events.send(Event::Checkpoint(CheckpointEvent::SaveFailed {
                    message: e.to_string(),
                }));
                tracing::warn!(error = %e, "checkpoint save failed, continuing");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in path order.
    pub fn into_records(self) -> Vec<FileRecord> {
        self.records.into_values().collect()
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}
