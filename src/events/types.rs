//! Event type definitions for progress reporting.

use crate::core::validator::FileStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the damage detection pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning phase events
    Scan(ScanEvent),
    /// Validation phase events
    Validate(ValidateEvent),
    /// Checkpoint persistence events
    Checkpoint(CheckpointEvent),
    /// Quarantine phase events
    Quarantine(QuarantineEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// A candidate media file was found
    CandidateFound { path: PathBuf },
    /// A file matched the extension filter but failed the size filter
    SizeFiltered { path: PathBuf, size: u64 },
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed {
        candidates: usize,
        size_filtered: usize,
        resumed: usize,
    },
}

/// Events during the validation phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ValidateEvent {
    /// Validation has started
    Started { total_files: usize, batches: usize },
    /// A batch was picked up for processing
    BatchStarted {
        index: usize,
        files: usize,
        workers: usize,
    },
    /// A file received its terminal status
    FileChecked {
        path: PathBuf,
        status: FileStatus,
        duration_ms: u64,
    },
    /// A validation exceeded its deadline and was abandoned
    TimedOut { path: PathBuf },
    /// A batch finished (all of its files have records)
    BatchCompleted { index: usize, completed: usize },
    /// Validation completed
    Completed { total_checked: usize },
}

/// Events around checkpoint persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CheckpointEvent {
    /// A checkpoint snapshot was published
    Saved { path: PathBuf, records: usize },
    /// A prior checkpoint was loaded for resume
    Loaded { path: PathBuf, records: usize },
    /// A checkpoint write failed (non-fatal, the scan continues)
    SaveFailed { message: String },
}

/// Events during the quarantine phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QuarantineEvent {
    /// The move phase has started
    Started { eligible: usize },
    /// A file was relocated
    FileMoved { from: PathBuf, to: PathBuf },
    /// A file was left in place with nothing to move (the source vanished
    /// between report and quarantine)
    FileSkipped { path: PathBuf, message: String },
    /// A move failed (recorded, remaining moves continue)
    MoveFailed { path: PathBuf, message: String },
    /// The move phase completed
    Completed { moved: usize, failed: usize },
}

/// High-level pipeline events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// The pipeline has started
    Started,
    /// The pipeline moved to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Cancellation was requested; the pipeline will stop at the next
    /// batch boundary
    CancelRequested,
    /// The pipeline completed
    Completed { summary: PipelineSummary },
}

/// Phases of the pipeline, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Validating,
    Reporting,
    Quarantining,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Validating => write!(f, "Validating"),
            PipelinePhase::Reporting => write!(f, "Reporting"),
            PipelinePhase::Quarantining => write!(f, "Quarantining"),
        }
    }
}

/// Final counts for a completed pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub total_files: usize,
    pub healthy: usize,
    pub corrupt: usize,
    pub suspicious: usize,
    pub errors: usize,
    pub size_filtered: usize,
    pub moved: usize,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display_is_human_readable() {
        assert_eq!(PipelinePhase::Validating.to_string(), "Validating");
        assert_eq!(PipelinePhase::Quarantining.to_string(), "Quarantining");
    }

    #[test]
    fn events_serialize_to_json() {
        let event = Event::Validate(ValidateEvent::TimedOut {
            path: PathBuf::from("/dump/slow.mp4"),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("TimedOut"));
        assert!(json.contains("slow.mp4"));
    }
}
