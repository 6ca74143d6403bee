//! # Validator Module
//!
//! Type-specific integrity checks.
//!
//! Given one candidate, the dispatcher produces a terminal status and a
//! diagnostic reason. The split matters:
//! - **Corrupt** means determined to be unusable (structural or decode
//!   failure)
//! - **Suspicious** means decodable but doubtful (recoverable warnings,
//!   implausible container metadata)
//! - **Error** means could not determine (I/O failure, timeout) - these
//!   files need a manual re-check, never a quarantine move
//!
//! Timeouts are enforced by the worker pool, not here; a validation is free
//! to block on file I/O or decoding for as long as it takes.

mod image;
mod video;

pub use video::{Mp4Probe, SampleFrame, VideoHeuristics, VideoProbe, VideoScan};

use super::scanner::{CandidateFile, MediaType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Terminal status of a validated file, assigned exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Healthy,
    Corrupt,
    Suspicious,
    Error,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Healthy => write!(f, "healthy"),
            FileStatus::Corrupt => write!(f, "corrupt"),
            FileStatus::Suspicious => write!(f, "suspicious"),
            FileStatus::Error => write!(f, "error"),
        }
    }
}

/// Status plus diagnostic reason, before timing is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: FileStatus,
    /// Required for every status except Healthy
    pub reason: Option<String>,
}

impl Verdict {
    pub fn healthy() -> Self {
        Self {
            status: FileStatus::Healthy,
            reason: None,
        }
    }

    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Corrupt,
            reason: Some(reason.into()),
        }
    }

    pub fn suspicious(reason: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Suspicious,
            reason: Some(reason.into()),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Error,
            reason: Some(reason.into()),
        }
    }
}

/// The completed record for one scanned file.
///
/// One record per path; the status never changes once written. Quarantine
/// moves are annotated separately as
/// [`MoveRecord`](crate::core::quarantine::MoveRecord)s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub extension: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Wall time the validation took
    pub duration_ms: u64,
    pub checked_at: DateTime<Utc>,
}

impl FileRecord {
    /// True for statuses eligible for quarantine
    pub fn is_flagged(&self) -> bool {
        matches!(self.status, FileStatus::Corrupt | FileStatus::Suspicious)
    }
}

/// Dispatches a candidate to the check matching its media type.
///
/// Shared across workers behind an `Arc`; holds the video probe capability
/// and the tunable video heuristics.
pub struct ValidationDispatcher {
    video_probe: Box<dyn VideoProbe>,
    heuristics: VideoHeuristics,
}

impl ValidationDispatcher {
    /// Dispatcher with the default MP4 container probe
    pub fn new() -> Self {
        Self {
            video_probe: Box::new(Mp4Probe),
            heuristics: VideoHeuristics::default(),
        }
    }

    /// Replace the video probe (tests use stubs; a build with a richer
    /// decoder can slot one in here)
    pub fn with_video_probe(mut self, probe: Box<dyn VideoProbe>) -> Self {
        self.video_probe = probe;
        self
    }

    pub fn with_heuristics(mut self, heuristics: VideoHeuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Run the type-specific check and build the file's record.
    pub fn validate(&self, candidate: &CandidateFile) -> FileRecord {
        let started = Instant::now();
        let verdict = match candidate.media_type {
            MediaType::Image => image::check_image(&candidate.path),
            MediaType::Video => {
                video::check_video(&candidate.path, self.video_probe.as_ref(), &self.heuristics)
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            path = %candidate.path.display(),
            status = %verdict.status,
            duration_ms,
            "validated"
        );

        FileRecord {
            path: candidate.path.clone(),
            size: candidate.size,
            extension: candidate.extension.clone(),
            media_type: candidate.media_type,
            status: verdict.status,
            reason: verdict.reason,
            duration_ms,
            checked_at: Utc::now(),
        }
    }
}

impl Default for ValidationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidateError;
    use std::path::Path;

    struct StubProbe(VideoScan);

    impl VideoProbe for StubProbe {
        fn probe(
            &self,
            _path: &Path,
            _heuristics: &VideoHeuristics,
        ) -> Result<VideoScan, ValidateError> {
            Ok(self.0.clone())
        }
    }

    fn candidate(path: &str, media_type: MediaType) -> CandidateFile {
        CandidateFile {
            path: PathBuf::from(path),
            size: 1234,
            extension: "mp4".to_string(),
            media_type,
        }
    }

    #[test]
    fn dispatcher_routes_videos_to_the_probe() {
        let scan = VideoScan {
            width: 640,
            height: 480,
            frame_rate: Some(30.0),
            frame_count: Some(300),
            duration_ms: Some(10_000),
            samples: vec![SampleFrame::readable(640, 480); 3],
        };
        let dispatcher = ValidationDispatcher::new().with_video_probe(Box::new(StubProbe(scan)));
        let record = dispatcher.validate(&candidate("/dump/ok.mp4", MediaType::Video));
        assert_eq!(record.status, FileStatus::Healthy);
        assert!(record.reason.is_none());
    }

    #[test]
    fn missing_image_is_an_error_not_corrupt() {
        let dispatcher = ValidationDispatcher::new();
        let record = dispatcher.validate(&candidate("/nonexistent/x.jpg", MediaType::Image));
        assert_eq!(record.status, FileStatus::Error);
        assert!(record.reason.is_some());
    }

    #[test]
    fn flagged_covers_corrupt_and_suspicious_only() {
        let mut record = FileRecord {
            path: PathBuf::from("/dump/a.jpg"),
            size: 1,
            extension: "jpg".to_string(),
            media_type: MediaType::Image,
            status: FileStatus::Healthy,
            reason: None,
            duration_ms: 0,
            checked_at: Utc::now(),
        };
        assert!(!record.is_flagged());
        record.status = FileStatus::Corrupt;
        assert!(record.is_flagged());
        record.status = FileStatus::Suspicious;
        assert!(record.is_flagged());
        record.status = FileStatus::Error;
        assert!(!record.is_flagged());
    }
}
