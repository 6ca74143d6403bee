//! Atomic checkpoint persistence.
//!
//! The checkpoint is a single JSON file at a stable name in the output
//! directory. Every save writes a complete snapshot to a temp file in the
//! same directory and renames it over the old one, so a crash mid-write
//! leaves the previous checkpoint intact. A reader never observes a
//! partial file.

use crate::core::validator::FileRecord;
use crate::error::CheckpointError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stable checkpoint filename inside the output directory
pub const CHECKPOINT_FILE: &str = "checkpoint.json";

const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointSnapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    records: Vec<FileRecord>,
}

/// Writes and reads checkpoint snapshots for one output directory.
pub struct Checkpointer {
    path: PathBuf,
}

impl Checkpointer {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(CHECKPOINT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a full snapshot atomically (temp file + rename).
    pub fn save(&self, records: &BTreeMap<PathBuf, FileRecord>) -> Result<(), CheckpointError> {
        let snapshot = CheckpointSnapshot {
            version: CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            records: records.values().cloned().collect(),
        };

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(parent).map_err(|e| CheckpointError::WriteFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        serde_json::to_writer_pretty(&mut temp, &snapshot).map_err(|e| {
            CheckpointError::WriteFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        temp.flush().map_err(|e| CheckpointError::WriteFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        temp.persist(&self.path)
            .map_err(|e| CheckpointError::WriteFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// True when a checkpoint exists to resume from.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load a prior snapshot's records. A missing checkpoint is an empty
    /// resume, not an error; a malformed one is reported so the operator
    /// can decide whether to delete it.
    pub fn load(&self) -> Result<Vec<FileRecord>, CheckpointError> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&self.path).map_err(|e| CheckpointError::ReadFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let snapshot: CheckpointSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| CheckpointError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(snapshot.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaType;
    use crate::core::validator::FileStatus;
    use tempfile::TempDir;

    fn record(path: &str, status: FileStatus) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            size: 100,
            extension: "jpg".to_string(),
            media_type: MediaType::Image,
            status,
            reason: None,
            duration_ms: 5,
            checked_at: Utc::now(),
        }
    }

    fn map_of(records: Vec<FileRecord>) -> BTreeMap<PathBuf, FileRecord> {
        records.into_iter().map(|r| (r.path.clone(), r)).collect()
    }

    #[test]
    fn save_then_load_round_trips_records() {
        let dir = TempDir::new().unwrap();
        let checkpointer = Checkpointer::new(dir.path());
        let records = map_of(vec![
            record("/dump/a.jpg", FileStatus::Healthy),
            record("/dump/b.jpg", FileStatus::Corrupt),
        ]);

        checkpointer.save(&records).unwrap();
        let loaded = checkpointer.load().unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].path, PathBuf::from("/dump/a.jpg"));
        assert_eq!(loaded[1].status, FileStatus::Corrupt);
    }

    #[test]
    fn checkpoint_filename_is_stable_across_saves() {
        let dir = TempDir::new().unwrap();
        let checkpointer = Checkpointer::new(dir.path());
        checkpointer
            .save(&map_of(vec![record("/dump/a.jpg", FileStatus::Healthy)]))
            .unwrap();
        checkpointer
            .save(&map_of(vec![
                record("/dump/a.jpg", FileStatus::Healthy),
                record("/dump/b.jpg", FileStatus::Healthy),
            ]))
            .unwrap();

        // One file, latest content, no leftover temp files
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], CHECKPOINT_FILE);
        assert_eq!(checkpointer.load().unwrap().len(), 2);
    }

    #[test]
    fn missing_checkpoint_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let checkpointer = Checkpointer::new(dir.path());
        assert!(!checkpointer.exists());
        assert!(checkpointer.load().unwrap().is_empty());
    }

    #[test]
    fn malformed_checkpoint_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CHECKPOINT_FILE), b"{not json").unwrap();
        let checkpointer = Checkpointer::new(dir.path());
        assert!(matches!(
            checkpointer.load(),
            Err(CheckpointError::ReadFailed { .. })
        ));
    }
}
