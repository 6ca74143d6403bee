//! # Quarantine Module
//!
//! Relocates flagged files into the quarantine folder after the report is
//! written, so every reported path still names the pre-move location.
//!
//! Moves prefer a rename and fall back to copy + size verification +
//! delete when the quarantine folder sits on a different filesystem. A
//! failed verification keeps the source untouched. Name collisions are
//! disambiguated with a numeric suffix; nothing in the quarantine folder
//! is ever overwritten.

use crate::config::Config;
use crate::core::validator::{FileRecord, FileStatus};
use crate::error::MoveError;
use crate::events::{Event, EventSender, QuarantineEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one flagged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveOutcome {
    /// Relocated to the recorded destination
    Moved,
    /// Left in place (source vanished between report and move)
    Skipped,
    /// The move failed; the source is untouched
    Failed,
}

/// One attempted quarantine move
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub from: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<PathBuf>,
    pub status: FileStatus,
    pub outcome: MoveOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Result of the whole quarantine phase
#[derive(Debug, Default)]
pub struct QuarantineResult {
    pub records: Vec<MoveRecord>,
    pub moved: usize,
    pub failed: usize,
    /// Path of the move report, when one was written
    pub report_path: Option<PathBuf>,
}

/// Moves flagged files into the quarantine folder.
pub struct Quarantine {
    folder: PathBuf,
    create_subfolders: bool,
}

impl Quarantine {
    pub fn new(config: &Config) -> Self {
        Self {
            folder: config.quarantine_folder(),
            create_subfolders: config.create_subfolders,
        }
    }

    /// Move every flagged record, then write the move report next to the
    /// quarantine folder. Individual failures are recorded and the
    /// remaining moves continue.
    pub fn run(
        &self,
        flagged: &[&FileRecord],
        output_dir: &Path,
        events: &EventSender,
    ) -> Result<QuarantineResult, MoveError> {
        events.send(Event::Quarantine(QuarantineEvent::Started {
            eligible: flagged.len(),
        }));

        let mut result = QuarantineResult::default();
        for record in flagged {
            let move_record = self.move_one(record);
            match move_record.outcome {
                MoveOutcome::Moved => {
                    result.moved += 1;
                    events.send(Event::Quarantine(QuarantineEvent::FileMoved {
                        from: move_record.from.clone(),
                        to: move_record.to.clone().unwrap_or_default(),
                    }));
                }
                MoveOutcome::Failed => {
                    result.failed += 1;
                    events.send(Event::Quarantine(QuarantineEvent::MoveFailed {
                        path: move_record.from.clone(),
                        message: move_record.detail.clone().unwrap_or_default(),
                    }));
                }
                MoveOutcome::Skipped => {
                    events.send(Event::Quarantine(QuarantineEvent::FileSkipped {
                        path: move_record.from.clone(),
                        message: move_record.detail.clone().unwrap_or_default(),
                    }));
                }
            }
            result.records.push(move_record);
        }

        result.report_path = Some(self.write_move_report(&result, output_dir)?);

        events.send(Event::Quarantine(QuarantineEvent::Completed {
            moved: result.moved,
            failed: result.failed,
        }));
        tracing::info!(
            moved = result.moved,
            failed = result.failed,
            "quarantine finished"
        );
        Ok(result)
    }

    fn move_one(&self, record: &FileRecord) -> MoveRecord {
        let from = record.path.clone();

        if !from.exists() {
            return MoveRecord {
                from,
                to: None,
                status: record.status,
                outcome: MoveOutcome::Skipped,
                detail: Some("source file no longer exists".to_string()),
            };
        }

        let dest_folder = if self.create_subfolders {
            self.folder.join(record.media_type.folder_name())
        } else {
            self.folder.clone()
        };
        if let Err(e) = fs::create_dir_all(&dest_folder) {
            return MoveRecord {
                from: from.clone(),
                to: None,
                status: record.status,
                outcome: MoveOutcome::Failed,
                detail: Some(
                    MoveError::CreateFolder {
                        path: dest_folder,
                        source: e,
                    }
                    .to_string(),
                ),
            };
        }

        let to = unique_destination(&dest_folder, &from);
        match move_file(&from, &to) {
            Ok(()) => MoveRecord {
                from,
                to: Some(to),
                status: record.status,
                outcome: MoveOutcome::Moved,
                detail: record.reason.clone(),
            },
            Err(e) => MoveRecord {
                from: from.clone(),
                to: Some(to.clone()),
                status: record.status,
                outcome: MoveOutcome::Failed,
                detail: Some(
                    MoveError::MoveFailed {
                        from,
                        to,
                        source: e,
                    }
                    .to_string(),
                ),
            },
        }
    }

    fn write_move_report(
        &self,
        result: &QuarantineResult,
        output_dir: &Path,
    ) -> Result<PathBuf, MoveError> {
        let timestamp: DateTime<Utc> = Utc::now();
        let path = output_dir.join(format!(
            "move_report_{}.txt",
            timestamp.format("%Y%m%d_%H%M%S")
        ));

        let mut out = String::new();
        let _ = writeln!(out, "Quarantine Move Report");
        let _ = writeln!(out, "{}", "=".repeat(40));
        let _ = writeln!(out);
        let _ = writeln!(out, "Move time: {}", timestamp.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Files moved: {}", result.moved);
        let _ = writeln!(out, "Failed moves: {}", result.failed);
        let _ = writeln!(out);

        let moved: Vec<_> = result
            .records
            .iter()
            .filter(|r| r.outcome == MoveOutcome::Moved)
            .collect();
        if !moved.is_empty() {
            let _ = writeln!(out, "Moved files:");
            let _ = writeln!(out, "{}", "-".repeat(30));
            for record in moved {
                let to = record.to.as_deref().unwrap_or_else(|| Path::new("-"));
                let name = to
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let _ = writeln!(out, "File: {name}");
                let _ = writeln!(out, "New path: {}", to.display());
                let _ = writeln!(out, "Status: {}", record.status);
                let _ = writeln!(out, "Details: {}", record.detail.as_deref().unwrap_or("-"));
                let _ = writeln!(out, "{}", "-".repeat(20));
            }
        }

        let not_moved: Vec<_> = result
            .records
            .iter()
            .filter(|r| r.outcome != MoveOutcome::Moved)
            .collect();
        if !not_moved.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Failed moves:");
            let _ = writeln!(out, "{}", "-".repeat(30));
            for record in not_moved {
                let _ = writeln!(out, "File: {}", record.from.display());
                let _ = writeln!(out, "Error: {}", record.detail.as_deref().unwrap_or("-"));
                let _ = writeln!(out, "{}", "-".repeat(20));
            }
        }

        fs::write(&path, out).map_err(|source| MoveError::ReportFailed {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// First destination name that does not already exist:
/// `name.ext`, then `name (1).ext`, `name (2).ext`.
fn unique_destination(dest_folder: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned());

    let with_name = |name: &str| -> PathBuf {
        match &ext {
            Some(ext) => dest_folder.join(format!("{name}.{ext}")),
            None => dest_folder.join(name),
        }
    };

    let mut candidate = with_name(&stem);
    let mut counter = 1;
    while candidate.exists() {
        candidate = with_name(&format!("{stem} ({counter})"));
        counter += 1;
    }
    candidate
}

/// Rename, or fall back to copy + size verification + delete for moves
/// across filesystems. An incomplete copy is removed and the source kept.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::rename(from, to).or_else(|_| {
        let source_size = fs::metadata(from)?.len();
        fs::copy(from, to)?;

        let dest_size = fs::metadata(to)?.len();
        if dest_size != source_size {
            let _ = fs::remove_file(to);
            return Err(std::io::Error::other(format!(
                "copy verification failed: source {source_size} bytes, dest {dest_size} bytes"
            )));
        }

        fs::remove_file(from)
    })
}
