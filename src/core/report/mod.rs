//! # Report Module
//!
//! Report generation for a completed scan.
//!
//! The report is built once as a value and frozen; the text and JSON
//! renderings both derive from that single value, so the two files can
//! never disagree about the counts. Writing happens after validation has
//! fully completed and before any quarantine move, so every reported path
//! still points at the file's pre-move location.

use crate::core::scanner::SkippedFile;
use crate::core::validator::{FileRecord, FileStatus};
use crate::error::ReportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Counts per terminal status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub healthy: usize,
    pub corrupt: usize,
    pub suspicious: usize,
    pub errors: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: FileStatus) {
        match status {
            FileStatus::Healthy => self.healthy += 1,
            FileStatus::Corrupt => self.corrupt += 1,
            FileStatus::Suspicious => self.suspicious += 1,
            FileStatus::Error => self.errors += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.healthy + self.corrupt + self.suspicious + self.errors
    }
}

/// Aggregate numbers for the scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_files: usize,
    #[serde(flatten)]
    pub counts: StatusCounts,
    /// Files that matched the extension filter but failed the size filter;
    /// accounted for but never validated
    pub size_filtered: usize,
    pub scan_errors: usize,
    pub scan_time: DateTime<Utc>,
    pub duration_ms: u64,
}

/// The complete, immutable scan report.
///
/// `total_files` always equals the sum of the status counts; size-filtered
/// files are accounted separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    /// Per-extension status breakdown, sorted by extension
    pub by_extension: BTreeMap<String, StatusCounts>,
    pub files: Vec<FileRecord>,
    pub size_filtered: Vec<SkippedFile>,
    pub scan_errors: Vec<String>,
}

impl Report {
    pub fn build(
        files: Vec<FileRecord>,
        size_filtered: Vec<SkippedFile>,
        scan_errors: Vec<String>,
        duration_ms: u64,
    ) -> Self {
        let mut counts = StatusCounts::default();
        let mut by_extension: BTreeMap<String, StatusCounts> = BTreeMap::new();
        for record in &files {
            counts.bump(record.status);
            by_extension
                .entry(record.extension.clone())
                .or_default()
                .bump(record.status);
        }

        Self {
            summary: ReportSummary {
                total_files: files.len(),
                counts,
                size_filtered: size_filtered.len(),
                scan_errors: scan_errors.len(),
                scan_time: Utc::now(),
                duration_ms,
            },
            by_extension,
            files,
            size_filtered,
            scan_errors,
        }
    }

    /// Records eligible for quarantine (Corrupt and Suspicious; never
    /// Error, which means "could not determine").
    pub fn flagged(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(|r| r.is_flagged())
    }

    /// Human-readable rendering, mirroring the JSON content.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;

        let _ = writeln!(out, "Damage Scan Report");
        let _ = writeln!(out, "{}", "=".repeat(50));
        let _ = writeln!(out);
        let _ = writeln!(out, "Scan time: {}", s.scan_time.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Duration: {:.1}s", s.duration_ms as f64 / 1000.0);
        let _ = writeln!(out, "Total files checked: {}", s.total_files);
        let _ = writeln!(out, "Healthy: {}", s.counts.healthy);
        let _ = writeln!(out, "Corrupt: {}", s.counts.corrupt);
        let _ = writeln!(out, "Suspicious: {}", s.counts.suspicious);
        let _ = writeln!(out, "Errors (could not determine): {}", s.counts.errors);
        let _ = writeln!(out, "Size-filtered (not checked): {}", s.size_filtered);
        let _ = writeln!(out, "Scan errors: {}", s.scan_errors);
        let _ = writeln!(out);

        if !self.by_extension.is_empty() {
            let _ = writeln!(out, "By extension:");
            for (ext, counts) in &self.by_extension {
                let _ = writeln!(
                    out,
                    "  .{ext}: {} total, {} healthy, {} corrupt, {} suspicious, {} errors",
                    counts.total(),
                    counts.healthy,
                    counts.corrupt,
                    counts.suspicious,
                    counts.errors
                );
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "Flagged files:");
        let _ = writeln!(out, "{}", "-".repeat(50));
        let mut any_flagged = false;
        for record in self.flagged() {
            any_flagged = true;
            let name = record
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let _ = writeln!(out, "File: {name}");
            let _ = writeln!(out, "Path: {}", record.path.display());
            let _ = writeln!(out, "Size: {} bytes", record.size);
            let _ = writeln!(out, "Status: {}", record.status);
            let _ = writeln!(
                out,
                "Details: {}",
                record.reason.as_deref().unwrap_or("-")
            );
            let _ = writeln!(out, "{}", "-".repeat(30));
        }
        if !any_flagged {
            let _ = writeln!(out, "(none)");
        }

        if !self.scan_errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Scan errors:");
            for error in &self.scan_errors {
                let _ = writeln!(out, "  {error}");
            }
        }

        out
    }
}

/// Writes the frozen report to timestamped files in the output directory.
pub struct ReportWriter {
    save_text: bool,
    save_json: bool,
}

impl ReportWriter {
    pub fn new(save_text: bool, save_json: bool) -> Self {
        Self { save_text, save_json }
    }

    /// Write the enabled renderings, returning the paths created.
    pub fn write(&self, report: &Report, output_dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        let timestamp = report.summary.scan_time.format("%Y%m%d_%H%M%S");
        let mut written = Vec::new();

        if self.save_text {
            let path = output_dir.join(format!("damage_report_{timestamp}.txt"));
            std::fs::write(&path, report.render_text()).map_err(|source| {
                ReportError::WriteFailed {
                    path: path.clone(),
                    source,
                }
            })?;
            written.push(path);
        }

        if self.save_json {
            let path = output_dir.join(format!("damage_report_{timestamp}.json"));
            let json = serde_json::to_string_pretty(report).map_err(|e| {
                ReportError::WriteFailed {
                    path: path.clone(),
                    source: std::io::Error::other(e),
                }
            })?;
            std::fs::write(&path, json).map_err(|source| ReportError::WriteFailed {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }

        for path in &written {
            tracing::info!(path = %path.display(), "report written");
        }
        Ok(written)
    }
}
