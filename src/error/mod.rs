//! # Error Module
//!
//! Error types for the damage scanner.
//!
//! ## Design Principles
//! - **Per-file failures never abort the scan** - they become a status on the
//!   file's record (Corrupt, Suspicious, or Error) and the scan continues
//! - **Only configuration/startup failures are fatal**
//! - **Include context** - paths, file names, what went wrong
//! - **Nothing is swallowed silently** - every failure ends up in the report
//!   or the log

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum DamageScanError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Report generation error: {0}")]
    Report(#[from] ReportError),

    #[error("Quarantine error: {0}")]
    Quarantine(#[from] MoveError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Fatal configuration problems, detected before scanning begins
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("INPUT_DIRECTORY is not set (pass a scan root or set it in the environment)")]
    MissingInputDirectory,

    #[error("OUTPUT_DIRECTORY is not set")]
    MissingOutputDirectory,

    #[error("Input directory does not exist: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Input path is not a directory: {path}")]
    InputNotADirectory { path: PathBuf },

    #[error("Failed to create output directory {path}: {source}")]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors that occur while walking the input directory (non-fatal,
/// collected and reported)
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Validation failures for a single file.
///
/// These map onto a terminal [`FileStatus`](crate::core::validator::FileStatus):
/// decode failures mean Corrupt, tolerated metadata anomalies mean
/// Suspicious, and I/O or timeout failures mean Error ("could not
/// determine"), never Corrupt ("determined to be bad").
#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("Structural check failed: {reason}")]
    Structure { reason: String },

    #[error("Decode failed: {reason}")]
    Decode { reason: String },

    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timeout")]
    Timeout,
}

/// Errors that occur while persisting or loading a checkpoint
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Failed to write checkpoint to {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("Failed to read checkpoint at {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },
}

/// Errors that occur during report generation
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A failed quarantine move for one file (recorded, does not abort
/// the remaining moves)
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Source file no longer exists: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to create quarantine folder {path}: {source}")]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write move report to {path}: {source}")]
    ReportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DamageScanError>;
