//! # Scanner Module
//!
//! Enumerates candidate media files under the input root.
//!
//! A path qualifies when its extension is on the configured image or video
//! allow-list, its size is inside the configured bounds, and it does not lie
//! inside the quarantine folder (so repeated runs never re-scan files that
//! were already moved out). Files that match the extension filter but fail
//! the size filter are not silently dropped: they come back as
//! [`SkippedFile`] records so the final accounting still adds up.

mod filter;
mod walker;

pub use filter::{MediaFilter, SizeVerdict};
pub use walker::DirScanner;

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Media type of a candidate, decided by extension.
///
/// A closed variant: adding a new media type means adding a variant here and
/// a validator for it, not ad hoc branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Folder name used for quarantine subfolders
    pub fn folder_name(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.folder_name())
    }
}

/// A discovered file awaiting validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFile {
    /// Path to the file (unique key for the whole run)
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Lowercase extension without the dot
    pub extension: String,
    /// Image or video, decided by extension
    pub media_type: MediaType,
}

/// A file that matched the extension filter but was excluded by size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub size: u64,
    pub reason: String,
}

/// Result of a scan
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Candidates to validate, sorted by path
    pub candidates: Vec<CandidateFile>,
    /// Files excluded by the size filter (reported, never validated)
    pub size_filtered: Vec<SkippedFile>,
    /// Paths skipped because a resume checkpoint already covers them
    pub resumed: usize,
    /// Non-fatal walk errors
    pub errors: Vec<ScanError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_folder_names() {
        assert_eq!(MediaType::Image.folder_name(), "image");
        assert_eq!(MediaType::Video.folder_name(), "video");
    }

    #[test]
    fn media_type_serializes_lowercase() {
        let json = serde_json::to_string(&MediaType::Video).unwrap();
        assert_eq!(json, "\"video\"");
    }
}
