//! File filtering logic for the scanner.

use super::MediaType;
use crate::config::Config;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Verdict of the size filter for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeVerdict {
    Ok,
    TooSmall,
    TooLarge,
}

/// Decides which files are candidates for validation
pub struct MediaFilter {
    image_extensions: HashSet<String>,
    video_extensions: HashSet<String>,
    min_size_bytes: u64,
    max_size_bytes: u64,
    /// Subtree never scanned (the quarantine folder of prior runs)
    excluded_root: PathBuf,
    /// Paths already covered by a resume checkpoint
    completed: HashSet<PathBuf>,
}

impl MediaFilter {
    pub fn new(config: &Config) -> Self {
        Self {
            image_extensions: config.image_extensions.clone(),
            video_extensions: config.video_extensions.clone(),
            min_size_bytes: config.min_file_size_bytes,
            max_size_bytes: config.max_file_size_bytes(),
            excluded_root: canonical_quarantine_root(config),
            completed: HashSet::new(),
        }
    }

    /// Mark paths as already completed; the walker will skip them without
    /// touching their content.
    pub fn with_completed(mut self, completed: HashSet<PathBuf>) -> Self {
        self.completed = completed;
        self
    }

    /// Media type for a path, or `None` when the extension is not on either
    /// allow-list.
    pub fn media_type_of(&self, path: &Path) -> Option<MediaType> {
        let ext = path.extension().and_then(|e| e.to_str())?.to_lowercase();
        if self.image_extensions.contains(&ext) {
            Some(MediaType::Image)
        } else if self.video_extensions.contains(&ext) {
            Some(MediaType::Video)
        } else {
            None
        }
    }

    /// Apply the configured size bounds
    pub fn size_verdict(&self, size: u64) -> SizeVerdict {
        if size < self.min_size_bytes {
            SizeVerdict::TooSmall
        } else if size > self.max_size_bytes {
            SizeVerdict::TooLarge
        } else {
            SizeVerdict::Ok
        }
    }

    /// True for anything inside the quarantine folder. The prefix check is
    /// lexical, so paths that don't share the stored spelling get
    /// canonicalized before comparing.
    pub fn is_quarantined(&self, path: &Path) -> bool {
        if path.starts_with(&self.excluded_root) {
            return true;
        }
        path.canonicalize()
            .map(|canonical| canonical.starts_with(&self.excluded_root))
            .unwrap_or(false)
    }

    /// True when a resume checkpoint already has a record for this path
    pub fn is_completed(&self, path: &Path) -> bool {
        self.completed.contains(path)
    }
}

/// Quarantine root in canonical form when it can be resolved, so the prefix
/// comparison holds even for a relative or unnormalized output directory.
/// Falls back to the configured spelling when nothing exists yet.
fn canonical_quarantine_root(config: &Config) -> PathBuf {
    let folder = config.quarantine_folder();
    match folder.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) => config
            .output_directory
            .canonicalize()
            .map(|out| out.join(&config.corrupted_files_folder))
            .unwrap_or(folder),
    }
}
