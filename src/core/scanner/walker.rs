//! Directory walking implementation using walkdir.

use super::{CandidateFile, MediaFilter, ScanOutcome, SizeVerdict, SkippedFile};
use crate::config::Config;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walks the input root and produces the candidate set.
///
/// The walk itself is lazy; candidates are collected (paths and sizes only,
/// never content) so the batch coordinator can partition them. Sorting by
/// path makes batch composition deterministic across runs, which is what
/// makes two scans of an unmodified directory comparable.
pub struct DirScanner {
    filter: MediaFilter,
}

impl DirScanner {
    pub fn new(config: &Config) -> Self {
        Self {
            filter: MediaFilter::new(config),
        }
    }

    /// Exclude paths already present in a resume checkpoint. Their content
    /// is never re-read; they only bump the `resumed` counter.
    pub fn with_completed(mut self, completed: HashSet<PathBuf>) -> Self {
        self.filter = self.filter.with_completed(completed);
        self
    }

    /// Scan the root directory, reporting progress through `events`.
    pub fn scan(&self, root: &Path, events: &EventSender) -> Result<ScanOutcome, ScanError> {
        if !root.exists() || !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut outcome = ScanOutcome::default();

        for entry_result in WalkDir::new(root) {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let error = if e.io_error().map(|io| io.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadEntry {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    outcome.errors.push(error);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if self.filter.is_quarantined(path) {
                continue;
            }

            let Some(media_type) = self.filter.media_type_of(path) else {
                continue;
            };

            if self.filter.is_completed(path) {
                outcome.resumed += 1;
                continue;
            }

            let size = match fs::metadata(path) {
                Ok(metadata) => metadata.len(),
                Err(source) => {
                    let error = ScanError::ReadEntry {
                        path: path.to_path_buf(),
                        source,
                    };
                    events.send(Event::Scan(ScanEvent::Error {
                        path: path.to_path_buf(),
                        message: error.to_string(),
                    }));
                    outcome.errors.push(error);
                    continue;
                }
            };

            match self.filter.size_verdict(size) {
                SizeVerdict::Ok => {
                    events.send(Event::Scan(ScanEvent::CandidateFound {
                        path: path.to_path_buf(),
                    }));
                    let extension = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.to_lowercase())
                        .unwrap_or_default();
                    outcome.candidates.push(CandidateFile {
                        path: path.to_path_buf(),
                        size,
                        extension,
                        media_type,
                    });
                }
                verdict => {
                    events.send(Event::Scan(ScanEvent::SizeFiltered {
                        path: path.to_path_buf(),
                        size,
                    }));
                    let reason = match verdict {
                        SizeVerdict::TooSmall => format!("below minimum size ({size} bytes)"),
                        _ => format!("above maximum size ({size} bytes)"),
                    };
                    outcome.size_filtered.push(SkippedFile {
                        path: path.to_path_buf(),
                        size,
                        reason,
                    });
                }
            }
        }

        outcome.candidates.sort_by(|a, b| a.path.cmp(&b.path));

        events.send(Event::Scan(ScanEvent::Completed {
            candidates: outcome.candidates.len(),
            size_filtered: outcome.size_filtered.len(),
            resumed: outcome.resumed,
        }));

        tracing::info!(
            candidates = outcome.candidates.len(),
            size_filtered = outcome.size_filtered.len(),
            resumed = outcome.resumed,
            errors = outcome.errors.len(),
            "scan finished"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaType;
    use crate::events::null_sender;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, bytes: usize) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![0xAB; bytes]).unwrap();
        path
    }

    fn test_config(input: &TempDir, output: &TempDir) -> Config {
        Config {
            input_directory: input.path().to_path_buf(),
            output_directory: output.path().to_path_buf(),
            min_file_size_bytes: 10,
            max_file_size_mb: 1,
            ..Default::default()
        }
    }

    #[test]
    fn scan_finds_images_and_videos() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_file(input.path(), "a.jpg", 100);
        write_file(input.path(), "b.mp4", 100);
        write_file(input.path(), "notes.txt", 100);

        let scanner = DirScanner::new(&test_config(&input, &output));
        let outcome = scanner.scan(input.path(), &null_sender()).unwrap();

        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].media_type, MediaType::Image);
        assert_eq!(outcome.candidates[1].media_type, MediaType::Video);
        assert!(outcome.size_filtered.is_empty());
    }

    #[test]
    fn scan_records_size_filtered_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_file(input.path(), "tiny.jpg", 3);
        write_file(input.path(), "ok.jpg", 50);

        let scanner = DirScanner::new(&test_config(&input, &output));
        let outcome = scanner.scan(input.path(), &null_sender()).unwrap();

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.size_filtered.len(), 1);
        assert!(outcome.size_filtered[0].reason.contains("below minimum"));
    }

    #[test]
    fn scan_traverses_nested_directories_in_sorted_order() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_file(input.path(), "z.jpg", 50);
        write_file(input.path(), "sub/a.jpg", 50);

        let scanner = DirScanner::new(&test_config(&input, &output));
        let outcome = scanner.scan(input.path(), &null_sender()).unwrap();

        assert_eq!(outcome.candidates.len(), 2);
        assert!(outcome.candidates[0].path.ends_with("sub/a.jpg"));
        assert!(outcome.candidates[1].path.ends_with("z.jpg"));
    }

    #[test]
    fn scan_skips_quarantine_folder() {
        let input = TempDir::new().unwrap();
        // Quarantine lives under the input root here, worst case for re-scanning
        let config = Config {
            input_directory: input.path().to_path_buf(),
            output_directory: input.path().to_path_buf(),
            min_file_size_bytes: 10,
            ..Default::default()
        };
        write_file(input.path(), "fresh.jpg", 50);
        write_file(input.path(), "corrupted_files/image/old.jpg", 50);

        let scanner = DirScanner::new(&config);
        let outcome = scanner.scan(input.path(), &null_sender()).unwrap();

        assert_eq!(outcome.candidates.len(), 1);
        assert!(outcome.candidates[0].path.ends_with("fresh.jpg"));
    }

    #[test]
    fn scan_excludes_completed_paths_without_reading_them() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let done = write_file(input.path(), "done.jpg", 50);
        write_file(input.path(), "todo.jpg", 50);

        let scanner = DirScanner::new(&test_config(&input, &output))
            .with_completed([done].into_iter().collect());
        let outcome = scanner.scan(input.path(), &null_sender()).unwrap();

        assert_eq!(outcome.candidates.len(), 1);
        assert!(outcome.candidates[0].path.ends_with("todo.jpg"));
        assert_eq!(outcome.resumed, 1);
    }

    #[test]
    fn scan_nonexistent_root_is_an_error() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let scanner = DirScanner::new(&test_config(&input, &output));
        let result = scanner.scan(Path::new("/nonexistent/path/12345"), &null_sender());
        assert!(matches!(result, Err(ScanError::DirectoryNotFound { .. })));
    }
}
