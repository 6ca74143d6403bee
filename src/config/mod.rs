//! # Config Module
//!
//! Validated, immutable run parameters.
//!
//! A [`Config`] is constructed once (from the environment, with CLI
//! overrides layered on top) and passed by reference into every component.
//! Nothing mutates it after [`Config::validate`] succeeds.
//!
//! ## Recognized environment keys
//!
//! | Key | Default |
//! |-----|---------|
//! | `INPUT_DIRECTORY` | (required) |
//! | `OUTPUT_DIRECTORY` | (required) |
//! | `THREAD_COUNT` | 8 |
//! | `TIMEOUT_SECONDS` | 30 |
//! | `BATCH_SIZE` | 1000 |
//! | `SAVE_PROGRESS_INTERVAL` | 100 |
//! | `ENABLE_INCREMENTAL_SAVE` | true |
//! | `MAX_FILE_SIZE_MB` | 10000 |
//! | `MIN_FILE_SIZE_BYTES` | 100 |
//! | `MAX_MEMORY_USAGE_MB` | 2000 |
//! | `SAVE_DETAILED_REPORT` | true |
//! | `SAVE_JSON_REPORT` | true |
//! | `MOVE_CORRUPTED_FILES` | true |
//! | `CORRUPTED_FILES_FOLDER` | `corrupted_files` |
//! | `CREATE_SUBFOLDERS` | true |
//! | `IMAGE_EXTENSIONS` | jpg,jpeg,png,gif,bmp,tiff,webp,heic,dng,raw,svg,ico |
//! | `VIDEO_EXTENSIONS` | mp4,avi,mkv,mov,wmv,flv,webm,mpeg,mpg,ts,m4v,3gp |

use crate::error::ConfigError;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "heic", "dng", "raw", "svg", "ico",
];

const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "mpeg", "mpg", "ts", "m4v", "3gp",
];

/// Immutable run parameters
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory to scan
    pub input_directory: PathBuf,
    /// Directory receiving reports, checkpoints, and the quarantine folder
    pub output_directory: PathBuf,
    /// Maximum concurrently executing validations
    pub thread_count: usize,
    /// Per-file validation deadline
    pub timeout: Duration,
    /// Number of candidates processed per batch
    pub batch_size: usize,
    /// Persist a checkpoint after this many completed validations
    pub save_progress_interval: usize,
    /// Whether incremental checkpointing is enabled
    pub enable_incremental_save: bool,
    /// Upper size bound in decimal megabytes (file qualifies if size <= mb * 1e6)
    pub max_file_size_mb: u64,
    /// Lower size bound in bytes
    pub min_file_size_bytes: u64,
    /// Soft memory ceiling; the coordinator shrinks batch concurrency
    /// rather than failing when the estimate crosses it
    pub max_memory_usage_mb: u64,
    /// Write the human-readable text report
    pub save_detailed_report: bool,
    /// Write the JSON report
    pub save_json_report: bool,
    /// Move Corrupt/Suspicious files after the report is frozen
    pub move_corrupted_files: bool,
    /// Quarantine folder name, created under the output directory
    pub corrupted_files_folder: String,
    /// Create `image/` and `video/` subfolders inside the quarantine folder
    pub create_subfolders: bool,
    /// Lowercase extensions (no dot) recognized as images
    pub image_extensions: HashSet<String>,
    /// Lowercase extensions (no dot) recognized as videos
    pub video_extensions: HashSet<String>,
}

impl Config {
    /// Build a configuration from the process environment.
    ///
    /// Every key has a safe default except the two directories, which may
    /// also be supplied later by the CLI before [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            input_directory: std::env::var_os("INPUT_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_default(),
            output_directory: std::env::var_os("OUTPUT_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_default(),
            thread_count: env_parse("THREAD_COUNT", 8)?,
            timeout: Duration::from_secs(env_parse("TIMEOUT_SECONDS", 30)?),
            batch_size: env_parse("BATCH_SIZE", 1000)?,
            save_progress_interval: env_parse("SAVE_PROGRESS_INTERVAL", 100)?,
            enable_incremental_save: env_bool("ENABLE_INCREMENTAL_SAVE", true),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB", 10_000)?,
            min_file_size_bytes: env_parse("MIN_FILE_SIZE_BYTES", 100)?,
            max_memory_usage_mb: env_parse("MAX_MEMORY_USAGE_MB", 2000)?,
            save_detailed_report: env_bool("SAVE_DETAILED_REPORT", true),
            save_json_report: env_bool("SAVE_JSON_REPORT", true),
            move_corrupted_files: env_bool("MOVE_CORRUPTED_FILES", true),
            corrupted_files_folder: std::env::var("CORRUPTED_FILES_FOLDER")
                .unwrap_or_else(|_| "corrupted_files".to_string()),
            create_subfolders: env_bool("CREATE_SUBFOLDERS", true),
            image_extensions: env_extensions("IMAGE_EXTENSIONS", DEFAULT_IMAGE_EXTENSIONS),
            video_extensions: env_extensions("VIDEO_EXTENSIONS", DEFAULT_VIDEO_EXTENSIONS),
        })
    }

    /// Validate the configuration. Fatal on failure: the engine refuses to
    /// start scanning with an unusable configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_directory.as_os_str().is_empty() {
            return Err(ConfigError::MissingInputDirectory);
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(ConfigError::MissingOutputDirectory);
        }
        if !self.input_directory.exists() {
            return Err(ConfigError::InputNotFound {
                path: self.input_directory.clone(),
            });
        }
        if !self.input_directory.is_dir() {
            return Err(ConfigError::InputNotADirectory {
                path: self.input_directory.clone(),
            });
        }
        std::fs::create_dir_all(&self.output_directory).map_err(|source| {
            ConfigError::OutputUnwritable {
                path: self.output_directory.clone(),
                source,
            }
        })?;
        if self.thread_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "THREAD_COUNT",
                value: "0".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BATCH_SIZE",
                value: "0".to_string(),
            });
        }
        if self.save_progress_interval == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SAVE_PROGRESS_INTERVAL",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Upper size bound in bytes (decimal megabytes)
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1_000_000)
    }

    /// Full path of the quarantine folder
    pub fn quarantine_folder(&self) -> PathBuf {
        self.output_directory.join(&self.corrupted_files_folder)
    }
}

impl Default for Config {
    /// Defaults with empty directories; callers must set the directories
    /// and run [`Config::validate`] before scanning.
    fn default() -> Self {
        Self {
            input_directory: PathBuf::new(),
            output_directory: PathBuf::new(),
            thread_count: 8,
            timeout: Duration::from_secs(30),
            batch_size: 1000,
            save_progress_interval: 100,
            enable_incremental_save: true,
            max_file_size_mb: 10_000,
            min_file_size_bytes: 100,
            max_memory_usage_mb: 2000,
            save_detailed_report: true,
            save_json_report: true,
            move_corrupted_files: true,
            corrupted_files_folder: "corrupted_files".to_string(),
            create_subfolders: true,
            image_extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            video_extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

/// Parse a comma-separated extension list; leading dots and whitespace are
/// tolerated ("jpg, .png" and ".jpg,.png" both work).
fn env_extensions(key: &str, defaults: &[&str]) -> HashSet<String> {
    match std::env::var(key) {
        Ok(raw) => {
            let parsed: HashSet<String> = raw
                .split(',')
                .map(|item| item.trim().trim_start_matches('.').to_lowercase())
                .filter(|item| !item.is_empty())
                .collect();
            if parsed.is_empty() {
                defaults.iter().map(|s| s.to_string()).collect()
            } else {
                parsed
            }
        }
        Err(_) => defaults.iter().map(|s| s.to_string()).collect(),
    }
}
