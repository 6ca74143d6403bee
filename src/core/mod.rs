//! # Core Module
//!
//! The UI-agnostic damage detection engine.
//!
//! ## Modules
//! - `scanner` - Enumerates candidate media files under the input root
//! - `validator` - Type-specific integrity checks (image and video)
//! - `worker` - Bounded concurrent execution with per-file deadlines
//! - `aggregator` - Thread-safe result sink with atomic checkpointing
//! - `report` - Frozen report value with text and JSON renderings
//! - `quarantine` - Post-report relocation of flagged files
//! - `engine` - Orchestrates the full pipeline

pub mod aggregator;
pub mod engine;
pub mod quarantine;
pub mod report;
pub mod scanner;
pub mod validator;
pub mod worker;

// Re-export commonly used types
pub use engine::{Engine, EngineBuilder, EngineResult};
pub use quarantine::{MoveOutcome, MoveRecord};
pub use report::Report;
pub use scanner::{CandidateFile, MediaType, SkippedFile};
pub use validator::{FileRecord, FileStatus};
