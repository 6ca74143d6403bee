//! # Media Damage Scanner
//!
//! Scans directories of recovered or unsorted media, classifies each file as
//! healthy, corrupt, suspicious, or error, and quarantines the flagged ones.
//!
//! ## Core Philosophy
//! - **Report before relocating** - the report is frozen before any file moves
//! - **Tolerate lying metadata** - recovered files routinely carry garbage
//!   frame rates and frame counts; only undecodable data is corrupt
//! - **Never lose progress** - results are checkpointed atomically so an
//!   interrupted scan can resume
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - The damage detection engine
//! - `config` - Validated, immutable run parameters
//! - `events` - Event-driven progress reporting
//! - `error` - Error taxonomy
//!
//! The `damage-scan` binary layers a CLI on top of the engine.

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::{DamageScanError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
