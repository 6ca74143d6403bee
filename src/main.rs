//! # damage-scan CLI
//!
//! Command-line interface for the media damage scanner.
//!
//! ## Usage
//! ```bash
//! damage-scan scan ~/recovered --output ./reports
//! damage-scan scan ~/recovered --output ./reports --resume --format json
//! ```

mod cli;

use media_damage_scanner::{init_tracing, Result};

fn main() -> Result<()> {
    init_tracing();
    cli::run()
}
