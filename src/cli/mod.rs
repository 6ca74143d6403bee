//! # CLI Module
//!
//! Command-line interface for the media damage scanner.
//!
//! ## Usage
//! ```bash
//! # Scan a recovered dump, reports land in ./reports
//! damage-scan scan ~/recovered --output ./reports
//!
//! # Resume an interrupted scan
//! damage-scan scan ~/recovered --output ./reports --resume
//!
//! # Check only, never move files
//! damage-scan scan ~/recovered --output ./reports --no-move
//!
//! # JSON summary for scripting
//! damage-scan scan ~/recovered --output ./reports --format json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_damage_scanner::core::engine::{Engine, EngineResult};
use media_damage_scanner::error::Result;
use media_damage_scanner::events::{Event, EventChannel, PipelineEvent, ValidateEvent};
use media_damage_scanner::Config;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

/// Media Damage Scanner - Find broken files before you trust them
#[derive(Parser, Debug)]
#[command(name = "damage-scan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a directory tree for damaged media files
    Scan {
        /// Root directory to scan (defaults to INPUT_DIRECTORY)
        root: Option<PathBuf>,

        /// Output directory for reports, checkpoints, and quarantine
        /// (defaults to OUTPUT_DIRECTORY)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker thread count
        #[arg(short, long)]
        threads: Option<usize>,

        /// Per-file validation deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Skip files larger than this many megabytes
        #[arg(long)]
        max_size_mb: Option<u64>,

        /// Skip files smaller than this many bytes
        #[arg(long)]
        min_size_bytes: Option<u64>,

        /// Resume from the checkpoint in the output directory
        #[arg(long)]
        resume: bool,

        /// Report only; never move flagged files to quarantine
        #[arg(long)]
        no_move: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        format: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON summary for scripting
    Json,
    /// Minimal output (flagged paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            root,
            output,
            threads,
            timeout,
            max_size_mb,
            min_size_bytes,
            resume,
            no_move,
            format,
            verbose,
        } => {
            let mut config = Config::from_env()?;
            if let Some(root) = root {
                config.input_directory = root;
            }
            if let Some(output) = output {
                config.output_directory = output;
            }
            if let Some(threads) = threads {
                config.thread_count = threads;
            }
            if let Some(timeout) = timeout {
                config.timeout = Duration::from_secs(timeout);
            }
            if let Some(max) = max_size_mb {
                config.max_file_size_mb = max;
            }
            if let Some(min) = min_size_bytes {
                config.min_file_size_bytes = min;
            }
            if no_move {
                config.move_corrupted_files = false;
            }
            run_scan(config, resume, format, verbose)
        }
    }
}

fn run_scan(config: Config, resume: bool, format: OutputFormat, verbose: bool) -> Result<()> {
    let term = Term::stderr();

    if matches!(format, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Media Damage Scanner").bold().cyan(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let engine = Engine::builder(config).resume(resume).build();

    // Ctrl-C stops at the next batch boundary; progress stays checkpointed
    let cancel = engine.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!("could not install Ctrl-C handler: {e}");
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(format, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_message(format!("{phase}"));
                    }
                }
                Event::Validate(ValidateEvent::Started { total_files, .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_length(total_files as u64);
                    }
                }
                Event::Validate(ValidateEvent::FileChecked { path, .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.inc(1);
                        if verbose {
                            pb.set_message(format!(
                                "{}",
                                path.file_name().unwrap_or_default().to_string_lossy()
                            ));
                        }
                    }
                }
                Event::Validate(ValidateEvent::TimedOut { path }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.inc(1);
                        pb.set_message(format!(
                            "timed out: {}",
                            path.file_name().unwrap_or_default().to_string_lossy()
                        ));
                    }
                }
                Event::Pipeline(PipelineEvent::CancelRequested) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_message("stopping after the current batch".to_string());
                    }
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.finish_and_clear();
                    }
                }
                _ => {}
            }
        }
    });

    let result = engine.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let result = result?;

    match format {
        OutputFormat::Pretty => print_pretty_results(&term, &result),
        OutputFormat::Json => print_json_results(&result),
        OutputFormat::Minimal => print_minimal_results(&result),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, result: &EngineResult) {
    let s = &result.summary;

    term.write_line("").ok();
    term.write_line(&format!("{} Scan Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files checked in {:.1}s",
        style(s.total_files).cyan(),
        s.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} healthy", style(s.healthy).green()))
        .ok();
    term.write_line(&format!("  {} corrupt", style(s.corrupt).red()))
        .ok();
    term.write_line(&format!("  {} suspicious", style(s.suspicious).yellow()))
        .ok();
    term.write_line(&format!(
        "  {} errors (could not determine)",
        style(s.errors).magenta()
    ))
    .ok();
    if s.size_filtered > 0 {
        term.write_line(&format!(
            "  {} size-filtered (not checked)",
            style(s.size_filtered).dim()
        ))
        .ok();
    }
    if let Some(quarantine) = &result.quarantine {
        term.write_line(&format!(
            "  {} moved to quarantine, {} failed moves",
            style(quarantine.moved).cyan(),
            style(quarantine.failed).red()
        ))
        .ok();
    }
    term.write_line("").ok();

    for path in &result.report_paths {
        term.write_line(&format!(
            "  {} {}",
            style("Report:").dim(),
            path.display()
        ))
        .ok();
    }
    if let Some(report) = result
        .quarantine
        .as_ref()
        .and_then(|q| q.report_path.as_ref())
    {
        term.write_line(&format!(
            "  {} {}",
            style("Move report:").dim(),
            report.display()
        ))
        .ok();
    }

    if result.cancelled {
        term.write_line("").ok();
        term.write_line(&format!(
            "{}",
            style("Scan was cancelled; progress is checkpointed. Re-run with --resume.").yellow()
        ))
        .ok();
    } else if s.corrupt == 0 && s.suspicious == 0 {
        term.write_line("").ok();
        term.write_line(&format!("  {} No damaged files found!", style("🎉").green()))
            .ok();
    }
}

fn print_json_results(result: &EngineResult) {
    let s = &result.summary;
    let output = serde_json::json!({
        "total_files": s.total_files,
        "healthy": s.healthy,
        "corrupt": s.corrupt,
        "suspicious": s.suspicious,
        "errors": s.errors,
        "size_filtered": s.size_filtered,
        "moved": s.moved,
        "duration_ms": s.duration_ms,
        "cancelled": result.cancelled,
        "report_paths": result.report_paths,
    });

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

fn print_minimal_results(result: &EngineResult) {
    for record in result.report.flagged() {
        println!("{}", record.path.display());
    }
}
