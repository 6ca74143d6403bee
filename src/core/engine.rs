//! Pipeline orchestration.
//!
//! Phases run strictly in order: scan, validate, report, quarantine. The
//! report is frozen and written before any file moves, so reported paths
//! always name pre-move locations. Cancellation stops validation at the
//! next batch boundary; the report still covers everything checked so far,
//! but no files are moved on a cancelled run.

use crate::config::Config;
use crate::core::aggregator::{Checkpointer, ResultAggregator};
use crate::core::quarantine::{Quarantine, QuarantineResult};
use crate::core::report::{Report, ReportWriter};
use crate::core::scanner::DirScanner;
use crate::core::validator::{ValidationDispatcher, VideoHeuristics, VideoProbe};
use crate::core::worker::BatchCoordinator;
use crate::error::{DamageScanError, Result};
use crate::events::{
    null_sender, CheckpointEvent, Event, EventSender, PipelineEvent, PipelinePhase,
    PipelineSummary,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Everything a completed (or cancelled) run produced.
#[derive(Debug)]
pub struct EngineResult {
    pub report: Report,
    /// Report files written, per the save flags
    pub report_paths: Vec<PathBuf>,
    /// Present when the quarantine phase ran
    pub quarantine: Option<QuarantineResult>,
    pub summary: PipelineSummary,
    pub cancelled: bool,
}

/// Builds an [`Engine`] with optional overrides.
pub struct EngineBuilder {
    config: Config,
    video_probe: Option<Box<dyn VideoProbe>>,
    heuristics: Option<VideoHeuristics>,
    cancel: Arc<AtomicBool>,
    resume: bool,
}

impl EngineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            video_probe: None,
            heuristics: None,
            cancel: Arc::new(AtomicBool::new(false)),
            resume: false,
        }
    }

    /// Replace the default MP4 container probe.
    pub fn video_probe(mut self, probe: Box<dyn VideoProbe>) -> Self {
        self.video_probe = Some(probe);
        self
    }

    pub fn heuristics(mut self, heuristics: VideoHeuristics) -> Self {
        self.heuristics = Some(heuristics);
        self
    }

    /// Share a cancellation flag (set it from a signal handler; the run
    /// stops at the next batch boundary).
    pub fn cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resume from the checkpoint in the output directory, if one exists.
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn build(self) -> Engine {
        let mut dispatcher = ValidationDispatcher::new();
        if let Some(probe) = self.video_probe {
            dispatcher = dispatcher.with_video_probe(probe);
        }
        if let Some(heuristics) = self.heuristics {
            dispatcher = dispatcher.with_heuristics(heuristics);
        }
        Engine {
            config: self.config,
            dispatcher: Arc::new(dispatcher),
            cancel: self.cancel,
            resume: self.resume,
        }
    }
}

/// The damage detection pipeline.
pub struct Engine {
    config: Config,
    dispatcher: Arc<ValidationDispatcher>,
    cancel: Arc<AtomicBool>,
    resume: bool,
}

impl Engine {
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Flag shared with the running pipeline; store `true` to request a
    /// stop at the next batch boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the pipeline without progress reporting.
    pub fn run(&self) -> Result<EngineResult> {
        self.run_with_events(&null_sender())
    }

    /// Run the full pipeline, reporting progress through `events`.
    pub fn run_with_events(&self, events: &EventSender) -> Result<EngineResult> {
        self.config.validate().map_err(DamageScanError::Config)?;
        let started = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        let mut aggregator = self.prepare_aggregator(events)?;

        // Scan
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        }));
        let scanner = DirScanner::new(&self.config).with_completed(aggregator.completed_paths());
        let scan = scanner
            .scan(&self.config.input_directory, events)
            .map_err(DamageScanError::Scan)?;

        // Validate
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Validating,
        }));
        let coordinator = BatchCoordinator::new(
            &self.config,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.cancel),
        );
        coordinator.run(&scan.candidates, events, |batch| {
            aggregator.absorb(batch, events);
        });
        aggregator.flush(events);
        let cancelled = self.cancel.load(Ordering::SeqCst);

        // Report, frozen before anything moves
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Reporting,
        }));
        let scan_errors = scan.errors.iter().map(|e| e.to_string()).collect();
        let report = Report::build(
            aggregator.into_records(),
            scan.size_filtered,
            scan_errors,
            started.elapsed().as_millis() as u64,
        );
        let writer = ReportWriter::new(
            self.config.save_detailed_report,
            self.config.save_json_report,
        );
        let report_paths = writer
            .write(&report, &self.config.output_directory)
            .map_err(DamageScanError::Report)?;

        // Quarantine, skipped on a cancelled run
        let quarantine = if self.config.move_corrupted_files && !cancelled {
            events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
                phase: PipelinePhase::Quarantining,
            }));
            let flagged: Vec<_> = report.flagged().collect();
            Some(
                Quarantine::new(&self.config)
                    .run(&flagged, &self.config.output_directory, events)
                    .map_err(DamageScanError::Quarantine)?,
            )
        } else {
            None
        };

        let summary = PipelineSummary {
            total_files: report.summary.total_files,
            healthy: report.summary.counts.healthy,
            corrupt: report.summary.counts.corrupt,
            suspicious: report.summary.counts.suspicious,
            errors: report.summary.counts.errors,
            size_filtered: report.summary.size_filtered,
            moved: quarantine.as_ref().map(|q| q.moved).unwrap_or(0),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: summary.clone(),
        }));
        tracing::info!(
            total = summary.total_files,
            corrupt = summary.corrupt,
            suspicious = summary.suspicious,
            errors = summary.errors,
            moved = summary.moved,
            cancelled,
            "pipeline finished"
        );

        Ok(EngineResult {
            report,
            report_paths,
            quarantine,
            summary,
            cancelled,
        })
    }

    fn prepare_aggregator(&self, events: &EventSender) -> Result<ResultAggregator> {
        let checkpointer = Checkpointer::new(&self.config.output_directory);
        let mut aggregator = ResultAggregator::new();

        if self.resume && checkpointer.exists() {
            let prior = checkpointer.load().map_err(DamageScanError::Checkpoint)?;
            events.send(Event::Checkpoint(CheckpointEvent::Loaded {
                path: checkpointer.path().to_path_buf(),
                records: prior.len(),
            }));
            tracing::info!(records = prior.len(), "resuming from checkpoint");
            aggregator = aggregator.resume_from(prior);
        }

        if self.config.enable_incremental_save {
            aggregator = aggregator
                .with_checkpointing(checkpointer, self.config.save_progress_interval);
        }
        Ok(aggregator)
    }
}
