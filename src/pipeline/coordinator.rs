//! Pipeline Coordinator - bounded worker pool over discovered track files
//!
//! ```text
//! scan_directory ──► queue ──► worker 1 ─┐
//!                       │ ──► worker 2 ──┼──► channel ──► ResultStore ──► RunReport
//!                       └ ──► worker N ──┘
//! ```
//!
//! Each worker pops a path, runs the whole job in its own task and sends the
//! [`FileReport`] back. Reports arrive in completion order. Cancellation stops
//! workers from taking new paths; jobs already running finish, and whatever
//! is still queued is reported as skipped.

use super::processor::JobProcessor;
use super::store::{FileReport, ResultStore, RunReport};
use crate::acquisition::{scan_directory, ScanOptions};
use crate::config::defaults;
use crate::matching::{MatchBackend, MatchClient, RetryPolicy};
use crate::preprocessing::{GapLimits, Interpolator, OutlierFilter, OutlierThresholds};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything a run needs besides the backend.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub thresholds: OutlierThresholds,
    pub gap_limits: GapLimits,
    pub vehicle: String,
    pub retry: RetryPolicy,
    /// Worker count and in-flight match request limit
    pub concurrency: usize,
    pub scan: ScanOptions,
    /// Where validated tracks are written; `None` writes nothing
    pub output_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            thresholds: OutlierThresholds {
                max_distance_km: Some(defaults::FILTER_MAX_DISTANCE_KM),
                max_speed_kmh: Some(defaults::FILTER_MAX_SPEED_KMH),
            },
            gap_limits: GapLimits {
                max_gap: chrono::Duration::milliseconds(
                    (defaults::INTERPOLATION_MAX_GAP_SECS * 1_000.0) as i64,
                ),
                max_gap_meters: None,
            },
            vehicle: defaults::MATCH_VEHICLE.to_string(),
            retry: RetryPolicy::default(),
            concurrency: defaults::PIPELINE_CONCURRENCY,
            scan: ScanOptions::default(),
            output_dir: None,
        }
    }
}

/// Fatal run setup errors. Per-file failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot read input directory {}: {}", .0.display(), .1)]
    Discovery(PathBuf, #[source] std::io::Error),
}

/// Runs jobs for one backend and one set of options.
pub struct PipelineCoordinator {
    options: PipelineOptions,
    backend: Arc<dyn MatchBackend>,
}

impl PipelineCoordinator {
    pub fn new(backend: Arc<dyn MatchBackend>, options: PipelineOptions) -> Self {
        Self { options, backend }
    }

    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Discover files under `input_dir` and process them all.
    pub async fn run(
        &self,
        input_dir: &Path,
        cancel: CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let files = scan_directory(input_dir, &self.options.scan)
            .await
            .map_err(|e| PipelineError::Discovery(input_dir.to_path_buf(), e))?;

        info!(
            input = %input_dir.display(),
            files = files.len(),
            extension = %self.options.scan.extension,
            "Discovered track files"
        );

        Ok(self.run_files(input_dir, files, cancel).await)
    }

    /// Process an explicit file list. `input_root` anchors output paths.
    pub async fn run_files(
        &self,
        input_root: &Path,
        files: Vec<PathBuf>,
        cancel: CancellationToken,
    ) -> RunReport {
        let started = Instant::now();
        let total = files.len();
        let mut store = ResultStore::new();
        if total == 0 {
            return store.into_report(started.elapsed());
        }

        let concurrency = self.options.concurrency.max(1);
        let client = MatchClient::new(
            Arc::clone(&self.backend),
            self.options.vehicle.clone(),
            self.options.retry.clone(),
            concurrency,
        );
        let processor = JobProcessor::new(
            OutlierFilter::new(self.options.thresholds),
            Interpolator::new(self.options.gap_limits),
            client,
            input_root,
            self.options.output_dir.clone(),
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(files)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();

        for id in 0..concurrency.min(total) {
            workers.spawn(worker(
                id,
                processor.clone(),
                Arc::clone(&queue),
                tx.clone(),
                cancel.clone(),
            ));
        }
        drop(tx);

        info!(
            files = total,
            workers = concurrency.min(total),
            backend = %self.backend.name(),
            "Pipeline started"
        );

        while let Some(report) = rx.recv().await {
            debug!(
                done = store.len() + 1,
                total,
                path = %report.path.display(),
                outcome = ?report.outcome,
                "File finished"
            );
            store.record(report);
        }

        while let Some(res) = workers.join_next().await {
            if let Err(e) = res {
                error!(error = %e, "Pipeline worker died");
            }
        }

        let leftover: Vec<PathBuf> = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if !leftover.is_empty() {
            warn!(skipped = leftover.len(), "Run cancelled before all files were dispatched");
        }
        for path in leftover {
            store.record(FileReport::skipped(path));
        }

        let report = store.into_report(started.elapsed());
        info!(
            validated = report.validated,
            failed = report.failed,
            skipped = report.not_dispatched,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Pipeline finished"
        );
        report
    }
}

/// Convenience wrapper: build a coordinator and run it once.
pub async fn run_pipeline(
    input_dir: &Path,
    options: PipelineOptions,
    backend: Arc<dyn MatchBackend>,
    cancel: CancellationToken,
) -> Result<RunReport, PipelineError> {
    PipelineCoordinator::new(backend, options)
        .run(input_dir, cancel)
        .await
}

async fn worker(
    id: usize,
    processor: JobProcessor,
    queue: Arc<Mutex<VecDeque<PathBuf>>>,
    results: mpsc::UnboundedSender<FileReport>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            debug!(worker = id, "Cancellation requested, worker stopping");
            break;
        }
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(path) = next else {
            break;
        };

        let job = {
            let processor = processor.clone();
            let path = path.clone();
            tokio::spawn(async move { processor.process(path).await })
        };

        let report = match job.await {
            Ok(report) => report,
            Err(e) => {
                let message = describe_join_error(e);
                error!(worker = id, path = %path.display(), error = %message, "Job aborted");
                FileReport::internal_failure(path, message)
            }
        };

        if results.send(report).is_err() {
            break;
        }
    }
}

fn describe_join_error(e: JoinError) -> String {
    if !e.is_panic() {
        return format!("job task cancelled: {e}");
    }
    let payload = e.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("job panicked: {detail}")
}
