//! One job, end to end
//!
//! Drives a single file through the stage sequence. Each stage consumes the
//! previous stage's trajectory; nothing is shared with other jobs except the
//! match client's request budget.

use super::store::{FileReport, JobOutcome};
use super::validator::validate;
use crate::acquisition::{write_gpx, TrackFormat};
use crate::config::defaults::MATCHED_SUFFIX;
use crate::matching::MatchClient;
use crate::preprocessing::{Interpolator, OutlierFilter};
use crate::types::{ErrorInfo, ErrorKind, PipelineJob, Stage, Trajectory};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Stateless per-job driver, shared by all workers.
#[derive(Clone)]
pub struct JobProcessor {
    filter: OutlierFilter,
    interpolator: Interpolator,
    client: MatchClient,
    input_root: PathBuf,
    output_dir: Option<PathBuf>,
}

/// Failure inside a stage, before it is recorded on the job.
struct StageError {
    error: ErrorInfo,
    attempts: u32,
}

impl StageError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: ErrorInfo::new(kind, message),
            attempts: 0,
        }
    }
}

impl JobProcessor {
    pub fn new(
        filter: OutlierFilter,
        interpolator: Interpolator,
        client: MatchClient,
        input_root: impl Into<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            filter,
            interpolator,
            client,
            input_root: input_root.into(),
            output_dir,
        }
    }

    /// Run `path` through every stage and report the result. Never fails:
    /// stage errors end up in the report.
    pub async fn process(&self, path: PathBuf) -> FileReport {
        let mut job = PipelineJob::discovered(path);
        let mut output = None;

        let failure = match self.drive(&mut job).await {
            Ok(written) => {
                output = written;
                None
            }
            Err(e) => {
                job.match_attempts = job.match_attempts.max(e.attempts);
                Some(e.error)
            }
        };

        let (stage, outcome, error) = match failure {
            None => (job.stage(), JobOutcome::Validated, None),
            Some(error) => {
                let last_completed = job.fail(error.clone());
                warn!(
                    path = %job.source_path.display(),
                    stage = %last_completed,
                    error = %error,
                    "Job failed"
                );
                (last_completed, JobOutcome::Failed, Some(error))
            }
        };

        FileReport {
            path: job.source_path,
            stage,
            outcome,
            error,
            fixes_in: job.fixes_in,
            fixes_out: job.fixes_out,
            attempts: job.match_attempts,
            output,
        }
    }

    async fn drive(&self, job: &mut PipelineJob) -> Result<Option<PathBuf>, StageError> {
        let label = job.source_path.display().to_string();

        // Parse
        let bytes = tokio::fs::read(&job.source_path)
            .await
            .map_err(|e| StageError::new(ErrorKind::ParseError, format!("cannot read file: {e}")))?;
        let parsed = TrackFormat::from_path(&job.source_path)
            .parse(&bytes)
            .map_err(|e| StageError::new(ErrorKind::ParseError, e.to_string()))?;
        job.fixes_in = parsed.len();
        step(job, Stage::Parsed, parsed)?;

        // Filter
        let raw = take(job)?;
        let filtered = self.filter.apply(raw);
        step(job, Stage::Filtered, filtered)?;

        // Interpolate
        let sparse = take(job)?;
        let dense = self.interpolator.apply(sparse);
        step(job, Stage::Interpolated, dense)?;

        // Match
        let dense = take(job)?;
        let matched = self
            .client
            .match_trajectory(&label, &dense)
            .await
            .map_err(|f| StageError {
                error: ErrorInfo::new(f.error.kind(), f.error.to_string()),
                attempts: f.attempts,
            })?;
        job.match_attempts = matched.attempts;
        job.fixes_out = matched.trajectory.len();
        step(job, Stage::Matched, matched.trajectory)?;

        // Validate
        let snapped = take(job)?;
        let report = validate(&snapped);
        if !report.passed {
            return Err(StageError::new(ErrorKind::ValidationFailure, report.summary()));
        }
        step(job, Stage::Validated, snapped)?;

        // Output
        let Some(out_dir) = &self.output_dir else {
            debug!(path = %label, "Job validated");
            return Ok(None);
        };
        let target = output_path(&self.input_root, out_dir, &job.source_path);
        let Some(matched) = job.trajectory().cloned() else {
            return Err(StageError::new(ErrorKind::InternalError, "validated job lost its trajectory"));
        };
        let dest = target.clone();
        tokio::task::spawn_blocking(move || write_gpx(&matched, &dest))
            .await
            .map_err(|e| StageError::new(ErrorKind::OutputError, format!("writer task failed: {e}")))?
            .map_err(|e| StageError::new(ErrorKind::OutputError, e.to_string()))?;
        info!(path = %label, output = %target.display(), "Matched track written");
        Ok(Some(target))
    }
}

fn step(job: &mut PipelineJob, to: Stage, trajectory: Trajectory) -> Result<(), StageError> {
    if job.advance(to, trajectory) {
        Ok(())
    } else {
        Err(StageError::new(
            ErrorKind::InternalError,
            format!("illegal transition {} -> {to}", job.stage()),
        ))
    }
}

fn take(job: &mut PipelineJob) -> Result<Trajectory, StageError> {
    job.take_trajectory().ok_or_else(|| {
        StageError::new(
            ErrorKind::InternalError,
            format!("no trajectory after stage {}", job.stage()),
        )
    })
}

/// `<out_dir>/<path relative to input_root>` with `_matched` added to the
/// file stem and a `.gpx` extension.
pub fn output_path(input_root: &Path, out_dir: &Path, source: &Path) -> PathBuf {
    let relative = source
        .strip_prefix(input_root)
        .ok()
        .map(Path::to_path_buf)
        .or_else(|| source.file_name().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("track"));

    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{stem}{MATCHED_SUFFIX}.gpx");

    match relative.parent() {
        Some(parent) => out_dir.join(parent).join(file_name),
        None => out_dir.join(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_mirrors_tree() {
        let out = output_path(
            Path::new("/data/in"),
            Path::new("/data/out"),
            Path::new("/data/in/2024/ride.gpx"),
        );
        assert_eq!(out, PathBuf::from("/data/out/2024/ride_matched.gpx"));
    }

    #[test]
    fn output_path_outside_root_uses_file_name() {
        let out = output_path(
            Path::new("/data/in"),
            Path::new("out"),
            Path::new("/elsewhere/commute.GPX"),
        );
        assert_eq!(out, PathBuf::from("out/commute_matched.gpx"));
    }
}
