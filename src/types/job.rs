//! Pipeline job state machine types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::Trajectory;

/// Position of a job in the per-file state machine.
///
/// ```text
/// Discovered → Parsed → Filtered → Interpolated → Matched → Validated
///      └──────────┴─────────┴────────────┴───────────┴──→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Discovered,
    Parsed,
    Filtered,
    Interpolated,
    Matched,
    Validated,
    Failed,
}

impl Stage {
    /// The only stage reachable from `self` on the success path.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Discovered => Some(Self::Parsed),
            Self::Parsed => Some(Self::Filtered),
            Self::Filtered => Some(Self::Interpolated),
            Self::Interpolated => Some(Self::Matched),
            Self::Matched => Some(Self::Validated),
            Self::Validated | Self::Failed => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Validated | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovered => "Discovered",
            Self::Parsed => "Parsed",
            Self::Filtered => "Filtered",
            Self::Interpolated => "Interpolated",
            Self::Matched => "Matched",
            Self::Validated => "Validated",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Category of a job failure, as shown in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Input file malformed or coordinates out of range
    ParseError,
    /// Trajectory too short to be matched
    PreconditionError,
    /// Backend unreachable, timed out, or answered with a non-success status
    TransportError,
    /// Backend answered success with a body that could not be decoded
    DecodeError,
    /// Matched geometry has coordinates out of bounds
    ValidationFailure,
    /// Matched track could not be written
    OutputError,
    /// The job's task panicked
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ParseError => "ParseError",
            Self::PreconditionError => "PreconditionError",
            Self::TransportError => "TransportError",
            Self::DecodeError => "DecodeError",
            Self::ValidationFailure => "ValidationFailure",
            Self::OutputError => "OutputError",
            Self::InternalError => "InternalError",
        };
        f.write_str(s)
    }
}

/// Error recorded against a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A single file moving through the pipeline.
///
/// Owned by exactly one worker from discovery until its outcome is recorded.
/// Only [`advance`](Self::advance) and [`fail`](Self::fail) change `stage`,
/// so stages cannot be skipped or reordered.
#[derive(Debug)]
pub struct PipelineJob {
    pub source_path: PathBuf,
    stage: Stage,
    trajectory: Option<Trajectory>,
    error: Option<ErrorInfo>,
    /// Fix count as parsed from the source file
    pub fixes_in: usize,
    /// Fix count returned by the matcher
    pub fixes_out: usize,
    /// Backend attempts made for this job
    pub match_attempts: u32,
}

impl PipelineJob {
    pub fn discovered(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            stage: Stage::Discovered,
            trajectory: None,
            error: None,
            fixes_in: 0,
            fixes_out: 0,
            match_attempts: 0,
        }
    }

    pub const fn stage(&self) -> Stage {
        self.stage
    }

    pub const fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    pub const fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    /// Hand the current trajectory to the next stage.
    pub fn take_trajectory(&mut self) -> Option<Trajectory> {
        self.trajectory.take()
    }

    /// Move to `to` with the stage's output.
    ///
    /// Returns `false` and leaves the job untouched if `to` is not the
    /// immediate successor of the current stage.
    pub fn advance(&mut self, to: Stage, trajectory: Trajectory) -> bool {
        if self.stage.next() != Some(to) {
            return false;
        }
        self.stage = to;
        self.trajectory = Some(trajectory);
        true
    }

    /// Move to `Failed`. Returns the last stage completed before failing so
    /// the caller can report where it stopped.
    pub fn fail(&mut self, error: ErrorInfo) -> Stage {
        let last_completed = self.stage;
        self.stage = Stage::Failed;
        self.error = Some(error);
        last_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_strictly_in_order() {
        let mut job = PipelineJob::discovered("a.gpx");
        assert!(!job.advance(Stage::Filtered, Trajectory::empty()));
        assert_eq!(job.stage(), Stage::Discovered);

        for stage in [
            Stage::Parsed,
            Stage::Filtered,
            Stage::Interpolated,
            Stage::Matched,
            Stage::Validated,
        ] {
            assert!(job.advance(stage, Trajectory::empty()));
        }
        assert!(job.stage().is_terminal());
        assert!(!job.advance(Stage::Parsed, Trajectory::empty()));
    }

    #[test]
    fn failing_returns_last_completed_stage() {
        let mut job = PipelineJob::discovered("a.gpx");
        assert!(job.advance(Stage::Parsed, Trajectory::empty()));
        let last_completed = job.fail(ErrorInfo::new(ErrorKind::PreconditionError, "1 fix"));
        assert_eq!(last_completed, Stage::Parsed);
        assert_eq!(job.stage(), Stage::Failed);
        assert_eq!(
            job.error().map(ToString::to_string).as_deref(),
            Some("PreconditionError: 1 fix")
        );
    }
}
