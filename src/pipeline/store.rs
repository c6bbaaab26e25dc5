//! Result store and run report
//!
//! Workers hand finished [`FileReport`]s to the coordinator, which records
//! them here in completion order. The store is consumed into a
//! [`RunReport`] once the run ends.

use crate::types::{ErrorInfo, ErrorKind, Stage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Final disposition of one discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobOutcome {
    Validated,
    Failed,
    /// Never dispatched because the run was cancelled
    Skipped,
}

/// Per-file line of the run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Last stage completed. For failures, the last stage completed before
    /// failing; `outcome` carries the failure itself.
    pub stage: Stage,
    pub outcome: JobOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Fixes parsed from the source file
    pub fixes_in: usize,
    /// Fixes in the matched trajectory
    pub fixes_out: usize,
    /// Backend calls made
    pub attempts: u32,
    /// Where the matched track was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl FileReport {
    pub fn skipped(path: PathBuf) -> Self {
        Self {
            path,
            stage: Stage::Discovered,
            outcome: JobOutcome::Skipped,
            error: None,
            fixes_in: 0,
            fixes_out: 0,
            attempts: 0,
            output: None,
        }
    }

    /// A job whose task died before producing a report.
    pub fn internal_failure(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            stage: Stage::Discovered,
            outcome: JobOutcome::Failed,
            error: Some(ErrorInfo::new(ErrorKind::InternalError, message)),
            fixes_in: 0,
            fixes_out: 0,
            attempts: 0,
            output: None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// Accumulates file reports during a run.
#[derive(Debug, Default)]
pub struct ResultStore {
    files: Vec<FileReport>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: FileReport) {
        self.files.push(report);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_report(self, elapsed: Duration) -> RunReport {
        RunReport::from_files(self.files, elapsed)
    }
}

/// Aggregate outcome of one run. Every discovered file appears exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Per-file results in completion order
    pub files: Vec<FileReport>,
    pub validated: usize,
    pub failed: usize,
    pub not_dispatched: usize,
    pub failures_by_kind: BTreeMap<ErrorKind, usize>,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl RunReport {
    pub fn from_files(files: Vec<FileReport>, elapsed: Duration) -> Self {
        let mut validated = 0;
        let mut failed = 0;
        let mut not_dispatched = 0;
        let mut failures_by_kind = BTreeMap::new();

        for f in &files {
            match f.outcome {
                JobOutcome::Validated => validated += 1,
                JobOutcome::Skipped => not_dispatched += 1,
                JobOutcome::Failed => {
                    failed += 1;
                    if let Some(kind) = f.error_kind() {
                        *failures_by_kind.entry(kind).or_insert(0) += 1;
                    }
                }
            }
        }

        Self {
            files,
            validated,
            failed,
            not_dispatched,
            failures_by_kind,
            elapsed,
        }
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn failures_of(&self, kind: ErrorKind) -> usize {
        self.failures_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// True when every discovered file validated.
    pub fn all_validated(&self) -> bool {
        self.validated == self.files.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(path: &str, outcome: JobOutcome, kind: Option<ErrorKind>) -> FileReport {
        FileReport {
            path: PathBuf::from(path),
            stage: if outcome == JobOutcome::Validated {
                Stage::Validated
            } else {
                Stage::Matched
            },
            outcome,
            error: kind.map(|k| ErrorInfo::new(k, "boom")),
            fixes_in: 10,
            fixes_out: 8,
            attempts: 1,
            output: None,
        }
    }

    #[test]
    fn counters_follow_outcomes() {
        let mut store = ResultStore::new();
        store.record(done("a", JobOutcome::Validated, None));
        store.record(done("b", JobOutcome::Failed, Some(ErrorKind::ValidationFailure)));
        store.record(done("c", JobOutcome::Failed, Some(ErrorKind::ValidationFailure)));
        store.record(done("d", JobOutcome::Failed, Some(ErrorKind::TransportError)));
        store.record(FileReport::skipped(PathBuf::from("e")));

        let report = store.into_report(Duration::from_millis(1_500));
        assert_eq!(report.total(), 5);
        assert_eq!(report.validated, 1);
        assert_eq!(report.failed, 3);
        assert_eq!(report.not_dispatched, 1);
        assert_eq!(report.failures_of(ErrorKind::ValidationFailure), 2);
        assert_eq!(report.failures_of(ErrorKind::TransportError), 1);
        assert_eq!(report.failures_of(ErrorKind::ParseError), 0);
        assert!(!report.all_validated());
    }

    #[test]
    fn keeps_completion_order() {
        let mut store = ResultStore::new();
        store.record(done("z", JobOutcome::Validated, None));
        store.record(done("a", JobOutcome::Validated, None));
        let report = store.into_report(Duration::ZERO);
        assert_eq!(report.files[0].path, PathBuf::from("z"));
        assert!(report.all_validated());
    }

    #[test]
    fn serializes_to_json() {
        let report = RunReport::from_files(
            vec![done("x.gpx", JobOutcome::Failed, Some(ErrorKind::DecodeError))],
            Duration::from_millis(250),
        );
        let json: serde_json::Value =
            serde_json::from_str(&report.to_json().expect("serialize")).expect("valid json");
        assert_eq!(json["failed"], 1);
        assert_eq!(json["elapsed"], 0.25);
        assert_eq!(json["files"][0]["error"]["kind"], "DecodeError");
        assert_eq!(json["failures_by_kind"]["DecodeError"], 1);
    }
}
