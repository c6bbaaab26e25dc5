//! Per-file processing pipeline
//!
//! `Discovered → Parsed → Filtered → Interpolated → Matched → Validated`,
//! with `Failed` reachable from any stage. Jobs run concurrently across
//! files and strictly sequentially within one file.

pub mod coordinator;
pub mod processor;
pub mod store;
pub mod validator;

pub use coordinator::{run_pipeline, PipelineCoordinator, PipelineError, PipelineOptions};
pub use processor::{output_path, JobProcessor};
pub use store::{FileReport, JobOutcome, ResultStore, RunReport};
pub use validator::{validate, OffendingFix, ValidationReport};
