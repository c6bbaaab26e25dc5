//! Shared data structures for the trajectory pipeline
//!
//! - `Fix` / `Trajectory`: GPS samples and ordered tracks
//! - `PipelineJob` / `Stage`: per-file state machine
//! - `ErrorKind` / `ErrorInfo`: failure taxonomy recorded in the run report

mod fix;
mod job;

pub use fix::*;
pub use job::*;
