//! snaptrack: GPS trajectory cleanup and map matching
//!
//! Batch pipeline that takes a directory of raw GPS tracks, removes outliers,
//! fills time gaps, snaps each track onto the road network through an
//! external map-matching service and validates the result.
//!
//! ## Architecture
//!
//! - **Acquisition**: file discovery plus GPX and `.pos` readers/writers
//! - **Preprocessing**: outlier filter and gap interpolator
//! - **Matching**: backend seam, GraphHopper client, retry policy
//! - **Pipeline**: per-file state machine, worker pool, run report

pub mod acquisition;
pub mod config;
pub mod geo;
pub mod matching;
pub mod pipeline;
pub mod preprocessing;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, PipelineConfig};

// Re-export commonly used types
pub use types::{ErrorInfo, ErrorKind, Fix, PipelineJob, Stage, Trajectory, TrajectoryError};

// Re-export components
pub use acquisition::{read_gpx, read_pos, read_track, write_gpx, CodecError};
pub use matching::{GraphHopperBackend, MatchBackend, MatchClient, MatchError, RetryPolicy};
pub use pipeline::{
    run_pipeline, FileReport, JobOutcome, PipelineCoordinator, PipelineError, PipelineOptions,
    RunReport,
};
pub use preprocessing::{GapLimits, Interpolator, OutlierFilter, OutlierThresholds};
