//! Configuration
//!
//! ## Loading Order
//!
//! 1. `SNAPTRACK_CONFIG` environment variable (path to TOML file)
//! 2. `snaptrack.toml` in the current working directory
//! 3. Built-in defaults ([`defaults`])
//!
//! There is no global config: the loaded [`PipelineConfig`] is turned into
//! [`PipelineOptions`](crate::pipeline::PipelineOptions) and passed to the
//! coordinator explicitly.
//!
//! ```toml
//! [filter]
//! max_distance_km = 0.1
//! max_speed_kmh = 150.0
//!
//! [interpolation]
//! max_gap_secs = 5.0
//!
//! [matcher]
//! endpoint = "http://localhost:8989/match"
//! vehicle = "car"
//!
//! [pipeline]
//! concurrency = 4
//! output_dir = "matched"
//! ```

pub mod defaults;
mod pipeline_config;
pub mod validation;

pub use pipeline_config::*;
