//! Default values for every configuration key.
//!
//! Grouped by config section. `PipelineConfig::default()` and the CLI both
//! read from here.

// ============================================================================
// [filter]
// ============================================================================

/// Largest jump from the last kept fix before a fix is dropped (km).
pub const FILTER_MAX_DISTANCE_KM: f64 = 0.1;

/// Largest implied speed from the last kept fix before a fix is dropped (km/h).
pub const FILTER_MAX_SPEED_KMH: f64 = 150.0;

// ============================================================================
// [interpolation]
// ============================================================================

/// Longest time gap left between consecutive fixes after densification (s).
pub const INTERPOLATION_MAX_GAP_SECS: f64 = 5.0;

/// Smallest accepted `max_gap_secs`.
pub const INTERPOLATION_MIN_GAP_SECS: f64 = 0.1;

/// Smallest accepted `max_gap_meters`.
pub const INTERPOLATION_MIN_GAP_METERS: f64 = 1.0;

/// Most fixes synthesized between one pair of original fixes. Longer gaps
/// are left coarser than the configured limit.
pub const INTERPOLATION_MAX_FIXES_PER_GAP: u64 = 1_000;

// ============================================================================
// [matcher]
// ============================================================================

/// Local GraphHopper instance.
pub const MATCH_ENDPOINT: &str = "http://localhost:8989/match";

pub const MATCH_VEHICLE: &str = "car";

/// Per-request timeout (seconds).
pub const MATCH_TIMEOUT_SECS: u64 = 30;

/// Backend calls per trajectory, first attempt included.
pub const MATCH_MAX_ATTEMPTS: u32 = 3;

/// Delay after the first failed attempt (ms). Doubles per attempt.
pub const MATCH_INITIAL_BACKOFF_MS: u64 = 500;

/// Backoff ceiling before jitter (ms).
pub const MATCH_MAX_BACKOFF_MS: u64 = 8_000;

/// Upper bound of the uniform random jitter added to each backoff (ms).
pub const MATCH_BACKOFF_JITTER_MS: u64 = 100;

// ============================================================================
// [pipeline]
// ============================================================================

/// Worker tasks, which is also the in-flight match request limit.
pub const PIPELINE_CONCURRENCY: usize = 4;

pub const PIPELINE_EXTENSION: &str = "gpx";

pub const PIPELINE_RECURSIVE: bool = true;

/// Stem suffix for matched output files (`ride.gpx` -> `ride_matched.gpx`).
pub const MATCHED_SUFFIX: &str = "_matched";

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "SNAPTRACK_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "snaptrack.toml";
