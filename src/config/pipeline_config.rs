//! Pipeline configuration loaded from TOML
//!
//! Every section and key is optional; omitted values fall back to
//! [`defaults`](super::defaults).

use super::defaults;
use crate::acquisition::ScanOptions;
use crate::matching::RetryPolicy;
use crate::pipeline::PipelineOptions;
use crate::preprocessing::{GapLimits, OutlierThresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub interpolation: InterpolationConfig,
    pub matcher: MatcherConfig,
    pub pipeline: RunConfig,
}

/// `[filter]` outlier thresholds.
///
/// Without a `[filter]` section both rules use their defaults. Inside a
/// written section, an omitted key disables that rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_distance_km: Option<f64>,
    pub max_speed_kmh: Option<f64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_distance_km: Some(defaults::FILTER_MAX_DISTANCE_KM),
            max_speed_kmh: Some(defaults::FILTER_MAX_SPEED_KMH),
        }
    }
}

/// `[interpolation]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    pub max_gap_secs: f64,
    pub max_gap_meters: Option<f64>,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: defaults::INTERPOLATION_MAX_GAP_SECS,
            max_gap_meters: None,
        }
    }
}

/// `[matcher]` backend endpoint and retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub endpoint: String,
    pub vehicle: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_jitter_ms: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::MATCH_ENDPOINT.to_string(),
            vehicle: defaults::MATCH_VEHICLE.to_string(),
            timeout_secs: defaults::MATCH_TIMEOUT_SECS,
            max_attempts: defaults::MATCH_MAX_ATTEMPTS,
            initial_backoff_ms: defaults::MATCH_INITIAL_BACKOFF_MS,
            max_backoff_ms: defaults::MATCH_MAX_BACKOFF_MS,
            backoff_jitter_ms: defaults::MATCH_BACKOFF_JITTER_MS,
        }
    }
}

impl MatcherConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            jitter: Duration::from_millis(self.backoff_jitter_ms),
        }
    }
}

/// `[pipeline]` discovery, concurrency and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub concurrency: usize,
    pub extension: String,
    pub recursive: bool,
    pub output_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::PIPELINE_CONCURRENCY,
            extension: defaults::PIPELINE_EXTENSION.to_string(),
            recursive: defaults::PIPELINE_RECURSIVE,
            output_dir: None,
        }
    }
}

/// Config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

impl PipelineConfig {
    /// Load using the standard search order:
    /// 1. `$SNAPTRACK_CONFIG`
    /// 2. `./snaptrack.toml`
    /// 3. Built-in defaults
    ///
    /// A file that fails to load is logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to a missing file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(path = %local.display(), "Loaded config");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::CONFIG_FILE_NAME);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load and validate a specific TOML file. Unknown keys are logged as
    /// warnings.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!(field = %w.field, "{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every rule and report all violations at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        check_positive(self.filter.max_distance_km, "filter.max_distance_km", &mut errors);
        check_positive(self.filter.max_speed_kmh, "filter.max_speed_kmh", &mut errors);
        check_at_least(
            Some(self.interpolation.max_gap_secs),
            defaults::INTERPOLATION_MIN_GAP_SECS,
            "interpolation.max_gap_secs",
            &mut errors,
        );
        check_at_least(
            self.interpolation.max_gap_meters,
            defaults::INTERPOLATION_MIN_GAP_METERS,
            "interpolation.max_gap_meters",
            &mut errors,
        );

        let m = &self.matcher;
        match reqwest::Url::parse(&m.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "matcher.endpoint = '{}' must use http or https, not '{}'",
                m.endpoint,
                url.scheme()
            )),
            Err(e) => errors.push(format!("matcher.endpoint = '{}' is not a URL: {e}", m.endpoint)),
        }
        if m.vehicle.trim().is_empty() {
            errors.push("matcher.vehicle must not be empty".to_string());
        }
        if m.timeout_secs == 0 {
            errors.push("matcher.timeout_secs must be >= 1".to_string());
        }
        if m.max_attempts == 0 {
            errors.push("matcher.max_attempts must be >= 1".to_string());
        }
        if m.initial_backoff_ms > m.max_backoff_ms {
            errors.push(format!(
                "matcher.initial_backoff_ms ({}) must be <= matcher.max_backoff_ms ({})",
                m.initial_backoff_ms, m.max_backoff_ms
            ));
        }

        let p = &self.pipeline;
        if p.concurrency == 0 {
            errors.push("pipeline.concurrency must be >= 1".to_string());
        }
        if p.extension.trim().is_empty() || p.extension.contains('.') {
            errors.push(format!(
                "pipeline.extension = '{}' must be a bare extension like 'gpx'",
                p.extension
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Options handed to the pipeline. Call after [`validate`](Self::validate).
    pub fn pipeline_options(&self) -> Result<PipelineOptions, ConfigError> {
        let max_gap = Duration::try_from_secs_f64(self.interpolation.max_gap_secs)
            .ok()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .ok_or_else(|| {
                ConfigError::Validation(vec![format!(
                    "interpolation.max_gap_secs = {} is not a representable duration",
                    self.interpolation.max_gap_secs
                )])
            })?;

        Ok(PipelineOptions {
            thresholds: OutlierThresholds {
                max_distance_km: self.filter.max_distance_km,
                max_speed_kmh: self.filter.max_speed_kmh,
            },
            gap_limits: GapLimits {
                max_gap,
                max_gap_meters: self.interpolation.max_gap_meters,
            },
            vehicle: self.matcher.vehicle.clone(),
            retry: self.matcher.retry_policy(),
            concurrency: self.pipeline.concurrency,
            scan: ScanOptions {
                extension: self.pipeline.extension.clone(),
                recursive: self.pipeline.recursive,
            },
            output_dir: self.pipeline.output_dir.clone(),
        })
    }
}

fn check_positive(value: Option<f64>, name: &str, errors: &mut Vec<String>) {
    if let Some(v) = value {
        if !v.is_finite() || v <= 0.0 {
            errors.push(format!("{name} = {v} must be a positive finite number"));
        }
    }
}

fn check_at_least(value: Option<f64>, min: f64, name: &str, errors: &mut Vec<String>) {
    if let Some(v) = value {
        if !v.is_finite() || v < min {
            errors.push(format!("{name} = {v} must be a finite number >= {min}"));
        }
    }
}
