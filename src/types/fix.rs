//! GPS fix and trajectory types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped GPS coordinate.
///
/// Fixes are plain values: pipeline stages never edit one in place, they
/// build a new [`Trajectory`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Recording instant (UTC). Snapped fixes returned by the backend have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Latitude in degrees, valid range [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, valid range [-180, 180]
    pub longitude: f64,
    /// Elevation in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl Fix {
    /// Create a timestamped fix without elevation.
    pub const fn new(time: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            time: Some(time),
            latitude,
            longitude,
            elevation: None,
        }
    }

    /// Create a fix that carries no timestamp (e.g. a snapped geometry vertex).
    pub const fn untimed(latitude: f64, longitude: f64) -> Self {
        Self {
            time: None,
            latitude,
            longitude,
            elevation: None,
        }
    }

    /// Attach an elevation in meters.
    #[must_use]
    pub const fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    /// Latitude within [-90, 90] and not NaN.
    pub fn latitude_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
    }

    /// Longitude within [-180, 180] and not NaN.
    pub fn longitude_in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.longitude)
    }

    /// Both coordinates inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude_in_range() && self.longitude_in_range()
    }
}

/// Errors raised while building a [`Trajectory`] from raw fixes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrajectoryError {
    /// Timestamps go backwards and the sequence cannot be sorted because
    /// some fixes carry no timestamp.
    #[error("fix {index} is earlier than its predecessor and the track cannot be re-sorted")]
    Unordered { index: usize },
}

/// Ordered sequence of fixes representing one continuous track.
///
/// Invariant: the timestamps present are non-decreasing. Construct through
/// [`Trajectory::from_fixes`] when the ordering of the input is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    fixes: Vec<Fix>,
}

impl Trajectory {
    /// Empty trajectory.
    pub const fn empty() -> Self {
        Self { fixes: Vec::new() }
    }

    /// Build a trajectory from fixes in arbitrary order.
    ///
    /// When every fix is timestamped the fixes are stably sorted by time
    /// (equal timestamps keep their input order). When some are missing a
    /// timestamp the input order is kept, and it is an error for the
    /// timestamps that are present to decrease.
    pub fn from_fixes(mut fixes: Vec<Fix>) -> Result<Self, TrajectoryError> {
        if fixes.iter().all(|f| f.time.is_some()) {
            fixes.sort_by_key(|f| f.time);
            return Ok(Self { fixes });
        }

        let mut last = None;
        for (index, fix) in fixes.iter().enumerate() {
            if let Some(t) = fix.time {
                if last.is_some_and(|prev| t < prev) {
                    return Err(TrajectoryError::Unordered { index });
                }
                last = Some(t);
            }
        }
        Ok(Self { fixes })
    }

    /// Wrap fixes that are already known to be ordered (stage outputs).
    pub(crate) const fn from_ordered(fixes: Vec<Fix>) -> Self {
        Self { fixes }
    }

    /// Merge several recordings into one track ordered by time.
    pub fn merge<I>(parts: I) -> Result<Self, TrajectoryError>
    where
        I: IntoIterator<Item = Self>,
    {
        let fixes = parts.into_iter().flat_map(|t| t.fixes).collect();
        Self::from_fixes(fixes)
    }

    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    pub fn into_fixes(self) -> Vec<Fix> {
        self.fixes
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fix> {
        self.fixes.iter()
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Fix;
    type IntoIter = std::slice::Iter<'a, Fix>;

    fn into_iter(self) -> Self::IntoIter {
        self.fixes.iter()
    }
}
