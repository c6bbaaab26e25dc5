//! Coordinate-bounds validation of matched trajectories

use crate::types::{Fix, Trajectory};
use serde::Serialize;

/// A fix that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffendingFix {
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    /// Every fix outside the coordinate bounds, in track order
    pub offending: Vec<OffendingFix>,
    pub total: usize,
}

impl ValidationReport {
    /// One-line description for job error messages.
    pub fn summary(&self) -> String {
        if self.total == 0 {
            return "matched trajectory is empty".to_string();
        }
        let shown: Vec<String> = self
            .offending
            .iter()
            .take(3)
            .map(|o| format!("#{} ({}, {})", o.index, o.latitude, o.longitude))
            .collect();
        let more = self.offending.len().saturating_sub(shown.len());
        let mut msg = format!(
            "{} of {} fix(es) out of bounds: {}",
            self.offending.len(),
            self.total,
            shown.join(", ")
        );
        if more > 0 {
            msg.push_str(&format!(" and {more} more"));
        }
        msg
    }
}

/// Check every fix against latitude [-90, 90] and longitude [-180, 180].
///
/// An empty trajectory never passes.
pub fn validate(trajectory: &Trajectory) -> ValidationReport {
    let offending: Vec<OffendingFix> = trajectory
        .iter()
        .enumerate()
        .filter(|(_, fix)| !fix.is_valid())
        .map(|(index, fix): (usize, &Fix)| OffendingFix {
            index,
            latitude: fix.latitude,
            longitude: fix.longitude,
        })
        .collect();

    ValidationReport {
        passed: !trajectory.is_empty() && offending.is_empty(),
        offending,
        total: trajectory.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(points: &[(f64, f64)]) -> Trajectory {
        Trajectory::from_ordered(points.iter().map(|&(lat, lon)| Fix::untimed(lat, lon)).collect())
    }

    #[test]
    fn accepts_in_bounds() {
        let report = validate(&track(&[(45.0, -122.0)]));
        assert!(report.passed);
        assert!(report.offending.is_empty());
    }

    #[test]
    fn rejects_out_of_bounds_latitude_and_longitude() {
        let report = validate(&track(&[(45.0, -122.0), (95.0, -122.0), (45.0, -200.0)]));
        assert!(!report.passed);
        let indices: Vec<usize> = report.offending.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(report.offending[0].latitude, 95.0);
        assert_eq!(report.offending[1].longitude, -200.0);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(validate(&track(&[(90.0, 180.0), (-90.0, -180.0)])).passed);
    }

    #[test]
    fn empty_track_is_invalid() {
        let report = validate(&Trajectory::empty());
        assert!(!report.passed);
        assert_eq!(report.summary(), "matched trajectory is empty");
    }

    #[test]
    fn summary_truncates_long_lists() {
        let points: Vec<(f64, f64)> = (0..5).map(|_| (91.0, 0.0)).collect();
        let summary = validate(&track(&points)).summary();
        assert!(summary.starts_with("5 of 5 fix(es) out of bounds"));
        assert!(summary.ends_with("and 2 more"));
    }
}
