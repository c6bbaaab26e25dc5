//! Outlier rejection
//!
//! Drops fixes that are spatially or kinematically inconsistent with the
//! last fix that was kept. Comparing against the last *kept* fix (not the
//! last raw one) keeps a single spike from cascading into rejecting the rest
//! of the track.

use crate::geo;
use crate::types::{Fix, Trajectory};
use tracing::debug;

/// Thresholds for [`OutlierFilter`]. `None` disables a rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierThresholds {
    /// Maximum great-circle jump from the last kept fix (km)
    pub max_distance_km: Option<f64>,
    /// Maximum implied speed from the last kept fix (km/h)
    pub max_speed_kmh: Option<f64>,
}

/// Distance/speed based outlier filter.
#[derive(Debug, Clone, Copy)]
pub struct OutlierFilter {
    thresholds: OutlierThresholds,
}

impl OutlierFilter {
    pub const fn new(thresholds: OutlierThresholds) -> Self {
        Self { thresholds }
    }

    pub const fn thresholds(&self) -> OutlierThresholds {
        self.thresholds
    }

    /// Filter a trajectory, keeping input order and never deduplicating.
    ///
    /// The first fix is always kept.
    pub fn apply(&self, trajectory: Trajectory) -> Trajectory {
        let input_len = trajectory.len();
        let mut kept: Vec<Fix> = Vec::with_capacity(input_len);

        for fix in trajectory.into_fixes() {
            match kept.last() {
                Some(reference) if self.is_outlier(reference, &fix) => {}
                _ => kept.push(fix),
            }
        }

        debug!(
            input = input_len,
            kept = kept.len(),
            rejected = input_len - kept.len(),
            "Outlier filter applied"
        );
        Trajectory::from_ordered(kept)
    }

    fn is_outlier(&self, reference: &Fix, candidate: &Fix) -> bool {
        let distance_km = geo::distance_km(reference, candidate);

        if self
            .thresholds
            .max_distance_km
            .is_some_and(|max| distance_km > max)
        {
            return true;
        }

        // Speed only when both fixes are timestamped and time actually passed;
        // identical timestamps fall back to the distance rule alone.
        if let (Some(max_speed), Some(t0), Some(t1)) =
            (self.thresholds.max_speed_kmh, reference.time, candidate.time)
        {
            let elapsed_secs = (t1 - t0).num_nanoseconds().map_or_else(
                || (t1 - t0).num_seconds() as f64,
                |ns| ns as f64 / 1e9,
            );
            if elapsed_secs > 0.0 {
                let speed_kmh = distance_km / (elapsed_secs / 3_600.0);
                return speed_kmh > max_speed;
            }
        }

        false
    }
}
