//! Gap interpolation
//!
//! Inserts synthetic fixes between consecutive fixes whose temporal (and
//! optionally spatial) gap exceeds a configured maximum. For a gap `g` and
//! maximum `m`, `ceil(g / m) - 1` evenly spaced fixes are inserted, at most
//! `INTERPOLATION_MAX_FIXES_PER_GAP` per pair.
//!
//! Latitude and longitude are interpolated linearly in degree space. This is
//! an approximation of the geodesic between the two fixes: it is accurate for
//! the short gaps left after outlier filtering, drifts on long gaps at high
//! latitude, and is wrong across the antimeridian (a gap from 179.9° to
//! -179.9° is filled the long way round).

use crate::config::defaults::INTERPOLATION_MAX_FIXES_PER_GAP;
use crate::geo;
use crate::types::{Fix, Trajectory};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Limits for [`Interpolator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapLimits {
    /// Maximum time between consecutive fixes
    pub max_gap: Duration,
    /// Maximum great-circle distance between consecutive fixes (meters)
    pub max_gap_meters: Option<f64>,
}

/// Linear gap filler.
#[derive(Debug, Clone, Copy)]
pub struct Interpolator {
    limits: GapLimits,
}

impl Interpolator {
    pub const fn new(limits: GapLimits) -> Self {
        Self { limits }
    }

    pub const fn limits(&self) -> GapLimits {
        self.limits
    }

    /// Fill gaps. Original fixes are kept unchanged and in order; only new
    /// fixes are inserted between them.
    pub fn apply(&self, trajectory: Trajectory) -> Trajectory {
        if trajectory.len() < 2 {
            return trajectory;
        }

        let fixes = trajectory.into_fixes();
        let mut out = Vec::with_capacity(fixes.len());
        let mut inserted = 0usize;

        for pair in fixes.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            out.push(*a);

            let segments = self.segments_between(a, b);
            for k in 1..segments {
                out.push(synthesize(a, b, k, segments));
            }
            inserted += segments.saturating_sub(1) as usize;
        }
        if let Some(last) = fixes.last() {
            out.push(*last);
        }

        debug!(original = fixes.len(), inserted, "Interpolation applied");
        Trajectory::from_ordered(out)
    }

    /// Number of equal segments the gap a→b is split into (1 = no insertion).
    fn segments_between(&self, a: &Fix, b: &Fix) -> u64 {
        let elapsed_ns = match (a.time, b.time) {
            (Some(t0), Some(t1)) => Some(nanos_between(t0, t1)),
            _ => None,
        };

        let mut segments = 1u64;

        if let (Some(gap_ns), Some(max_ns)) = (elapsed_ns, self.limits.max_gap.num_nanoseconds()) {
            if max_ns > 0 && gap_ns > i128::from(max_ns) {
                segments = segments.max(ceil_div(gap_ns, i128::from(max_ns)));
            }
        }

        if let Some(max_m) = self.limits.max_gap_meters.filter(|m| *m > 0.0) {
            let dist_m = geo::distance_m(a, b);
            if dist_m > max_m {
                segments = segments.max((dist_m / max_m).ceil() as u64);
            }
        }

        // Synthetic timestamps must fall strictly between their neighbours,
        // so a timestamped pair cannot be split finer than its nanosecond span.
        if let Some(gap_ns) = elapsed_ns {
            let cap = u64::try_from(gap_ns.max(1)).unwrap_or(u64::MAX);
            segments = segments.min(cap);
        }

        segments.min(INTERPOLATION_MAX_FIXES_PER_GAP + 1)
    }
}

/// Fix `k` of `n` equal segments between `a` and `b` (0 < k < n).
fn synthesize(a: &Fix, b: &Fix, k: u64, n: u64) -> Fix {
    let t = k as f64 / n as f64;
    let time = match (a.time, b.time) {
        (Some(t0), Some(t1)) => {
            let offset = nanos_between(t0, t1) * i128::from(k) / i128::from(n);
            i64::try_from(offset)
                .ok()
                .map(|ns| t0 + Duration::nanoseconds(ns))
        }
        _ => None,
    };
    let elevation = match (a.elevation, b.elevation) {
        (Some(e0), Some(e1)) => Some(geo::lerp(e0, e1, t)),
        _ => None,
    };

    Fix {
        time,
        latitude: geo::lerp(a.latitude, b.latitude, t),
        longitude: geo::lerp(a.longitude, b.longitude, t),
        elevation,
    }
}

fn nanos_between(t0: DateTime<Utc>, t1: DateTime<Utc>) -> i128 {
    let delta = t1 - t0;
    i128::from(delta.num_seconds()) * 1_000_000_000 + i128::from(delta.subsec_nanos())
}

fn ceil_div(num: i128, den: i128) -> u64 {
    let q = (num + den - 1) / den;
    u64::try_from(q).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid timestamp")
    }

    fn limits(max_gap_secs: i64) -> GapLimits {
        GapLimits {
            max_gap: Duration::seconds(max_gap_secs),
            max_gap_meters: None,
        }
    }

    fn track(points: &[(i64, f64, f64)]) -> Trajectory {
        Trajectory::from_fixes(
            points
                .iter()
                .map(|&(s, lat, lon)| Fix::new(at(s), lat, lon))
                .collect(),
        )
        .expect("ordered")
    }

    #[test]
    fn short_tracks_unchanged() {
        let interp = Interpolator::new(limits(1));
        assert!(interp.apply(Trajectory::empty()).is_empty());
        let one = track(&[(0, 1.0, 1.0)]);
        assert_eq!(interp.apply(one.clone()), one);
    }

    #[test]
    fn gaps_within_threshold_unchanged() {
        let interp = Interpolator::new(limits(5));
        let input = track(&[(0, 45.0, 7.0), (5, 45.001, 7.0), (9, 45.002, 7.0)]);
        assert_eq!(interp.apply(input.clone()), input);
    }

    #[test]
    fn inserts_ceil_gap_over_max_minus_one() {
        let interp = Interpolator::new(limits(5));
        // gap 12 s / 5 s → ceil(2.4) = 3 segments → 2 inserted
        let out = interp.apply(track(&[(0, 45.0, 7.0), (12, 45.012, 7.012)]));
        assert_eq!(out.len(), 4);
        let times: Vec<_> = out.iter().map(|f| f.time).collect();
        assert_eq!(times[1], Some(at(4)));
        assert_eq!(times[2], Some(at(8)));
        assert!((out.fixes()[1].latitude - 45.004).abs() < 1e-9);
        assert!((out.fixes()[2].longitude - 7.008).abs() < 1e-9);
    }

    #[test]
    fn inserts_true_midpoint_not_endpoint_copy() {
        let interp = Interpolator::new(limits(10));
        let out = interp.apply(track(&[(0, 10.0, 20.0), (20, 12.0, 24.0)]));
        assert_eq!(out.len(), 3);
        let mid = out.fixes()[1];
        assert!((mid.latitude - 11.0).abs() < 1e-12);
        assert!((mid.longitude - 22.0).abs() < 1e-12);
        assert_eq!(mid.time, Some(at(10)));
    }

    #[test]
    fn originals_preserved_and_synthetic_strictly_between() {
        let interp = Interpolator::new(limits(3));
        let input = track(&[
            (0, 45.0, 7.0),
            (2, 45.001, 7.001),
            (11, 45.01, 7.0),
            (11, 45.011, 7.0),
            (30, 45.02, 7.02),
        ]);
        let out = interp.apply(input.clone());

        // Every original fix appears, unchanged and in order.
        let mut cursor = out.iter();
        for original in input.iter() {
            assert!(cursor.any(|f| f == original), "missing {original:?}");
        }

        // Synthetic fixes lie strictly between their original neighbours.
        let originals: Vec<_> = input.iter().copied().collect();
        let mut prev_original = originals[0];
        for fix in out.iter() {
            if originals.contains(fix) {
                prev_original = *fix;
                continue;
            }
            let next_original = originals
                .iter()
                .find(|o| o.time > prev_original.time)
                .expect("synthetic fix has a following original");
            assert!(fix.time > prev_original.time && fix.time < next_original.time);
        }

        // Resulting gaps respect the limit.
        for pair in out.fixes().windows(2) {
            let gap = pair[1].time.expect("timed") - pair[0].time.expect("timed");
            assert!(gap <= Duration::seconds(3), "gap {gap} too large");
        }
    }

    #[test]
    fn spatial_limit_inserts_even_when_time_is_fine() {
        let interp = Interpolator::new(GapLimits {
            max_gap: Duration::seconds(3_600),
            max_gap_meters: Some(100.0),
        });
        // ~333 m apart → 4 segments → 3 inserted
        let out = interp.apply(track(&[(0, 45.0, 7.0), (60, 45.003, 7.0)]));
        assert_eq!(out.len(), 5);
        for pair in out.fixes().windows(2) {
            assert!(geo::distance_m(&pair[0], &pair[1]) <= 100.0);
        }
    }

    #[test]
    fn spatial_split_capped_by_available_nanoseconds() {
        let interp = Interpolator::new(GapLimits {
            max_gap: Duration::seconds(60),
            max_gap_meters: Some(1.0),
        });
        // Same instant, 111 m apart: no room for strictly-between timestamps.
        let out = interp.apply(track(&[(0, 45.0, 7.0), (0, 45.001, 7.0)]));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn untimed_pairs_use_spatial_limit_only() {
        let interp = Interpolator::new(GapLimits {
            max_gap: Duration::seconds(1),
            max_gap_meters: Some(50.0),
        });
        let input = Trajectory::from_ordered(vec![
            Fix::untimed(45.0, 7.0),
            Fix::untimed(45.001, 7.0),
        ]);
        let out = interp.apply(input);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|f| f.time.is_none()));
    }

    #[test]
    fn long_gaps_are_capped_per_pair() {
        let interp = Interpolator::new(GapLimits {
            max_gap: Duration::milliseconds(1),
            max_gap_meters: None,
        });
        let out = interp.apply(track(&[(0, 45.0, 7.0), (3_600, 45.1, 7.1)]));
        let cap = usize::try_from(INTERPOLATION_MAX_FIXES_PER_GAP).expect("fits");
        assert_eq!(out.len(), cap + 2);
        assert_eq!(out.fixes()[cap + 1].time, Some(at(3_600)));
    }

    #[test]
    fn untimed_spatial_split_is_capped_too() {
        let interp = Interpolator::new(GapLimits {
            max_gap: Duration::seconds(1),
            max_gap_meters: Some(0.001),
        });
        let input = Trajectory::from_ordered(vec![
            Fix::untimed(10.0, 10.0),
            Fix::untimed(20.0, 20.0),
        ]);
        let cap = usize::try_from(INTERPOLATION_MAX_FIXES_PER_GAP).expect("fits");
        assert_eq!(interp.apply(input).len(), cap + 2);
    }

    #[test]
    fn elevation_interpolated_when_both_ends_have_it() {
        let interp = Interpolator::new(limits(5));
        let input = Trajectory::from_fixes(vec![
            Fix::new(at(0), 45.0, 7.0).with_elevation(100.0),
            Fix::new(at(10), 45.0, 7.0).with_elevation(200.0),
        ])
        .expect("ordered");
        let out = interp.apply(input);
        assert_eq!(out.fixes()[1].elevation, Some(150.0));
    }
}
