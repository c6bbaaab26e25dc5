//! Geographic helpers shared by the preprocessing stages.

use crate::types::Fix;
use ::geo::{Distance, Haversine, Point};

/// Great-circle distance between two fixes in meters.
pub fn distance_m(a: &Fix, b: &Fix) -> f64 {
    Haversine::distance(point(a), point(b))
}

/// Great-circle distance between two fixes in kilometers.
pub fn distance_km(a: &Fix, b: &Fix) -> f64 {
    distance_m(a, b) / 1_000.0
}

fn point(fix: &Fix) -> Point<f64> {
    Point::new(fix.longitude, fix.latitude)
}

/// Linear interpolation between `a` and `b` at fraction `t` in [0, 1].
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    (b - a).mul_add(t, a)
}
