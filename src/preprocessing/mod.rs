//! Trajectory preprocessing stages run before map-matching.
//!
//! Both stages take a [`Trajectory`](crate::types::Trajectory) by value and
//! return a new one, so ownership moves from stage to stage.

pub mod interpolator;
pub mod outlier_filter;

pub use interpolator::{GapLimits, Interpolator};
pub use outlier_filter::{OutlierFilter, OutlierThresholds};
