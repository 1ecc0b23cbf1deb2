#![doc = include_str!("../README.md")]

// The commonly used types are re-exported at the root.
pub mod alert;
pub mod congestion;
mod error;
pub mod progress;
mod route;

pub use alert::{AlertLevel, AlertThresholds, ManeuverProximity, MinimumStepLengths, TravelProfile};
pub use congestion::{
    CongestionLevel, CongestionScope, CongestionTimes, StepCongestion, TimedCongestion,
};
pub use error::{IndexKind, ProgressError, StaleCongestionData};
pub use progress::{LegProgress, ProgressSnapshot, RouteProgress, StepProgress};
pub use route::{
    Intersection, IntersectionDefinition, Leg, LegDefinition, Maneuver, Route, RouteDefinition,
    Step, StepDefinition, StepId, StepRef,
};

/// Divides `numerator` by `denominator`, treating a zero denominator as "nothing to travel".
///
/// Fractions over zero-length routes, legs and steps are defined as 0 rather than NaN.
#[inline]
pub(crate) fn fraction(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
pub(crate) mod test_support;
