use thiserror::Error;

/// Which kind of index an [`ProgressError::OutOfRange`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Leg,
    Step,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Leg => f.write_str("leg"),
            IndexKind::Step => f.write_str("step"),
        }
    }
}

/// Errors raised by route construction and by navigation controller mutations.
///
/// All of these indicate a bug in the caller (usually the navigation controller),
/// so they are reported rather than silently corrected.
#[derive(Debug, Error, PartialEq)]
pub enum ProgressError {
    #[error("The {kind} index {index} is out of range (there are {count})")]
    OutOfRange {
        kind: IndexKind,
        index: usize,
        count: usize,
    },
    #[error("A route must contain at least one leg")]
    EmptyRoute,
    #[error("Leg {leg_index} does not contain any steps")]
    EmptyLeg { leg_index: usize },
    #[error("Distance traveled must be finite and non-negative (got {0})")]
    InvalidDistance(f64),
    #[error("The refreshed route does not have the same legs and steps as the current route")]
    IncompatibleRefresh,
}

impl ProgressError {
    /// Checks that `index` is a valid position in a collection of `count` items.
    pub(crate) fn check_index(kind: IndexKind, index: usize, count: usize) -> Result<(), Self> {
        if index < count {
            Ok(())
        } else {
            Err(ProgressError::OutOfRange { kind, index, count })
        }
    }
}

/// The reason a congestion classification could not be computed.
///
/// Traffic coloring is cosmetic, so this never escapes as a hard failure
/// from [`RouteProgress::dominant_congestion_level`](crate::RouteProgress::dominant_congestion_level);
/// the classification falls back to [`CongestionLevel::Unknown`](crate::CongestionLevel::Unknown).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StaleCongestionData {
    #[error("The number of coordinates passed on the current step is negative or undefined")]
    InvalidCoordinatesPassed,
    #[error("There is no congestion data for step {step_index} of leg {leg_index}")]
    MissingStep { leg_index: usize, step_index: usize },
    #[error("{coordinates_passed} coordinates were passed, but the step only has {segment_count} segments")]
    CoordinatesPassedOutOfBounds {
        coordinates_passed: usize,
        segment_count: usize,
    },
}
