//! # Congestion-weighted time bucketing
//!
//! Legs may carry traffic annotations for every inter-coordinate segment.
//! These are denser than the maneuver data, so they are first projected onto steps
//! when a route is built ([`project_leg_congestion`]),
//! and then summed per congestion level over whatever is left to travel
//! ([`remaining_congestion_times`]) to find the level that dominates the remaining time.

use crate::error::StaleCongestionData;
use crate::progress::RouteProgress;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::Range;
use tracing::debug;

/// Below this many seconds remaining, traffic coloring is not meaningful.
pub const MINIMUM_DURATION_FOR_CONGESTION: f64 = 60.0;

const LEVEL_COUNT: usize = 5;

/// A traffic-density classification.
///
/// Variants are declared in increasing order of severity,
/// so the derived [`Ord`] doubles as the severity ranking used to break ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    #[default]
    Unknown,
    Low,
    Moderate,
    Heavy,
    Severe,
}

impl CongestionLevel {
    /// All levels, least severe first.
    pub const ALL: [CongestionLevel; LEVEL_COUNT] = [
        CongestionLevel::Unknown,
        CongestionLevel::Low,
        CongestionLevel::Moderate,
        CongestionLevel::Heavy,
        CongestionLevel::Severe,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CongestionLevel::Unknown => "unknown",
            CongestionLevel::Low => "low",
            CongestionLevel::Moderate => "moderate",
            CongestionLevel::Heavy => "heavy",
            CongestionLevel::Severe => "severe",
        }
    }

    #[inline]
    const fn bucket(self) -> usize {
        self as usize
    }
}

impl Display for CongestionLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A congestion level paired with the expected travel time (seconds) of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedCongestion {
    pub level: CongestionLevel,
    pub seconds: f64,
}

/// Total expected travel time per congestion level.
///
/// Serializes as a map containing only the levels with time accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CongestionTimes([f64; LEVEL_COUNT]);

impl CongestionTimes {
    /// Adds `seconds` to the bucket for `level`.
    #[inline]
    pub fn add(&mut self, level: CongestionLevel, seconds: f64) {
        self.0[level.bucket()] += seconds;
    }

    /// Adds every bucket of `other` into this one.
    pub fn merge(&mut self, other: &CongestionTimes) {
        for (total, seconds) in self.0.iter_mut().zip(other.0) {
            *total += seconds;
        }
    }

    /// The accumulated time for `level`, in seconds.
    #[inline]
    pub fn get(&self, level: CongestionLevel) -> f64 {
        self.0[level.bucket()]
    }

    /// The accumulated time across all levels, in seconds.
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Iterates over every level and its accumulated time, least severe first.
    pub fn iter(&self) -> impl Iterator<Item = (CongestionLevel, f64)> + '_ {
        CongestionLevel::ALL.into_iter().zip(self.0.iter().copied())
    }

    /// The level with the most accumulated time.
    ///
    /// Ties go to the more severe level.
    /// Returns `None` when no level has any positive time.
    pub fn dominant(&self) -> Option<CongestionLevel> {
        self.iter()
            .filter(|(_, seconds)| *seconds > 0.0)
            // max_by returns the last of equal elements, and iteration is least severe first
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(level, _)| level)
    }
}

impl FromIterator<TimedCongestion> for CongestionTimes {
    fn from_iter<I: IntoIterator<Item = TimedCongestion>>(iter: I) -> Self {
        let mut times = CongestionTimes::default();
        for segment in iter {
            times.add(segment.level, segment.seconds);
        }
        times
    }
}

impl Serialize for CongestionTimes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (level, seconds) in self.iter().filter(|(_, seconds)| *seconds > 0.0) {
            map.serialize_entry(level.as_str(), &seconds)?;
        }
        map.end()
    }
}

/// The congestion data of a single step: its segments in travel order, and their totals per level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepCongestion {
    segments: Vec<TimedCongestion>,
    totals: CongestionTimes,
}

impl StepCongestion {
    pub fn new(segments: Vec<TimedCongestion>) -> Self {
        let totals = segments.iter().copied().collect();
        Self { segments, totals }
    }

    #[inline]
    pub fn segments(&self) -> &[TimedCongestion] {
        &self.segments
    }

    #[inline]
    pub fn totals(&self) -> &CongestionTimes {
        &self.totals
    }
}

/// Slices a leg's segment annotations into per-step congestion.
///
/// `segment_ranges` holds the leg segments covered by each step of the leg (see [`Leg::segment_ranges`]).
///
/// Projection stops at the first step whose segments run past the end of either annotation array;
/// that step and the ones after it get no entry.
///
/// [`Leg::segment_ranges`]: crate::route::Leg::segment_ranges
pub fn project_leg_congestion(
    segment_ranges: &[Range<usize>],
    levels: &[CongestionLevel],
    times: &[f64],
) -> Vec<StepCongestion> {
    let available = levels.len().min(times.len());
    let mut result = Vec::with_capacity(segment_ranges.len());
    for range in segment_ranges {
        if range.end > available {
            debug!(
                end = range.end,
                available, "Segment annotations do not cover every step of the leg"
            );
            break;
        }

        let segments = levels[range.clone()]
            .iter()
            .zip(&times[range.clone()])
            .map(|(&level, &seconds)| TimedCongestion { level, seconds })
            .collect();
        result.push(StepCongestion::new(segments));
    }

    result
}

/// How much of the remaining route to consider when classifying congestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionScope {
    /// The rest of the current leg.
    Leg,
    /// The rest of the current leg and every leg after it.
    Route,
}

/// Sums the expected travel time per congestion level over what remains of `scope`.
///
/// This includes the untraveled segments of the current step
/// plus every segment of the later steps in scope.
///
/// # Errors
///
/// Returns [`StaleCongestionData`] when the current position cannot be matched
/// to the projected segment data (missing annotations, misaligned coordinates,
/// or a negative/undefined traveled fraction).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn remaining_congestion_times(
    progress: &RouteProgress,
    scope: CongestionScope,
) -> Result<CongestionTimes, StaleCongestionData> {
    let leg_index = progress.leg_index();
    let leg_progress = progress.current_leg_progress();
    let step_index = leg_progress.step_index();
    let step_progress = leg_progress.current_step_progress();

    let coordinates_passed =
        (step_progress.step().coordinate_count() as f64 * step_progress.fraction_traveled()).floor();
    if !coordinates_passed.is_finite() || coordinates_passed < 0.0 {
        return Err(StaleCongestionData::InvalidCoordinatesPassed);
    }
    let coordinates_passed = coordinates_passed as usize;

    let congestion_by_step = leg_progress.leg().congestion_by_step();
    let Some(current_step) = congestion_by_step.get(step_index) else {
        return Err(StaleCongestionData::MissingStep {
            leg_index,
            step_index,
        });
    };

    let Some(remaining_on_step) = current_step.segments().get(coordinates_passed..) else {
        return Err(StaleCongestionData::CoordinatesPassedOutOfBounds {
            coordinates_passed,
            segment_count: current_step.segments().len(),
        });
    };

    let mut totals = CongestionTimes::default();
    for step in &congestion_by_step[step_index + 1..] {
        totals.merge(step.totals());
    }

    if scope == CongestionScope::Route {
        for leg in progress.remaining_legs() {
            for step in leg.congestion_by_step() {
                totals.merge(step.totals());
            }
        }
    }

    for segment in remaining_on_step {
        totals.add(segment.level, segment.seconds);
    }

    Ok(totals)
}

/// Classifies the congestion level that dominates the remaining travel time in `scope`.
///
/// Falls back to [`CongestionLevel::Unknown`] when the data is stale,
/// or when no time has been accumulated at all.
/// It also does so when less than [`MINIMUM_DURATION_FOR_CONGESTION`] seconds remain on the whole route,
/// whatever the scope: a short final stretch of one leg still gets colored while later legs follow.
pub fn dominant_congestion_level(progress: &RouteProgress, scope: CongestionScope) -> CongestionLevel {
    let totals = match remaining_congestion_times(progress, scope) {
        Ok(totals) => totals,
        Err(reason) => {
            debug!(%reason, ?scope, "Falling back to unknown congestion");
            return CongestionLevel::Unknown;
        }
    };

    if progress.duration_remaining() < MINIMUM_DURATION_FOR_CONGESTION {
        return CongestionLevel::Unknown;
    }

    totals.dominant().unwrap_or(CongestionLevel::Unknown)
}
