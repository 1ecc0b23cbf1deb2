//! # Route model
//!
//! The immutable description of a planned route: ordered legs,
//! each made of ordered steps, with optional per-segment congestion annotations on the legs.
//!
//! Routes are built once from a [`RouteDefinition`] (the serializable form produced by route planning)
//! and then shared read-only, usually behind an [`Arc`](std::sync::Arc).
//! Steps live in an arena and are referred to by [`StepId`],
//! so two steps with identical contents at different positions remain distinguishable.

use crate::congestion::{CongestionLevel, StepCongestion, project_leg_congestion};
use crate::error::ProgressError;
use geo::{Coord, LineString};
use id_arena::{Arena, Id};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::ops::{Deref, Index, Range};
use tracing::warn;

/// A stable handle identifying one step of one [`Route`].
///
/// Handles compare by identity (position in the route), never by step contents.
pub type StepId = Id<Step>;

/// The kind of maneuver that ends a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maneuver {
    Depart,
    Turn,
    Continue,
    Arrive,
    #[default]
    Other,
}

/// A junction along a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    location: Coord<f64>,
    distance_from_start: f64,
}

impl Intersection {
    #[inline]
    pub fn location(&self) -> Coord<f64> {
        self.location
    }

    /// Meters from the start of the step to this intersection.
    #[inline]
    pub fn distance_from_start(&self) -> f64 {
        self.distance_from_start
    }
}

impl From<IntersectionDefinition> for Intersection {
    fn from(value: IntersectionDefinition) -> Self {
        Self {
            location: Coord::from(value.location),
            distance_from_start: value.distance_from_start,
        }
    }
}

/// One maneuver-to-maneuver portion of a leg.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    distance: f64,
    expected_travel_time: f64,
    shape: LineString<f64>,
    maneuver: Maneuver,
    instruction: Option<String>,
    intersections: Vec<Intersection>,
    maneuver_intersection: Option<Intersection>,
}

impl Step {
    /// The length of the step, in meters.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// The expected time to travel the whole step, in seconds.
    #[inline]
    pub fn expected_travel_time(&self) -> f64 {
        self.expected_travel_time
    }

    /// The step geometry.
    #[inline]
    pub fn shape(&self) -> &LineString<f64> {
        &self.shape
    }

    /// The number of coordinates in the step geometry.
    #[inline]
    pub fn coordinate_count(&self) -> usize {
        self.shape.0.len()
    }

    /// The number of inter-coordinate segments in the step geometry.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.coordinate_count().saturating_sub(1)
    }

    #[inline]
    pub fn maneuver(&self) -> Maneuver {
        self.maneuver
    }

    #[inline]
    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    /// The intersections along this step, ordered by distance from its start.
    #[inline]
    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    /// The intersection where the maneuver ending this step happens.
    ///
    /// This is the first intersection of the next step in the same leg,
    /// placed at the end of this step.
    #[inline]
    pub fn maneuver_intersection(&self) -> Option<&Intersection> {
        self.maneuver_intersection.as_ref()
    }
}

impl From<StepDefinition> for Step {
    fn from(value: StepDefinition) -> Self {
        Self {
            distance: value.distance,
            expected_travel_time: value.expected_travel_time,
            shape: LineString::from(value.coordinates),
            maneuver: value.maneuver,
            instruction: value.instruction,
            intersections: value
                .intersections
                .into_iter()
                .map(Intersection::from)
                .collect(),
            maneuver_intersection: None,
        }
    }
}

/// A step together with its identity in the route.
///
/// Dereferences to the [`Step`], so it can be used wherever the step contents are needed.
#[derive(Debug, Clone, Copy)]
pub struct StepRef<'a> {
    id: StepId,
    step: &'a Step,
}

impl<'a> StepRef<'a> {
    #[inline]
    pub fn id(&self) -> StepId {
        self.id
    }

    #[inline]
    pub fn step(&self) -> &'a Step {
        self.step
    }
}

impl Deref for StepRef<'_> {
    type Target = Step;

    fn deref(&self) -> &Step {
        self.step
    }
}

/// The portion of a route between two consecutive waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    steps: Vec<StepId>,
    distance: f64,
    expected_travel_time: f64,
    source: Option<String>,
    destination: Option<String>,
    segment_ranges: Vec<Range<usize>>,
    congestion_by_step: Vec<StepCongestion>,
    segment_maximum_speeds: Option<Vec<Option<f64>>>,
}

impl Leg {
    /// The steps of this leg, in travel order.
    ///
    /// Never empty.
    #[inline]
    pub fn steps(&self) -> &[StepId] {
        &self.steps
    }

    /// The length of the leg, in meters.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// The expected time to travel the whole leg, in seconds.
    #[inline]
    pub fn expected_travel_time(&self) -> f64 {
        self.expected_travel_time
    }

    /// The name of the waypoint this leg starts at, if known.
    #[inline]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The name of the waypoint this leg ends at, if known.
    #[inline]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// The leg segments covered by each step, parallel to [`Leg::steps`].
    ///
    /// Consecutive steps share their maneuver coordinate,
    /// so each range starts where the previous one ends.
    #[inline]
    pub fn segment_ranges(&self) -> &[Range<usize>] {
        &self.segment_ranges
    }

    /// The posted speed limit (km/h) of every leg segment, where known.
    #[inline]
    pub fn segment_maximum_speeds(&self) -> Option<&[Option<f64>]> {
        self.segment_maximum_speeds.as_deref()
    }

    /// Per-step congestion, projected from the leg's segment annotations.
    ///
    /// This may be shorter than [`Leg::steps`] (or empty)
    /// when the annotations are missing or do not cover every step.
    #[inline]
    pub fn congestion_by_step(&self) -> &[StepCongestion] {
        &self.congestion_by_step
    }

    /// The position of `step` within this leg, by identity.
    pub fn position_of(&self, step: StepId) -> Option<usize> {
        self.steps.iter().position(|id| *id == step)
    }
}

/// A full planned path from origin to final destination.
///
/// Immutable after construction.
/// A reroute produces a new route rather than modifying this one.
pub struct Route {
    steps: Arena<Step>,
    legs: Vec<Leg>,
    distance: f64,
    expected_travel_time: f64,
}

impl Route {
    /// The legs of this route, in travel order.
    ///
    /// Never empty.
    #[inline]
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    #[inline]
    pub fn leg(&self, index: usize) -> Option<&Leg> {
        self.legs.get(index)
    }

    /// Looks up a step by handle.
    ///
    /// Returns `None` for handles belonging to a different route.
    #[inline]
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.get(id)
    }

    /// The total length of the route (the sum of its leg distances), in meters.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// The total expected travel time (the sum over its legs), in seconds.
    #[inline]
    pub fn expected_travel_time(&self) -> f64 {
        self.expected_travel_time
    }

    /// The total number of steps across all legs.
    #[inline]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn step_ref(&self, id: StepId) -> StepRef<'_> {
        StepRef { id, step: &self[id] }
    }

    /// Whether `other` has the same number of legs, and the same number of steps in each leg.
    pub(crate) fn has_same_structure(&self, other: &Route) -> bool {
        self.legs.len() == other.legs.len()
            && self
                .legs
                .iter()
                .zip(&other.legs)
                .all(|(a, b)| a.steps.len() == b.steps.len())
    }
}

impl Index<StepId> for Route {
    type Output = Step;

    fn index(&self, id: StepId) -> &Step {
        &self.steps[id]
    }
}

impl Debug for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("legs", &self.legs)
            .field("step_count", &self.steps.len())
            .field("distance", &self.distance)
            .field("expected_travel_time", &self.expected_travel_time)
            .finish()
    }
}

impl TryFrom<RouteDefinition> for Route {
    type Error = ProgressError;

    fn try_from(value: RouteDefinition) -> Result<Self, Self::Error> {
        if value.legs.is_empty() {
            return Err(ProgressError::EmptyRoute);
        }

        let mut steps = Arena::new();
        let mut legs = Vec::with_capacity(value.legs.len());
        for (leg_index, leg) in value.legs.into_iter().enumerate() {
            if leg.steps.is_empty() {
                return Err(ProgressError::EmptyLeg { leg_index });
            }

            let segment_ranges: Vec<Range<usize>> = leg
                .steps
                .iter()
                .scan(0, |start, step| {
                    let end = *start + step.coordinates.len().saturating_sub(1);
                    let range = *start..end;
                    *start = end;
                    Some(range)
                })
                .collect();
            let maneuver_intersections: Vec<Option<IntersectionDefinition>> = leg
                .steps
                .iter()
                .skip(1)
                .map(|step| step.intersections.first().copied())
                .chain(std::iter::once(None))
                .collect();
            let step_ids: Vec<StepId> = leg
                .steps
                .into_iter()
                .zip(maneuver_intersections)
                .map(|(step, maneuver_intersection)| {
                    let mut step = Step::from(step);
                    let distance = step.distance;
                    step.maneuver_intersection =
                        maneuver_intersection.map(|intersection| Intersection {
                            distance_from_start: distance,
                            ..Intersection::from(intersection)
                        });
                    steps.alloc(step)
                })
                .collect();

            // Supplied totals are trusted; only missing ones are derived from the steps.
            let distance = leg
                .distance
                .unwrap_or_else(|| step_ids.iter().map(|id| steps[*id].distance).sum());
            let expected_travel_time = leg.expected_travel_time.unwrap_or_else(|| {
                step_ids
                    .iter()
                    .map(|id| steps[*id].expected_travel_time)
                    .sum()
            });

            let congestion_by_step = match (
                leg.segment_congestion_levels,
                leg.expected_segment_travel_times,
            ) {
                (Some(levels), Some(times)) => {
                    project_leg_congestion(&segment_ranges, &levels, &times)
                }
                (None, None) => Vec::new(),
                (Some(_), None) | (None, Some(_)) => {
                    warn!(
                        leg_index,
                        "Ignoring segment annotations; congestion levels and travel times must both be present"
                    );
                    Vec::new()
                }
            };

            legs.push(Leg {
                steps: step_ids,
                distance,
                expected_travel_time,
                source: leg.source,
                destination: leg.destination,
                segment_ranges,
                congestion_by_step,
                segment_maximum_speeds: leg.segment_maximum_speeds,
            });
        }

        let distance = legs.iter().map(Leg::distance).sum();
        let expected_travel_time = legs.iter().map(Leg::expected_travel_time).sum();
        Ok(Self {
            steps,
            legs,
            distance,
            expected_travel_time,
        })
    }
}

/// The serializable description of a route, as handed over by route planning.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub legs: Vec<LegDefinition>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegDefinition {
    pub steps: Vec<StepDefinition>,
    /// Defaults to the sum of the step distances.
    pub distance: Option<f64>,
    /// Defaults to the sum of the step travel times.
    pub expected_travel_time: Option<f64>,
    pub source: Option<String>,
    pub destination: Option<String>,
    /// One entry per inter-coordinate segment of the whole leg.
    ///
    /// Segment boundaries are independent of step boundaries;
    /// consecutive steps share their maneuver coordinate.
    pub segment_congestion_levels: Option<Vec<CongestionLevel>>,
    /// Expected travel time in seconds for each segment, parallel to `segment_congestion_levels`.
    pub expected_segment_travel_times: Option<Vec<f64>>,
    /// Posted speed limit (km/h) for each segment, `null` where unknown.
    pub segment_maximum_speeds: Option<Vec<Option<f64>>>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub distance: f64,
    pub expected_travel_time: f64,
    /// Step geometry as `[x, y]` (longitude, latitude) pairs.
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub maneuver: Maneuver,
    pub instruction: Option<String>,
    #[serde(default)]
    pub intersections: Vec<IntersectionDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionDefinition {
    /// `[x, y]` (longitude, latitude).
    pub location: [f64; 2],
    /// Meters from the start of the step.
    pub distance_from_start: f64,
}
