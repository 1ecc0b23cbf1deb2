use crate::error::ProgressError;
use crate::fraction;
use crate::route::{Intersection, Route, Step, StepId};
use std::sync::Arc;

/// Progress along a single step.
///
/// Only the distance traveled is tracked.
/// Duration remaining is interpolated from the traveled fraction and the step's expected travel time,
/// so it is recomputed on every update instead of drifting.
#[derive(Debug, Clone)]
pub struct StepProgress {
    route: Arc<Route>,
    step_id: StepId,
    distance_traveled: f64,
}

impl StepProgress {
    pub(crate) fn new(route: Arc<Route>, step_id: StepId) -> Self {
        Self {
            route,
            step_id,
            distance_traveled: 0.0,
        }
    }

    #[inline]
    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    #[inline]
    pub fn step(&self) -> &Step {
        &self.route[self.step_id]
    }

    /// Distance traveled along this step, in meters.
    #[inline]
    pub fn distance_traveled(&self) -> f64 {
        self.distance_traveled
    }

    /// Sets the distance traveled along this step.
    ///
    /// Values past the end of the step are tolerated
    /// (the remaining distance simply goes negative).
    ///
    /// # Errors
    ///
    /// Fails with [`ProgressError::InvalidDistance`] if `meters` is negative or not finite.
    pub fn set_distance_traveled(&mut self, meters: f64) -> Result<(), ProgressError> {
        if !meters.is_finite() || meters < 0.0 {
            return Err(ProgressError::InvalidDistance(meters));
        }

        self.distance_traveled = meters;
        Ok(())
    }

    /// Distance left until the end of this step, in meters.
    #[inline]
    pub fn distance_remaining(&self) -> f64 {
        self.step().distance() - self.distance_traveled
    }

    /// How far along the step the traveler is, where 1 is the end of the step.
    ///
    /// Zero-length steps report 0.
    #[inline]
    pub fn fraction_traveled(&self) -> f64 {
        fraction(self.distance_traveled, self.step().distance())
    }

    /// Seconds left until the end of this step.
    #[inline]
    pub fn duration_remaining(&self) -> f64 {
        (1.0 - self.fraction_traveled()) * self.step().expected_travel_time()
    }

    /// The step's intersections followed by the one at its closing maneuver, if known.
    pub fn intersections(&self) -> impl Iterator<Item = &Intersection> {
        let step = self.step();
        step.intersections()
            .iter()
            .chain(step.maneuver_intersection())
    }

    /// The index (into [`StepProgress::intersections`]) of the last intersection passed.
    ///
    /// This is 0 before the first intersection has been reached.
    pub fn intersection_index(&self) -> usize {
        self.intersections()
            .take_while(|intersection| intersection.distance_from_start() <= self.distance_traveled)
            .count()
            .saturating_sub(1)
    }

    /// The last intersection passed.
    pub fn current_intersection(&self) -> Option<&Intersection> {
        self.intersections().nth(self.intersection_index())
    }

    /// The next intersection ahead on this step.
    pub fn upcoming_intersection(&self) -> Option<&Intersection> {
        self.intersections().nth(self.intersection_index() + 1)
    }

    /// Meters left until the upcoming intersection.
    pub fn distance_to_upcoming_intersection(&self) -> Option<f64> {
        self.upcoming_intersection()
            .map(|intersection| intersection.distance_from_start() - self.distance_traveled)
    }
}
