use super::StepProgress;
use crate::alert::AlertLevel;
use crate::error::{IndexKind, ProgressError};
use crate::fraction;
use crate::route::{Leg, Route, StepId, StepRef};
use std::sync::Arc;
use tracing::trace;

/// Progress along a single leg of a route.
#[derive(Debug, Clone)]
pub struct LegProgress {
    route: Arc<Route>,
    leg_index: usize,
    step_index: usize,
    current_step_progress: StepProgress,
    alert_user_level: AlertLevel,
    user_has_arrived_at_waypoint: bool,
}

impl LegProgress {
    /// Starts tracking progress on leg `leg_index` of `route`, at step `step_index`.
    ///
    /// # Errors
    ///
    /// Fails with [`ProgressError::OutOfRange`] if either index is outside the route.
    pub fn new(route: Arc<Route>, leg_index: usize, step_index: usize) -> Result<Self, ProgressError> {
        let leg_count = route.legs().len();
        let Some(leg) = route.leg(leg_index) else {
            return Err(ProgressError::OutOfRange {
                kind: IndexKind::Leg,
                index: leg_index,
                count: leg_count,
            });
        };
        ProgressError::check_index(IndexKind::Step, step_index, leg.steps().len())?;

        let step_id = leg.steps()[step_index];
        let current_step_progress = StepProgress::new(Arc::clone(&route), step_id);
        Ok(Self {
            route,
            leg_index,
            step_index,
            current_step_progress,
            alert_user_level: AlertLevel::None,
            user_has_arrived_at_waypoint: false,
        })
    }

    #[inline]
    pub fn leg(&self) -> &Leg {
        &self.route.legs()[self.leg_index]
    }

    #[inline]
    pub fn leg_index(&self) -> usize {
        self.leg_index
    }

    /// The index of the current step within the leg.
    #[inline]
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Moves to step `step_index`, starting it from zero distance traveled.
    ///
    /// # Errors
    ///
    /// Fails with [`ProgressError::OutOfRange`] if the leg has no such step.
    /// The current state is left untouched in that case.
    pub fn set_step_index(&mut self, step_index: usize) -> Result<(), ProgressError> {
        let steps = self.leg().steps();
        ProgressError::check_index(IndexKind::Step, step_index, steps.len())?;

        let step_id = steps[step_index];
        trace!(leg_index = self.leg_index, step_index, "Advancing step");
        self.step_index = step_index;
        self.current_step_progress = StepProgress::new(Arc::clone(&self.route), step_id);
        Ok(())
    }

    #[inline]
    pub fn current_step_progress(&self) -> &StepProgress {
        &self.current_step_progress
    }

    #[inline]
    pub(crate) fn current_step_progress_mut(&mut self) -> &mut StepProgress {
        &mut self.current_step_progress
    }

    /// The alert level for the current step, as last set by the navigation controller.
    #[inline]
    pub fn alert_user_level(&self) -> AlertLevel {
        self.alert_user_level
    }

    /// Records the alert level for the current step.
    ///
    /// Any level is accepted at any time; transitions are owned by the navigation controller.
    #[inline]
    pub fn set_alert_level(&mut self, level: AlertLevel) {
        self.alert_user_level = level;
    }

    #[inline]
    pub fn user_has_arrived_at_waypoint(&self) -> bool {
        self.user_has_arrived_at_waypoint
    }

    #[inline]
    pub fn set_user_has_arrived_at_waypoint(&mut self, arrived: bool) {
        self.user_has_arrived_at_waypoint = arrived;
    }

    /// Distance traveled along this leg, in meters.
    ///
    /// This is all of the prior steps plus the progress on the current step.
    pub fn distance_traveled(&self) -> f64 {
        self.leg().steps()[..self.step_index]
            .iter()
            .map(|id| self.route[*id].distance())
            .sum::<f64>()
            + self.current_step_progress.distance_traveled()
    }

    /// Distance left on this leg, in meters.
    #[inline]
    pub fn distance_remaining(&self) -> f64 {
        self.leg().distance() - self.distance_traveled()
    }

    /// Seconds left on this leg.
    ///
    /// This is the expected travel time of all subsequent steps plus what's left of the current one.
    pub fn duration_remaining(&self) -> f64 {
        self.leg().steps()[self.step_index + 1..]
            .iter()
            .map(|id| self.route[*id].expected_travel_time())
            .sum::<f64>()
            + self.current_step_progress.duration_remaining()
    }

    /// How far along the leg the traveler is, where 1 is the end of the leg.
    ///
    /// Zero-length legs report 0.
    #[inline]
    pub fn fraction_traveled(&self) -> f64 {
        fraction(self.distance_traveled(), self.leg().distance())
    }

    /// The posted speed limit (km/h) where the traveler is, if the leg is annotated with one.
    ///
    /// The segment is picked from the fraction of the current step traveled.
    /// At the end of a step, the limit of the next step's first segment applies.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn current_speed_limit(&self) -> Option<f64> {
        let leg = self.leg();
        let speeds = leg.segment_maximum_speeds()?;
        let ranges = leg.segment_ranges();
        let mut range = ranges.get(self.step_index)?.clone();

        let segments_passed =
            (range.len() as f64 * self.current_step_progress.fraction_traveled()).floor();
        if !segments_passed.is_finite() || segments_passed < 0.0 {
            return None;
        }
        let mut index = segments_passed as usize;
        if index >= range.len() {
            if let Some(next) = ranges.get(self.step_index + 1) {
                range = next.clone();
                index = 0;
            }
        }

        if index < range.len() && range.end <= speeds.len() {
            speeds[range.start + index]
        } else {
            None
        }
    }

    fn step_at(&self, index: usize) -> Option<StepRef<'_>> {
        self.leg()
            .steps()
            .get(index)
            .map(|id| self.route.step_ref(*id))
    }

    #[inline]
    pub fn current_step(&self) -> StepRef<'_> {
        self.route.step_ref(self.current_step_progress.step_id())
    }

    /// The step before the current one, if any.
    pub fn prior_step(&self) -> Option<StepRef<'_>> {
        self.step_index.checked_sub(1).and_then(|i| self.step_at(i))
    }

    /// The step after the current one, if any.
    pub fn upcoming_step(&self) -> Option<StepRef<'_>> {
        self.step_at(self.step_index + 1)
    }

    /// The step two steps ahead of the current one, if any.
    pub fn follow_on_step(&self) -> Option<StepRef<'_>> {
        self.step_at(self.step_index + 2)
    }

    /// The steps after the current one.
    pub fn remaining_steps(&self) -> impl Iterator<Item = StepRef<'_>> {
        self.leg().steps()[self.step_index + 1..]
            .iter()
            .map(move |id| self.route.step_ref(*id))
    }

    /// The step immediately before `step` in this leg.
    ///
    /// Returns `None` if `step` is the first step or is not part of this leg.
    pub fn step_before(&self, step: StepId) -> Option<StepRef<'_>> {
        let index = self.leg().position_of(step)?;
        index.checked_sub(1).and_then(|i| self.step_at(i))
    }

    /// The step immediately after `step` in this leg.
    ///
    /// Returns `None` if `step` is the last step or is not part of this leg.
    pub fn step_after(&self, step: StepId) -> Option<StepRef<'_>> {
        let index = self.leg().position_of(step)?;
        self.step_at(index + 1)
    }

    /// Whether `step` is the step currently being traveled.
    #[inline]
    pub fn is_current_step(&self, step: StepId) -> bool {
        self.current_step_progress.step_id() == step
    }
}
