use super::{LegProgress, ProgressSnapshot};
use crate::alert::AlertLevel;
use crate::congestion::{
    CongestionLevel, CongestionScope, CongestionTimes, dominant_congestion_level,
    remaining_congestion_times,
};
use crate::error::{ProgressError, StaleCongestionData};
use crate::fraction;
use crate::route::{Leg, Route, StepRef};
use geo::{Coord, LineString};
use std::sync::Arc;
use tracing::debug;

/// A traveler's progress along a whole route.
///
/// This is a three-level cursor (route → [`LegProgress`] → [`StepProgress`](super::StepProgress)).
/// The navigation controller is the only writer; every derived value is computed
/// fresh from the current indices on each read.
///
/// A reroute is modeled by discarding this value and constructing a new one for the new route.
#[derive(Debug, Clone)]
pub struct RouteProgress {
    route: Arc<Route>,
    current_leg_progress: LegProgress,
}

impl RouteProgress {
    /// Starts tracking progress on `route`, at the first step of leg `leg_index`.
    ///
    /// # Errors
    ///
    /// Fails with [`ProgressError::OutOfRange`] if the route has no such leg.
    pub fn new(route: Arc<Route>, leg_index: usize) -> Result<Self, ProgressError> {
        let current_leg_progress = LegProgress::new(Arc::clone(&route), leg_index, 0)?;
        Ok(Self {
            route,
            current_leg_progress,
        })
    }

    /// Sets the initial alert level of the current leg.
    #[must_use]
    pub fn with_alert_level(mut self, level: AlertLevel) -> Self {
        self.current_leg_progress.set_alert_level(level);
        self
    }

    /// Continues the current progress on a refreshed copy of the route.
    ///
    /// A refresh carries new annotations (ex: live traffic) for the same legs and steps.
    /// The leg and step indexes, the distance traveled on the current step, and the alert level carry over.
    ///
    /// # Errors
    ///
    /// Fails with [`ProgressError::IncompatibleRefresh`] if the refreshed route
    /// does not have the same number of legs, and the same number of steps in each leg.
    pub fn refreshed(self, route: Arc<Route>) -> Result<Self, ProgressError> {
        if !self.route.has_same_structure(&route) {
            return Err(ProgressError::IncompatibleRefresh);
        }

        let previous = self.current_leg_progress;
        let mut current_leg_progress =
            LegProgress::new(Arc::clone(&route), previous.leg_index(), previous.step_index())?;
        current_leg_progress
            .current_step_progress_mut()
            .set_distance_traveled(previous.current_step_progress().distance_traveled())?;
        current_leg_progress.set_alert_level(previous.alert_user_level());
        current_leg_progress.set_user_has_arrived_at_waypoint(previous.user_has_arrived_at_waypoint());

        Ok(Self {
            route,
            current_leg_progress,
        })
    }

    #[inline]
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    // Navigation controller input

    /// Moves to leg `leg_index`.
    ///
    /// Progress on the new leg always restarts at its first step,
    /// with zero distance traveled and no alert level.
    ///
    /// # Errors
    ///
    /// Fails with [`ProgressError::OutOfRange`] if the route has no such leg.
    /// The current state is left untouched in that case.
    pub fn advance_leg(&mut self, leg_index: usize) -> Result<(), ProgressError> {
        let current_leg_progress = LegProgress::new(Arc::clone(&self.route), leg_index, 0)?;
        debug!(from = self.leg_index(), to = leg_index, "Advancing leg");
        self.current_leg_progress = current_leg_progress;
        Ok(())
    }

    /// Moves to step `step_index` of the current leg.
    ///
    /// # Errors
    ///
    /// Fails with [`ProgressError::OutOfRange`] if the current leg has no such step.
    pub fn advance_step(&mut self, step_index: usize) -> Result<(), ProgressError> {
        self.current_leg_progress.set_step_index(step_index)
    }

    /// Sets the distance traveled along the current step, in meters.
    ///
    /// # Errors
    ///
    /// Fails with [`ProgressError::InvalidDistance`] if `meters` is negative or not finite.
    pub fn set_distance_traveled(&mut self, meters: f64) -> Result<(), ProgressError> {
        self.current_leg_progress
            .current_step_progress_mut()
            .set_distance_traveled(meters)
    }

    /// Sets the alert level of the current leg.
    pub fn set_alert_level(&mut self, level: AlertLevel) {
        self.current_leg_progress.set_alert_level(level);
    }

    /// Records whether the traveler has reached the current leg's destination waypoint.
    pub fn set_user_has_arrived_at_waypoint(&mut self, arrived: bool) {
        self.current_leg_progress
            .set_user_has_arrived_at_waypoint(arrived);
    }

    // Leg statistics

    /// The index of the current leg.
    #[inline]
    pub fn leg_index(&self) -> usize {
        self.current_leg_progress.leg_index()
    }

    #[inline]
    pub fn current_leg(&self) -> &Leg {
        self.current_leg_progress.leg()
    }

    #[inline]
    pub fn current_leg_progress(&self) -> &LegProgress {
        &self.current_leg_progress
    }

    pub fn prior_leg(&self) -> Option<&Leg> {
        self.leg_index()
            .checked_sub(1)
            .and_then(|i| self.route.leg(i))
    }

    /// The leg after the current one, or `None` on the final leg.
    pub fn upcoming_leg(&self) -> Option<&Leg> {
        self.route.leg(self.leg_index() + 1)
    }

    /// The legs after the current one.
    #[inline]
    pub fn remaining_legs(&self) -> &[Leg] {
        &self.route.legs()[self.leg_index() + 1..]
    }

    #[inline]
    pub fn is_final_leg(&self) -> bool {
        self.leg_index() + 1 == self.route.legs().len()
    }

    /// The named waypoints still ahead, including the current leg's destination.
    pub fn remaining_waypoints(&self) -> Vec<&str> {
        self.route.legs()[self.leg_index()..]
            .iter()
            .filter_map(Leg::destination)
            .collect()
    }

    // Step statistics

    /// The step before the current one, which may be the last step of the prior leg.
    pub fn prior_step(&self) -> Option<StepRef<'_>> {
        self.current_leg_progress.prior_step().or_else(|| {
            self.prior_leg()
                .and_then(|leg| leg.steps().last())
                .map(|id| self.route.step_ref(*id))
        })
    }

    /// The step after the current one, which may be the first step of the next leg.
    pub fn upcoming_step(&self) -> Option<StepRef<'_>> {
        self.current_leg_progress.upcoming_step().or_else(|| {
            self.upcoming_leg()
                .and_then(|leg| leg.steps().first())
                .map(|id| self.route.step_ref(*id))
        })
    }

    /// Every step after the current one, across all remaining legs.
    pub fn remaining_steps(&self) -> impl Iterator<Item = StepRef<'_>> {
        self.current_leg_progress.remaining_steps().chain(
            self.remaining_legs()
                .iter()
                .flat_map(Leg::steps)
                .map(move |id| self.route.step_ref(*id)),
        )
    }

    /// The geometry of the current step joined with its neighbors (which may be on adjacent legs).
    ///
    /// Maneuver coordinates shared between steps appear only once.
    pub fn nearby_shape(&self) -> LineString<f64> {
        let current = self.current_leg_progress.current_step();
        let prior = self.prior_step();
        let upcoming = self.upcoming_step();

        let prior_coords = prior
            .map(|step| step.step())
            .into_iter()
            .flat_map(|step| without_last(&step.shape().0).iter().copied());
        let upcoming_coords = upcoming
            .map(|step| step.step())
            .into_iter()
            .flat_map(|step| step.shape().0.iter().skip(1).copied());

        prior_coords
            .chain(current.shape().0.iter().copied())
            .chain(upcoming_coords)
            .collect::<Vec<Coord<f64>>>()
            .into()
    }

    // Route statistics

    /// Distance traveled along the whole route, in meters.
    ///
    /// This is all of the prior legs plus the progress on the current leg.
    pub fn distance_traveled(&self) -> f64 {
        self.route.legs()[..self.leg_index()]
            .iter()
            .map(Leg::distance)
            .sum::<f64>()
            + self.current_leg_progress.distance_traveled()
    }

    /// Distance left on the whole route, in meters.
    #[inline]
    pub fn distance_remaining(&self) -> f64 {
        self.route.distance() - self.distance_traveled()
    }

    /// Seconds left on the whole route.
    ///
    /// This is the expected travel time of all subsequent legs plus what's left of the current one.
    pub fn duration_remaining(&self) -> f64 {
        self.remaining_legs()
            .iter()
            .map(Leg::expected_travel_time)
            .sum::<f64>()
            + self.current_leg_progress.duration_remaining()
    }

    /// How far along the route the traveler is, where 1 is the destination.
    ///
    /// Zero-length routes report 0.
    #[inline]
    pub fn fraction_traveled(&self) -> f64 {
        fraction(self.distance_traveled(), self.route.distance())
    }

    // Congestion

    /// Total expected travel time per congestion level over what remains of `scope`.
    ///
    /// # Errors
    ///
    /// See [`remaining_congestion_times`].
    pub fn remaining_congestion_times(
        &self,
        scope: CongestionScope,
    ) -> Result<CongestionTimes, StaleCongestionData> {
        remaining_congestion_times(self, scope)
    }

    /// The congestion level that dominates the remaining travel time in `scope`.
    ///
    /// See [`dominant_congestion_level`] for the fallback rules.
    pub fn dominant_congestion_level(&self, scope: CongestionScope) -> CongestionLevel {
        dominant_congestion_level(self, scope)
    }

    /// Captures every derived value in a serializable form for presentation.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self)
    }
}

/// All but the last element of a slice.
fn without_last<T>(items: &[T]) -> &[T] {
    items.split_last().map_or(items, |(_, rest)| rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{leg, route_of, step, three_leg_route, two_step_route};
    use proptest::prelude::*;

    #[test]
    fn test_single_leg_scenario() {
        let mut progress =
            RouteProgress::new(Arc::new(two_step_route()), 0).expect("valid leg index");
        progress.set_distance_traveled(250.0).expect("valid distance");
        assert_eq!(progress.distance_traveled(), 250.0);
        assert_eq!(progress.duration_remaining(), 125.0);
        assert_eq!(progress.distance_remaining(), 1250.0);

        progress.advance_step(1).expect("valid step index");
        assert_eq!(
            progress
                .current_leg_progress()
                .current_step_progress()
                .distance_traveled(),
            0.0
        );
        assert_eq!(progress.distance_traveled(), 1000.0);
        assert!(progress.is_final_leg());
    }

    #[test]
    fn test_prior_legs_and_subsequent_legs() {
        let mut progress = RouteProgress::new(three_leg_route(), 0).expect("valid leg index");
        assert_eq!(progress.route().distance(), 2100.0);
        assert_eq!(progress.duration_remaining(), 210.0);

        progress.advance_leg(1).expect("valid leg index");
        progress.advance_step(1).expect("valid step index");
        progress.set_distance_traveled(100.0).expect("valid distance");

        // Leg 0 (300) + step 0 of leg 1 (300) + 100
        assert_eq!(progress.distance_traveled(), 700.0);
        assert_eq!(progress.distance_remaining(), 1400.0);
        // Leg 2 (110) + 3/4 of step 1 of leg 1 (30)
        assert_eq!(progress.duration_remaining(), 140.0);
        assert_eq!(progress.fraction_traveled(), 700.0 / 2100.0);
    }

    #[test]
    fn test_leg_advance_resets_step_progress() {
        let mut progress = RouteProgress::new(three_leg_route(), 0)
            .expect("valid leg index")
            .with_alert_level(AlertLevel::Medium);
        progress.advance_step(1).expect("valid step index");
        progress.set_distance_traveled(50.0).expect("valid distance");
        progress.set_user_has_arrived_at_waypoint(true);

        progress.advance_leg(2).expect("valid leg index");
        let leg = progress.current_leg_progress();
        assert_eq!(progress.leg_index(), 2);
        assert_eq!(leg.step_index(), 0);
        assert_eq!(leg.current_step_progress().distance_traveled(), 0.0);
        assert_eq!(leg.alert_user_level(), AlertLevel::None);
        assert!(!leg.user_has_arrived_at_waypoint());
    }

    #[test]
    fn test_leg_index_follows_the_leg_cursor() {
        let mut progress = RouteProgress::new(three_leg_route(), 0).expect("valid leg index");
        progress.advance_leg(2).expect("valid leg index");
        progress.advance_step(1).expect("valid step index");
        progress.set_distance_traveled(600.0).expect("valid distance");
        progress.set_user_has_arrived_at_waypoint(true);

        assert_eq!(progress.leg_index(), 2);
        assert_eq!(progress.current_leg_progress().leg_index(), 2);
        assert_eq!(progress.current_leg().destination(), Some("Destination"));
        assert!(progress.current_leg_progress().user_has_arrived_at_waypoint());
        assert_eq!(progress.distance_traveled(), 2100.0);
        assert_eq!(progress.distance_remaining(), 0.0);
        assert_eq!(progress.fraction_traveled(), 1.0);
    }

    #[test]
    fn test_out_of_range_leg_is_rejected() {
        assert!(RouteProgress::new(three_leg_route(), 3).is_err());

        let mut progress = RouteProgress::new(three_leg_route(), 1).expect("valid leg index");
        progress.advance_step(1).expect("valid step index");
        assert!(progress.advance_leg(3).is_err());
        assert_eq!(progress.leg_index(), 1);
        assert_eq!(progress.current_leg_progress().step_index(), 1);
    }

    #[test]
    fn test_neighbouring_legs_and_steps() {
        let mut progress = RouteProgress::new(three_leg_route(), 0).expect("valid leg index");
        assert!(progress.prior_leg().is_none());
        assert!(progress.prior_step().is_none());
        assert_eq!(progress.upcoming_step().map(|s| s.distance()), Some(200.0));
        assert_eq!(progress.remaining_steps().count(), 5);
        assert_eq!(
            progress.remaining_waypoints(),
            vec!["First stop", "Second stop", "Destination"]
        );

        progress.advance_step(1).expect("valid step index");
        // Crosses into the next leg
        assert_eq!(progress.upcoming_step().map(|s| s.distance()), Some(300.0));

        progress.advance_leg(1).expect("valid leg index");
        assert_eq!(progress.prior_step().map(|s| s.distance()), Some(200.0));
        assert_eq!(progress.prior_leg().map(Leg::distance), Some(300.0));
        assert_eq!(progress.upcoming_leg().map(Leg::distance), Some(1100.0));
        assert_eq!(progress.remaining_legs().len(), 1);
        assert_eq!(
            progress.remaining_waypoints(),
            vec!["Second stop", "Destination"]
        );

        progress.advance_leg(2).expect("valid leg index");
        progress.advance_step(1).expect("valid step index");
        assert!(progress.upcoming_step().is_none());
        assert!(progress.upcoming_leg().is_none());
        assert!(progress.is_final_leg());
        assert_eq!(progress.remaining_steps().count(), 0);
    }

    #[test]
    fn test_nearby_shape_joins_neighbours() {
        let route = Arc::new(route_of(vec![leg(vec![
            step(1.0, 1.0, 3),
            step(1.0, 1.0, 3),
            step(1.0, 1.0, 3),
        ])]));
        let mut progress = RouteProgress::new(route, 0).expect("valid leg index");
        // Current (3) + upcoming without its first coordinate (2)
        assert_eq!(progress.nearby_shape().0.len(), 5);
        progress.advance_step(1).expect("valid step index");
        // Prior without its last (2) + current (3) + upcoming without its first (2)
        assert_eq!(progress.nearby_shape().0.len(), 7);
    }

    #[test]
    fn test_refresh_keeps_position() {
        let mut progress = RouteProgress::new(three_leg_route(), 0)
            .expect("valid leg index")
            .with_alert_level(AlertLevel::High);
        progress.advance_leg(1).expect("valid leg index");
        progress.advance_step(1).expect("valid step index");
        progress.set_distance_traveled(42.0).expect("valid distance");
        progress.set_alert_level(AlertLevel::Low);

        let refreshed = progress.refreshed(three_leg_route()).expect("same structure");
        assert_eq!(refreshed.leg_index(), 1);
        let leg = refreshed.current_leg_progress();
        assert_eq!(leg.step_index(), 1);
        assert_eq!(leg.current_step_progress().distance_traveled(), 42.0);
        assert_eq!(leg.alert_user_level(), AlertLevel::Low);
    }

    #[test]
    fn test_refresh_with_different_structure_is_rejected() {
        let progress = RouteProgress::new(three_leg_route(), 0).expect("valid leg index");
        assert_eq!(
            progress.refreshed(Arc::new(two_step_route())).unwrap_err(),
            ProgressError::IncompatibleRefresh
        );
    }

    #[test]
    fn test_zero_length_route_fraction() {
        let route = Arc::new(route_of(vec![leg(vec![step(0.0, 0.0, 1)])]));
        let progress = RouteProgress::new(route, 0).expect("valid leg index");
        assert_eq!(progress.fraction_traveled(), 0.0);
        assert_eq!(progress.distance_remaining(), 0.0);
    }

    #[test]
    fn test_route_progress_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RouteProgress>();
        assert_send_sync::<Route>();
    }

    /// Legs of `(distance, expected travel time)` steps.
    fn arbitrary_legs() -> impl Strategy<Value = Vec<Vec<(f64, f64)>>> {
        proptest::collection::vec(
            proptest::collection::vec((0.0f64..5_000.0, 0.0f64..600.0), 1..5),
            1..4,
        )
    }

    fn build(legs: &[Vec<(f64, f64)>]) -> Arc<Route> {
        Arc::new(route_of(
            legs.iter()
                .map(|steps| {
                    leg(steps
                        .iter()
                        .map(|(distance, time)| step(*distance, *time, 3))
                        .collect())
                })
                .collect(),
        ))
    }

    proptest! {
        /// Traveled plus remaining always adds up to the total, at every scope.
        #[test]
        fn prop_distances_partition(
            legs in arbitrary_legs(),
            leg_pick in 0usize..8,
            step_pick in 0usize..8,
            step_fraction in 0.0f64..1.5,
        ) {
            let route = build(&legs);
            let leg_index = leg_pick % legs.len();
            let step_index = step_pick % legs[leg_index].len();

            let mut progress = RouteProgress::new(Arc::clone(&route), leg_index).expect("valid leg index");
            progress.advance_step(step_index).expect("valid step index");
            let step_distance = progress.current_leg_progress().current_step().distance();
            progress.set_distance_traveled(step_distance * step_fraction).expect("valid distance");

            let tolerance = 1e-6 * route.distance().max(1.0);
            prop_assert!((progress.distance_traveled() + progress.distance_remaining() - route.distance()).abs() < tolerance);

            let leg = progress.current_leg_progress();
            prop_assert!((leg.distance_traveled() + leg.distance_remaining() - leg.leg().distance()).abs() < tolerance);

            let step = leg.current_step_progress();
            prop_assert!((step.distance_traveled() + step.distance_remaining() - step.step().distance()).abs() < tolerance);

            let fraction = progress.fraction_traveled();
            prop_assert!(fraction.is_finite());
        }

        /// Indexes stay within the route no matter what the controller asks for.
        #[test]
        fn prop_indexes_stay_in_bounds(
            legs in arbitrary_legs(),
            requests in proptest::collection::vec((any::<bool>(), 0usize..6), 0..20),
        ) {
            let route = build(&legs);
            let mut progress = RouteProgress::new(Arc::clone(&route), 0).expect("valid leg index");

            for (is_leg, index) in requests {
                let before = (progress.leg_index(), progress.current_leg_progress().step_index());
                let result = if is_leg {
                    progress.advance_leg(index)
                } else {
                    progress.advance_step(index)
                };
                let after = (progress.leg_index(), progress.current_leg_progress().step_index());

                match result {
                    Ok(()) if is_leg => {
                        prop_assert_eq!(after, (index, 0));
                    }
                    Ok(()) => {
                        prop_assert_eq!(after, (before.0, index));
                    }
                    Err(_) => {
                        prop_assert_eq!(after, before);
                    }
                }

                prop_assert!(progress.leg_index() < route.legs().len());
                prop_assert_eq!(progress.leg_index(), progress.current_leg_progress().leg_index());
                prop_assert!(progress.current_leg_progress().step_index() < progress.current_leg().steps().len());
            }
        }
    }
}
