use super::{LegProgress, RouteProgress, StepProgress};
use crate::alert::AlertLevel;
use crate::congestion::{CongestionLevel, CongestionScope};
use serde::Serialize;

/// A point-in-time copy of every value the presentation layer reads from a [`RouteProgress`].
#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub leg_index: usize,
    pub step_index: usize,
    pub distance_traveled: f64,
    pub distance_remaining: f64,
    pub duration_remaining: f64,
    pub fraction_traveled: f64,
    pub is_final_leg: bool,
    pub alert_level: AlertLevel,
    /// The dominant congestion over the rest of the current leg.
    pub leg_congestion: CongestionLevel,
    /// The dominant congestion over the rest of the route.
    pub route_congestion: CongestionLevel,
    pub leg: LegSnapshot,
    pub step: StepSnapshot,
    /// The instruction for the step after the current one (which may be on the next leg).
    pub upcoming_instruction: Option<String>,
    /// The instruction two steps ahead, within the current leg.
    pub follow_on_instruction: Option<String>,
    /// The posted speed limit (km/h) at the traveler's position.
    pub speed_limit: Option<f64>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct LegSnapshot {
    pub distance_traveled: f64,
    pub distance_remaining: f64,
    pub duration_remaining: f64,
    pub fraction_traveled: f64,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct StepSnapshot {
    pub distance_traveled: f64,
    pub distance_remaining: f64,
    pub duration_remaining: f64,
    pub fraction_traveled: f64,
    pub distance_to_upcoming_intersection: Option<f64>,
}

impl ProgressSnapshot {
    pub(crate) fn new(progress: &RouteProgress) -> Self {
        let leg = progress.current_leg_progress();
        Self {
            leg_index: progress.leg_index(),
            step_index: leg.step_index(),
            distance_traveled: progress.distance_traveled(),
            distance_remaining: progress.distance_remaining(),
            duration_remaining: progress.duration_remaining(),
            fraction_traveled: progress.fraction_traveled(),
            is_final_leg: progress.is_final_leg(),
            alert_level: leg.alert_user_level(),
            leg_congestion: progress.dominant_congestion_level(CongestionScope::Leg),
            route_congestion: progress.dominant_congestion_level(CongestionScope::Route),
            leg: LegSnapshot::from(leg),
            step: StepSnapshot::from(leg.current_step_progress()),
            upcoming_instruction: progress
                .upcoming_step()
                .and_then(|step| step.instruction().map(str::to_string)),
            follow_on_instruction: leg
                .follow_on_step()
                .and_then(|step| step.instruction().map(str::to_string)),
            speed_limit: leg.current_speed_limit(),
        }
    }
}

impl From<&LegProgress> for LegSnapshot {
    fn from(value: &LegProgress) -> Self {
        Self {
            distance_traveled: value.distance_traveled(),
            distance_remaining: value.distance_remaining(),
            duration_remaining: value.duration_remaining(),
            fraction_traveled: value.fraction_traveled(),
        }
    }
}

impl From<&StepProgress> for StepSnapshot {
    fn from(value: &StepProgress) -> Self {
        Self {
            distance_traveled: value.distance_traveled(),
            distance_remaining: value.distance_remaining(),
            duration_remaining: value.duration_remaining(),
            fraction_traveled: value.fraction_traveled(),
            distance_to_upcoming_intersection: value.distance_to_upcoming_intersection(),
        }
    }
}
