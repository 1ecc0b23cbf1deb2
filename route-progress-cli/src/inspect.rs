use route_progress::{CongestionTimes, Leg, Maneuver, Route, StepCongestion};
use serde::Serialize;

/// A printable summary of a route, including the per-step congestion projection.
#[derive(Serialize, Debug)]
pub struct RouteSummary<'a> {
    pub distance: f64,
    pub expected_travel_time: f64,
    pub step_count: usize,
    pub legs: Vec<LegSummary<'a>>,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug)]
pub struct LegSummary<'a> {
    pub source: Option<&'a str>,
    pub destination: Option<&'a str>,
    pub distance: f64,
    pub expected_travel_time: f64,
    pub steps: Vec<StepSummary<'a>>,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug)]
pub struct StepSummary<'a> {
    pub distance: f64,
    pub expected_travel_time: f64,
    pub coordinate_count: usize,
    pub maneuver: Maneuver,
    pub instruction: Option<&'a str>,
    /// Seconds per congestion level; absent when the leg annotations don't reach this step.
    pub congestion: Option<&'a CongestionTimes>,
}

impl<'a> RouteSummary<'a> {
    pub fn new(route: &'a Route) -> Self {
        Self {
            distance: route.distance(),
            expected_travel_time: route.expected_travel_time(),
            step_count: route.step_count(),
            legs: route
                .legs()
                .iter()
                .map(|leg| LegSummary::new(route, leg))
                .collect(),
        }
    }
}

impl<'a> LegSummary<'a> {
    fn new(route: &'a Route, leg: &'a Leg) -> Self {
        let steps = leg
            .steps()
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let step = &route[*id];
                StepSummary {
                    distance: step.distance(),
                    expected_travel_time: step.expected_travel_time(),
                    coordinate_count: step.coordinate_count(),
                    maneuver: step.maneuver(),
                    instruction: step.instruction(),
                    congestion: leg.congestion_by_step().get(index).map(StepCongestion::totals),
                }
            })
            .collect();

        Self {
            source: leg.source(),
            destination: leg.destination(),
            distance: leg.distance(),
            expected_travel_time: leg.expected_travel_time(),
            steps,
        }
    }
}
