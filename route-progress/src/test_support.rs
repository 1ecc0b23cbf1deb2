//! Route fixtures shared by the unit tests.

use crate::congestion::CongestionLevel;
use crate::route::{LegDefinition, Maneuver, Route, RouteDefinition, StepDefinition};
use std::sync::Arc;

/// A step with `coordinate_count` coordinates spaced evenly along the equator.
pub fn step(distance: f64, expected_travel_time: f64, coordinate_count: u32) -> StepDefinition {
    StepDefinition {
        distance,
        expected_travel_time,
        coordinates: (0..coordinate_count)
            .map(|i| [f64::from(i) * 0.001, 0.0])
            .collect(),
        maneuver: Maneuver::Other,
        instruction: None,
        intersections: Vec::new(),
    }
}

pub fn leg(steps: Vec<StepDefinition>) -> LegDefinition {
    LegDefinition {
        steps,
        ..LegDefinition::default()
    }
}

/// A leg annotated with one `(level, seconds)` pair per segment.
pub fn congested_leg(
    steps: Vec<StepDefinition>,
    segments: &[(CongestionLevel, f64)],
) -> LegDefinition {
    LegDefinition {
        steps,
        segment_congestion_levels: Some(segments.iter().map(|(level, _)| *level).collect()),
        expected_segment_travel_times: Some(segments.iter().map(|(_, seconds)| *seconds).collect()),
        ..LegDefinition::default()
    }
}

pub fn route_of(legs: Vec<LegDefinition>) -> Route {
    Route::try_from(RouteDefinition { legs }).expect("Expected a valid route")
}

/// One leg: step A (1000m, 100s) then step B (500m, 50s).
pub fn two_step_route() -> Route {
    route_of(vec![leg(vec![
        step(1000.0, 100.0, 11),
        step(500.0, 50.0, 6),
    ])])
}

/// Three legs of two steps each, with distinct distances so sums are easy to check.
pub fn three_leg_route() -> Arc<Route> {
    Arc::new(route_of(vec![
        LegDefinition {
            source: Some("Origin".to_string()),
            destination: Some("First stop".to_string()),
            ..leg(vec![step(100.0, 10.0, 3), step(200.0, 20.0, 3)])
        },
        LegDefinition {
            destination: Some("Second stop".to_string()),
            ..leg(vec![step(300.0, 30.0, 3), step(400.0, 40.0, 3)])
        },
        LegDefinition {
            destination: Some("Destination".to_string()),
            ..leg(vec![step(500.0, 50.0, 3), step(600.0, 60.0, 2)])
        },
    ]))
}
