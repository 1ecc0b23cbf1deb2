use anyhow::Context;
use route_progress::{AlertLevel, AlertThresholds, ManeuverProximity, ProgressError, RouteProgress};
use serde::Deserialize;
use std::io::Write;
use tracing::{debug, info};

/// One input from the navigation controller, as recorded in an events file.
///
/// Events are externally tagged, so `{"advance_step": 1}` or `{"alert_level": "high"}`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ControllerEvent {
    AdvanceLeg(usize),
    AdvanceStep(usize),
    /// Meters traveled along the current step.
    DistanceTraveled(f64),
    AlertLevel(AlertLevel),
    /// Let the alert thresholds pick the level for the given position.
    ClassifyAlert(ManeuverProximity),
}

impl ControllerEvent {
    /// Applies the event to `progress`.
    ///
    /// # Errors
    ///
    /// Returns the progress error for rejected indexes or distances.
    /// Rejected events leave `progress` unchanged.
    pub fn apply(
        &self,
        progress: &mut RouteProgress,
        thresholds: &AlertThresholds,
    ) -> Result<(), ProgressError> {
        match self {
            ControllerEvent::AdvanceLeg(index) => progress.advance_leg(*index)?,
            ControllerEvent::AdvanceStep(index) => progress.advance_step(*index)?,
            ControllerEvent::DistanceTraveled(meters) => progress.set_distance_traveled(*meters)?,
            ControllerEvent::AlertLevel(level) => progress.set_alert_level(*level),
            ControllerEvent::ClassifyAlert(proximity) => {
                let previous = progress.current_leg_progress().alert_user_level();
                let level = thresholds.classify(progress.current_leg_progress(), proximity);
                if level == previous {
                    debug!(%level, "Alert level unchanged");
                } else {
                    info!(%previous, %level, "Alert level changed");
                }
                progress.set_alert_level(level);
            }
        }

        Ok(())
    }
}

/// Applies `events` in order, writing one JSON progress snapshot per line to `out` after each.
///
/// # Errors
///
/// Stops at the first rejected event, or if `out` can't be written to.
pub fn replay<W: Write>(
    progress: &mut RouteProgress,
    events: &[ControllerEvent],
    thresholds: &AlertThresholds,
    mut out: W,
) -> anyhow::Result<()> {
    for (index, event) in events.iter().enumerate() {
        event
            .apply(progress, thresholds)
            .with_context(|| format!("Event {index} ({event:?}) was rejected"))?;
        serde_json::to_writer(&mut out, &progress.snapshot())?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_progress::{Route, RouteDefinition, TravelProfile};
    use std::sync::Arc;

    fn fixture_progress() -> RouteProgress {
        let definition: RouteDefinition =
            serde_json::from_str(include_str!("../fixtures/route.json")).expect("valid route");
        let route = Route::try_from(definition).expect("valid route");
        RouteProgress::new(Arc::new(route), 0).expect("valid leg index")
    }

    #[test]
    fn test_parse_events() {
        let events: Vec<ControllerEvent> = serde_json::from_str(
            r#"[
                {"advance_leg": 1},
                {"advance_step": 2},
                {"distance_traveled": 12.5},
                {"alert_level": "medium"},
                {"classify_alert": {"seconds_to_end_of_step": 10.0, "distance_to_maneuver": 80.0, "profile": "cycling"}}
            ]"#,
        )
        .expect("valid events");

        assert_eq!(
            events,
            vec![
                ControllerEvent::AdvanceLeg(1),
                ControllerEvent::AdvanceStep(2),
                ControllerEvent::DistanceTraveled(12.5),
                ControllerEvent::AlertLevel(AlertLevel::Medium),
                ControllerEvent::ClassifyAlert(ManeuverProximity {
                    seconds_to_end_of_step: 10.0,
                    distance_to_maneuver: 80.0,
                    profile: TravelProfile::Cycling,
                }),
            ]
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ControllerEvent>(r#"{"teleport": 3}"#).is_err());
    }

    #[test]
    fn test_apply_events() {
        let thresholds = AlertThresholds::default();
        let mut progress = fixture_progress();

        ControllerEvent::DistanceTraveled(300.0)
            .apply(&mut progress, &thresholds)
            .expect("valid distance");
        assert_eq!(progress.distance_traveled(), 300.0);

        ControllerEvent::ClassifyAlert(ManeuverProximity {
            seconds_to_end_of_step: 10.0,
            distance_to_maneuver: 150.0,
            profile: TravelProfile::Driving,
        })
        .apply(&mut progress, &thresholds)
        .expect("classification never fails");
        assert_eq!(
            progress.current_leg_progress().alert_user_level(),
            AlertLevel::High
        );

        ControllerEvent::AdvanceLeg(1)
            .apply(&mut progress, &thresholds)
            .expect("valid leg index");
        assert_eq!(progress.leg_index(), 1);
        assert_eq!(
            progress.current_leg_progress().alert_user_level(),
            AlertLevel::None
        );
    }

    #[test]
    fn test_replay_fixture() {
        let events: Vec<ControllerEvent> =
            serde_json::from_str(include_str!("../fixtures/events.json")).expect("valid events");
        let mut progress = fixture_progress();
        let mut out = Vec::new();
        replay(&mut progress, &events, &AlertThresholds::default(), &mut out).expect("valid events");

        let output = String::from_utf8(out).expect("UTF-8 output");
        let snapshots: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).expect("one JSON snapshot per line"))
            .collect();
        assert_eq!(snapshots.len(), events.len());

        assert_eq!(snapshots[0]["speed_limit"], 50.0);
        assert_eq!(snapshots[1]["alert_level"], "medium");
        assert_eq!(snapshots[2]["speed_limit"], 30.0);
        assert_eq!(snapshots[3]["alert_level"], "arrive");
        assert_eq!(snapshots[4]["alert_level"], "arrive");
        assert_eq!(snapshots[5]["alert_level"], "none");

        let last = &snapshots[7];
        assert_eq!(last["leg_index"], 1);
        assert_eq!(last["step_index"], 0);
        assert_eq!(last["distance_traveled"], 950.0);
        assert_eq!(last["distance_remaining"], 450.0);
        assert_eq!(last["duration_remaining"], 67.5);
        assert_eq!(last["is_final_leg"], true);
        assert_eq!(last["alert_level"], "low");
        assert_eq!(last["leg_congestion"], "moderate");
        assert_eq!(last["upcoming_instruction"], "You have arrived at Office");
        assert!(last.get("speed_limit").is_none());
    }

    #[test]
    fn test_replay_stops_at_rejected_event() {
        let events = vec![
            ControllerEvent::DistanceTraveled(10.0),
            ControllerEvent::AdvanceLeg(4),
            ControllerEvent::DistanceTraveled(20.0),
        ];
        let mut progress = fixture_progress();
        let mut out = Vec::new();
        let error = replay(&mut progress, &events, &AlertThresholds::default(), &mut out)
            .unwrap_err();
        insta::assert_snapshot!(error.to_string(), @"Event 1 (AdvanceLeg(4)) was rejected");
        assert_eq!(String::from_utf8(out).expect("UTF-8 output").lines().count(), 1);
        assert_eq!(progress.distance_traveled(), 10.0);
    }

    #[test]
    fn test_rejected_event_leaves_progress_unchanged() {
        let thresholds = AlertThresholds::default();
        let mut progress = fixture_progress();
        let error = ControllerEvent::AdvanceStep(9)
            .apply(&mut progress, &thresholds)
            .unwrap_err();
        insta::assert_snapshot!(error.to_string(), @"The step index 9 is out of range (there are 2)");
        assert_eq!(progress.current_leg_progress().step_index(), 0);
    }
}
