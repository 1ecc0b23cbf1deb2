//! # Alert levels
//!
//! How urgently the traveler should be told about the next maneuver.
//! The progress state only stores the level; deciding when to change it belongs to the navigation controller.
//! [`AlertThresholds::classify`] is a helper for controllers that want the conventional rules.

use crate::progress::LegProgress;
use crate::route::Maneuver;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The urgency of the upcoming maneuver announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// No announcement has been made for this leg yet.
    #[default]
    None,
    /// The traveler is setting off.
    Depart,
    /// The maneuver is still far away.
    Low,
    /// The maneuver is coming up.
    Medium,
    /// The maneuver is imminent.
    High,
    /// The traveler is arriving at the leg's waypoint.
    Arrive,
}

impl AlertLevel {
    /// Whether lane guidance should be shown at this level.
    #[inline]
    pub fn reveals_lane_guidance(self) -> bool {
        matches!(self, AlertLevel::Medium | AlertLevel::High)
    }

    /// Whether this level ends guidance for the leg.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == AlertLevel::Arrive
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::None => "none",
            AlertLevel::Depart => "depart",
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Arrive => "arrive",
        }
    }
}

impl Display for AlertLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mode of travel, which determines how long a step must be before it earns an early alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelProfile {
    #[default]
    Driving,
    Cycling,
    Walking,
}

/// Where the traveler is relative to the end of the current step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ManeuverProximity {
    /// Expected seconds until the end of the current step.
    pub seconds_to_end_of_step: f64,
    /// Meters from the traveler's snapped location to the upcoming maneuver.
    pub distance_to_maneuver: f64,
    #[serde(default)]
    pub profile: TravelProfile,
}

/// Minimum step lengths (in meters) for medium and high alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinimumStepLengths {
    pub medium: f64,
    pub high: f64,
}

/// Timing and distance thresholds for alert classification.
///
/// Every field has a default, so a partial JSON document only overrides what it names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Seconds before the end of a step at which a medium alert is given.
    pub medium_alert_interval: f64,
    /// Seconds before the end of a step at which a high alert is given.
    pub high_alert_interval: f64,
    /// Radius (m) around a maneuver within which the traveler is considered to be at it.
    pub maneuver_zone_radius: f64,
    pub driving: MinimumStepLengths,
    pub cycling: MinimumStepLengths,
    pub walking: MinimumStepLengths,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            medium_alert_interval: 70.0,
            high_alert_interval: 15.0,
            maneuver_zone_radius: 40.0,
            driving: MinimumStepLengths {
                medium: 400.0,
                high: 100.0,
            },
            cycling: MinimumStepLengths {
                medium: 200.0,
                high: 60.0,
            },
            walking: MinimumStepLengths {
                medium: 100.0,
                high: 20.0,
            },
        }
    }
}

impl AlertThresholds {
    #[inline]
    pub fn minimum_step_lengths(&self, profile: TravelProfile) -> MinimumStepLengths {
        match profile {
            TravelProfile::Driving => self.driving,
            TravelProfile::Cycling => self.cycling,
            TravelProfile::Walking => self.walking,
        }
    }

    /// Picks the alert level for the traveler's position on the current step of `leg`.
    ///
    /// Levels never fall back to [`AlertLevel::None`]; a leg without an alert starts at [`AlertLevel::Depart`].
    ///
    /// The rules are checked in order:
    /// 1. While departing inside the maneuver zone, the level only moves on to [`AlertLevel::High`],
    ///    once the end of the step is within the high interval. Step length doesn't matter here.
    /// 2. Anywhere else inside the maneuver zone, the level becomes [`AlertLevel::Arrive`] if the
    ///    upcoming step arrives, and is kept otherwise.
    /// 3. Outside the zone, the timed high and medium alerts apply, but only to steps longer
    ///    than the profile's minimums. Otherwise the level is kept.
    pub fn classify(&self, leg: &LegProgress, proximity: &ManeuverProximity) -> AlertLevel {
        let current = leg.alert_user_level();
        let start = if current == AlertLevel::None {
            AlertLevel::Depart
        } else {
            current
        };

        let in_zone = proximity.distance_to_maneuver <= self.maneuver_zone_radius;
        if start == AlertLevel::Depart && in_zone {
            return if proximity.seconds_to_end_of_step <= self.high_alert_interval {
                AlertLevel::High
            } else {
                AlertLevel::Depart
            };
        }

        if in_zone {
            let arrival_upcoming = leg
                .upcoming_step()
                .is_some_and(|step| step.maneuver() == Maneuver::Arrive);
            return if arrival_upcoming {
                AlertLevel::Arrive
            } else {
                start
            };
        }

        let step_distance = leg.current_step().distance();
        let minimums = self.minimum_step_lengths(proximity.profile);
        if proximity.seconds_to_end_of_step <= self.high_alert_interval
            && step_distance > minimums.high
        {
            AlertLevel::High
        } else if proximity.seconds_to_end_of_step <= self.medium_alert_interval
            && step_distance > minimums.medium
        {
            AlertLevel::Medium
        } else {
            start
        }
    }
}
