//! # Progress state
//!
//! A three-level cursor over a [`Route`](crate::Route):
//! [`RouteProgress`] tracks the current leg, [`LegProgress`] the current step within it,
//! and [`StepProgress`] the distance traveled within that step.
//!
//! Only the navigation controller mutates these (leg index, step index, distance traveled, alert level).
//! Everything else is derived on read and never cached.

mod leg_progress;
mod route_progress;
mod snapshot;
mod step_progress;

pub use leg_progress::LegProgress;
pub use route_progress::RouteProgress;
pub use snapshot::{LegSnapshot, ProgressSnapshot, StepSnapshot};
pub use step_progress::StepProgress;
