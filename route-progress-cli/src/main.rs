use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io};

use anyhow::Context;
use clap::{Parser, Subcommand};
use route_progress::{AlertThresholds, Route, RouteDefinition, RouteProgress};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::events::ControllerEvent;
use crate::inspect::RouteSummary;

mod events;
mod inspect;

#[derive(Parser, Debug)]
#[command(name = "route-progress", author, version, about, long_about = None)]
struct Cli {
    /// Subcommand/tool to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay navigation controller events against a route, printing a progress snapshot (JSON) after each one
    Replay {
        /// Path to a route definition (JSON)
        route: PathBuf,
        /// Path to a JSON array of controller events
        events: PathBuf,
        /// Alert thresholds (JSON); any omitted field keeps its default
        #[arg(env, long)]
        thresholds: Option<PathBuf>,
        /// The leg to start on
        #[arg(env, long, default_value_t = 0)]
        start_leg: usize,
    },
    /// Pretty-print a route summary, including the per-step congestion projection
    Inspect {
        /// Path to a route definition (JSON)
        route: PathBuf,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {what} at {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Invalid JSON in {what}"))
}

fn load_route(path: &Path) -> anyhow::Result<Route> {
    let definition: RouteDefinition = read_json(path, "route definition")?;
    let route = Route::try_from(definition).context("Unusable route definition")?;
    info!(
        legs = route.legs().len(),
        steps = route.step_count(),
        distance = route.distance(),
        "Loaded route from {}",
        path.display()
    );
    Ok(route)
}

fn replay(
    route: &Path,
    events: &Path,
    thresholds: Option<&Path>,
    start_leg: usize,
) -> anyhow::Result<()> {
    let route = Arc::new(load_route(route)?);
    let events: Vec<ControllerEvent> = read_json(events, "events")?;
    let thresholds = match thresholds {
        Some(path) => read_json(path, "alert thresholds")?,
        None => AlertThresholds::default(),
    };
    debug!(?thresholds, "Alert thresholds");

    let mut progress = RouteProgress::new(route, start_leg).context("Invalid start leg")?;

    crate::events::replay(
        &mut progress,
        &events,
        &thresholds,
        BufWriter::new(io::stdout().lock()),
    )?;
    info!(count = events.len(), "Replayed all events");
    Ok(())
}

fn inspect(route: &Path) -> anyhow::Result<()> {
    let route = load_route(route)?;
    let summary = RouteSummary::new(&route);

    let mut out = BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut out, &summary)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        // Standard logger, configured via the RUST_LOG env variable
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    match cli.command {
        Commands::Replay {
            route,
            events,
            thresholds,
            start_leg,
        } => replay(&route, &events, thresholds.as_deref(), start_leg),
        Commands::Inspect { route } => inspect(&route),
    }
}
