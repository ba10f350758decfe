//! Wildlands - headless driver
//!
//! Loads an optional TOML config, streams the world around a slowly drifting
//! point of interest and runs the tick loop on a tokio runtime. Prints a JSON
//! summary when the run ends.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedReceiver;

use wildlands::catalog::Catalogs;
use wildlands::core::error::Result;
use wildlands::core::types::Coord;
use wildlands::core::SimulationConfig;
use wildlands::simulation::{DeathCause, Simulation, SimulationEvent};
use wildlands::world::{EventSink, WorldEvent};

/// Wildlands - headless survival simulation
#[derive(Parser, Debug)]
#[command(name = "wildlands")]
#[command(about = "Run the survival simulation headless and print a summary")]
struct Args {
    /// TOML config file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// World seed, overrides the config
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 400)]
    ticks: u64,

    /// Real milliseconds per tick (0 = as fast as possible)
    #[arg(long, default_value_t = 0)]
    tick_ms: u64,

    /// Ticks between one-cell moves of the point of interest
    #[arg(long, default_value_t = 4)]
    drift_every: u64,
}

/// End-of-run summary
#[derive(Serialize, Default)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    loaded_chunks: usize,
    live_actors: usize,
    villages: usize,
    spawned: u64,
    despawned: u64,
    starved: u64,
    killed: u64,
    actions_started: u64,
    regrowth_applied: u64,
    cell_updates: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wildlands=info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        tracing::error!(error = %e, "simulation halted");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let rt = Runtime::new()?;
    let summary = rt.block_on(drive(config, &args))?;

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "could not serialize summary"),
    }
    Ok(())
}

async fn drive(config: SimulationConfig, args: &Args) -> Result<RunSummary> {
    let (sink, world_events) = EventSink::channel();
    let presenter = tokio::spawn(present(world_events));

    let mut sim = Simulation::new(config, Catalogs::builtin(), tokio::runtime::Handle::current(), sink)?;
    let mut summary = RunSummary {
        seed: sim.config.seed,
        ..RunSummary::default()
    };
    tracing::info!(seed = summary.seed, ticks = args.ticks, "Wildlands starting");

    let mut pacer = (args.tick_ms > 0).then(|| tokio::time::interval(Duration::from_millis(args.tick_ms)));
    let mut focus = Coord::new(0, 0);

    for tick in 0..args.ticks {
        if let Some(pacer) = pacer.as_mut() {
            pacer.tick().await;
        } else {
            // Let background chunk and regrowth tasks make progress
            tokio::task::yield_now().await;
        }

        if args.drift_every > 0 && tick % args.drift_every == 0 {
            focus.x += 1;
        }
        sim.stream_around(&[focus])?;

        for event in sim.tick()? {
            tally(&mut summary, &event);
        }
    }

    sim.settle().await;
    summary.ticks = sim.current_tick();
    summary.loaded_chunks = sim.store.loaded_count();
    summary.live_actors = sim.live_count();
    summary.villages = sim.villages.len();
    drop(sim);

    summary.cell_updates = presenter.await.unwrap_or_default();
    tracing::info!(
        ticks = summary.ticks,
        live = summary.live_actors,
        "Wildlands finished"
    );
    Ok(summary)
}

fn tally(summary: &mut RunSummary, event: &SimulationEvent) {
    match event {
        SimulationEvent::ActionStarted { .. } => summary.actions_started += 1,
        SimulationEvent::Spawned { .. } => summary.spawned += 1,
        SimulationEvent::Despawned { .. } => summary.despawned += 1,
        SimulationEvent::Died { cause: DeathCause::Starvation, .. } => summary.starved += 1,
        SimulationEvent::Died { cause: DeathCause::Killed, .. } => summary.killed += 1,
        SimulationEvent::RegrowthApplied(_) => summary.regrowth_applied += 1,
        SimulationEvent::ActionFinished { .. } | SimulationEvent::Hit { .. } => {}
    }
}

/// Stand-in for a renderer: drains world notifications until the sink closes
async fn present(mut events: UnboundedReceiver<WorldEvent>) -> u64 {
    let mut cell_updates = 0;
    while let Some(event) = events.recv().await {
        match event {
            WorldEvent::CellChanged { .. } => cell_updates += 1,
            WorldEvent::ChunkLoaded(coord) => tracing::trace!(?coord, "presenter: chunk loaded"),
            WorldEvent::ChunkUnloaded(coord) => tracing::trace!(?coord, "presenter: chunk unloaded"),
            WorldEvent::EntityAdded { .. } | WorldEvent::EntityRemoved { .. } => {}
        }
    }
    cell_updates
}
