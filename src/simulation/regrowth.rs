//! Regrowth monitor
//!
//! On a fixed simulated cadence the monitor takes a census of every loaded
//! chunk and looks for chunks whose wildlife or resources fell below their
//! targets. The scan runs on a background task over the census snapshot and
//! sends its requests back on a channel; the main loop drains them at the next
//! safe point and hands them to a `Regrower`, which decides what to place.

use std::sync::Arc;

use ahash::AHashMap;
use rayon::prelude::*;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::catalog::{Catalogs, TerrainId};
use crate::core::clock::Cadence;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::ChunkCoord;
use crate::entity::registry::{ChunkPopulation, RegistrySnapshot};
use crate::world::store::ChunkStore;

/// Counts for one loaded chunk at census time
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCensus {
    pub chunk: ChunkCoord,
    pub terrain: AHashMap<TerrainId, u32>,
    pub population: ChunkPopulation,
    /// Lifecycle epoch of the chunk when its population was counted
    ///
    /// `None` while the chunk's entities are still being generated or wait to
    /// be spliced in; its population is not known yet and wildlife is not
    /// judged.
    pub epoch: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegrowthRequest {
    /// `epoch` is the census epoch; the request is void once the chunk's
    /// population has been regenerated since
    Wildlife {
        chunk: ChunkCoord,
        predators: u32,
        prey: u32,
        epoch: u64,
    },
    Resource { chunk: ChunkCoord, terrain: TerrainId, missing: u32 },
}

impl RegrowthRequest {
    pub fn chunk(&self) -> ChunkCoord {
        match self {
            RegrowthRequest::Wildlife { chunk, .. } | RegrowthRequest::Resource { chunk, .. } => *chunk,
        }
    }
}

/// Density targets the scan checks against
#[derive(Debug, Clone, PartialEq)]
pub struct RegrowthTargets {
    /// Minimum predator share of a chunk's wildlife, in percent
    pub min_predator_percent: f32,
    pub min_wildlife: u32,
    /// Population given to a chunk that has no entities at all
    pub full_wildlife: u32,
    /// Minimum count per resource terrain, sorted by terrain id
    pub resource_floors: Vec<(TerrainId, u32)>,
}

impl RegrowthTargets {
    /// Resolve the config's per-name resource floors against the terrain catalog
    pub fn from_config(config: &SimulationConfig, catalogs: &Catalogs) -> Result<Self> {
        let mut resource_floors = Vec::with_capacity(config.resource_floors.len());
        for (name, floor) in &config.resource_floors {
            let descriptor = catalogs.terrain.by_name(name).ok_or_else(|| {
                SimError::InvalidConfig(format!("resource floor names unknown terrain '{}'", name))
            })?;
            if !descriptor.is_resource {
                return Err(SimError::InvalidConfig(format!(
                    "resource floor names non-resource terrain '{}'",
                    name
                )));
            }
            resource_floors.push((descriptor.id, *floor));
        }
        resource_floors.sort();
        Ok(Self {
            min_predator_percent: config.min_predator_percent,
            min_wildlife: config.min_wildlife_per_chunk,
            full_wildlife: config.wildlife_per_chunk.max(config.min_wildlife_per_chunk),
            resource_floors,
        })
    }
}

/// Take a census of every loaded chunk
///
/// Terrain is counted per chunk in parallel; populations come from the
/// registry snapshot. `settled` maps each chunk whose population is final to
/// its lifecycle epoch; other chunks get `epoch: None`.
pub fn take_census(
    store: &ChunkStore,
    snapshot: &RegistrySnapshot,
    settled: &AHashMap<ChunkCoord, u64>,
) -> Vec<ChunkCensus> {
    let populations = snapshot.population_by_chunk();
    let chunks: Vec<_> = store.chunks().collect();
    let mut census: Vec<ChunkCensus> = chunks
        .par_iter()
        .map(|chunk| ChunkCensus {
            chunk: chunk.coord,
            terrain: chunk.terrain_counts(),
            population: populations.get(&chunk.coord).copied().unwrap_or_default(),
            epoch: settled.get(&chunk.coord).copied(),
        })
        .collect();
    census.sort_by_key(|c| c.chunk);
    census
}

/// Find every chunk below target
///
/// A chunk with no entities at all gets a full population. Otherwise wildlife
/// is topped up to `min_wildlife` and the predator share raised to
/// `min_predator_percent`, both measured against the chunk's current animals.
/// Chunks without a settled population are only checked for resources.
pub fn scan(census: &[ChunkCensus], targets: &RegrowthTargets) -> Vec<RegrowthRequest> {
    let mut requests = Vec::new();
    for entry in census {
        if let Some(epoch) = entry.epoch {
            if let Some(request) = wildlife_deficit(entry, epoch, targets) {
                requests.push(request);
            }
        }

        for (terrain, floor) in &targets.resource_floors {
            let count = entry.terrain.get(terrain).copied().unwrap_or(0);
            if count < *floor {
                requests.push(RegrowthRequest::Resource {
                    chunk: entry.chunk,
                    terrain: *terrain,
                    missing: floor - count,
                });
            }
        }
    }
    requests
}

fn wildlife_deficit(entry: &ChunkCensus, epoch: u64, targets: &RegrowthTargets) -> Option<RegrowthRequest> {
    let pop = entry.population;
    let share_low = (pop.predators as f32) * 100.0 < targets.min_predator_percent * pop.wildlife as f32;
    let sparse = pop.wildlife < targets.min_wildlife;
    if pop.entities > 0 && !share_low && !sparse {
        return None;
    }

    let total = if pop.entities == 0 {
        targets.full_wildlife
    } else {
        pop.wildlife.max(targets.min_wildlife)
    };
    let wanted_predators = (total as f32 * targets.min_predator_percent / 100.0).ceil() as u32;
    let predators = wanted_predators.saturating_sub(pop.predators);
    let prey = total.saturating_sub(pop.wildlife).saturating_sub(predators);
    (predators + prey > 0).then_some(RegrowthRequest::Wildlife {
        chunk: entry.chunk,
        predators,
        prey,
        epoch,
    })
}

/// Places what the monitor found missing
pub trait Regrower {
    /// Place missing animals; `epoch` is the lifecycle epoch the census saw
    fn regrow_wildlife(&mut self, chunk: ChunkCoord, predators: u32, prey: u32, epoch: u64);

    /// Returns how many cells were converted
    fn regrow_resource(&mut self, chunk: ChunkCoord, terrain: TerrainId, missing: u32) -> Result<u32>;

    fn apply(&mut self, request: &RegrowthRequest) -> Result<()> {
        match *request {
            RegrowthRequest::Wildlife {
                chunk,
                predators,
                prey,
                epoch,
            } => {
                self.regrow_wildlife(chunk, predators, prey, epoch);
                Ok(())
            }
            RegrowthRequest::Resource { chunk, terrain, missing } => {
                self.regrow_resource(chunk, terrain, missing).map(|_| ())
            }
        }
    }
}

pub struct RegrowthMonitor {
    cadence: Cadence,
    targets: Arc<RegrowthTargets>,
    runtime: Handle,
    tx: UnboundedSender<Vec<RegrowthRequest>>,
    rx: UnboundedReceiver<Vec<RegrowthRequest>>,
    scan_task: Option<JoinHandle<()>>,
}

impl RegrowthMonitor {
    pub fn new(interval_secs: f32, targets: RegrowthTargets, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            cadence: Cadence::new(interval_secs),
            targets: Arc::new(targets),
            runtime,
            tx,
            rx,
            scan_task: None,
        }
    }

    pub fn targets(&self) -> &RegrowthTargets {
        &self.targets
    }

    /// Feed elapsed simulated time; true when a scan is due
    pub fn due(&mut self, dt: f32) -> bool {
        self.cadence.step(dt)
    }

    /// Start a background scan over the census unless one is still running
    pub fn launch(&mut self, census: Vec<ChunkCensus>) -> bool {
        if self.scan_task.as_ref().map_or(false, |t| !t.is_finished()) {
            tracing::debug!("regrowth scan still running, skipping");
            return false;
        }
        let targets = Arc::clone(&self.targets);
        let tx = self.tx.clone();
        self.scan_task = Some(self.runtime.spawn(async move {
            let requests = scan(&census, &targets);
            if !requests.is_empty() {
                tracing::info!(chunks = census.len(), requests = requests.len(), "regrowth needed");
            }
            let _ = tx.send(requests);
        }));
        true
    }

    /// Requests from finished scans
    pub fn drain(&mut self) -> Vec<RegrowthRequest> {
        let mut requests = Vec::new();
        while let Ok(batch) = self.rx.try_recv() {
            requests.extend(batch);
        }
        requests
    }

    /// Wait for a running scan to finish
    pub async fn settle(&mut self) {
        if let Some(task) = self.scan_task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "regrowth scan failed");
            }
        }
    }
}
