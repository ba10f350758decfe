//! The simulation context
//!
//! One `Simulation` owns everything the tick touches: catalogs, config, the
//! chunk store, live actors and villages, claims and the background machinery.
//! Nothing lives in globals.

use std::sync::Arc;

use ahash::AHashMap;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::runtime::Handle;

use crate::actions::ClaimTable;
use crate::catalog::terrain::{GRASS, HOUSE};
use crate::catalog::{Catalogs, TerrainId};
use crate::core::clock::TickClock;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{ChunkCoord, Coord, EntityId, VillageId};
use crate::entity::actor::Actor;
use crate::entity::registry::{EntityRecord, EntityRegistry, SpawnBatch, StagedChange};
use crate::entity::village::Village;
use crate::simulation::regrowth::{RegrowthMonitor, RegrowthTargets, Regrower};
use crate::simulation::tick::{run_simulation_tick, SimulationEvent};
use crate::spatial::sparse_hash::{summarize, ActorIndex};
use crate::world::events::{EventSink, WorldEvent};
use crate::world::lifecycle::ChunkLifecycle;
use crate::world::spawning::pick_regrowth_cells;
use crate::world::store::{store_for, ChunkStore};
use crate::world::streaming::{plan_streaming, StreamPlan};

/// Bucket size of the actor neighbour grid, in cells
const INDEX_BUCKET: i32 = 16;

pub struct Simulation {
    pub config: Arc<SimulationConfig>,
    pub catalogs: Arc<Catalogs>,
    pub clock: TickClock,
    pub store: ChunkStore,
    pub registry: Arc<EntityRegistry>,
    pub lifecycle: ChunkLifecycle,
    pub actors: Vec<Actor>,
    pub index: ActorIndex,
    pub villages: AHashMap<VillageId, Village>,
    pub claims: ClaimTable,
    pub regrowth: RegrowthMonitor,
    pub rng: ChaCha8Rng,
    pub(crate) events: EventSink,
    regrowth_epoch: u64,
}

impl Simulation {
    /// Build a simulation; fails on an inconsistent config or catalog
    pub fn new(config: SimulationConfig, catalogs: Catalogs, runtime: Handle, events: EventSink) -> Result<Self> {
        config.validate()?;
        catalogs.validate()?;
        let targets = RegrowthTargets::from_config(&config, &catalogs)?;

        let config = Arc::new(config);
        let catalogs = Arc::new(catalogs);
        let registry = Arc::new(EntityRegistry::new());
        let store = store_for(&config, Arc::clone(&catalogs), events.clone());
        let lifecycle = ChunkLifecycle::new(runtime.clone(), Arc::clone(&registry), Arc::clone(&config));
        let regrowth = RegrowthMonitor::new(config.regrowth_interval_secs, targets, runtime);

        tracing::info!(
            seed = config.seed,
            chunk_size = config.chunk_size,
            "simulation created"
        );

        Ok(Self {
            clock: TickClock::new(config.seconds_per_tick),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            catalogs,
            store,
            registry,
            lifecycle,
            actors: Vec::new(),
            index: ActorIndex::new(INDEX_BUCKET),
            villages: AHashMap::new(),
            claims: ClaimTable::new(),
            regrowth,
            events,
            regrowth_epoch: 0,
        })
    }

    /// Advance one global tick
    pub fn tick(&mut self) -> Result<Vec<SimulationEvent>> {
        run_simulation_tick(self)
    }

    pub fn current_tick(&self) -> u64 {
        self.clock.current_tick()
    }

    /// Load chunks around the points of interest and evict distant ones
    pub fn stream_around(&mut self, points: &[Coord]) -> Result<StreamPlan> {
        let plan = plan_streaming(
            &self.store.loaded_coords(),
            points,
            self.store.chunk_size(),
            self.config.load_radius,
            self.config.unload_radius,
        );
        for coord in &plan.unload {
            self.unload_chunk(*coord);
        }
        for coord in &plan.load {
            self.load_chunk(*coord)?;
        }
        if !plan.is_empty() {
            tracing::info!(
                loaded = plan.load.len(),
                unloaded = plan.unload.len(),
                resident = self.store.loaded_count(),
                "streamed chunks"
            );
        }
        Ok(plan)
    }

    /// Generate a chunk and queue its entity spawn
    pub fn load_chunk(&mut self, coord: ChunkCoord) -> Result<bool> {
        if !self.store.load(coord)? {
            return Ok(false);
        }
        let spawnable = self.store.spawnable_cells(coord);
        self.lifecycle.on_loaded(coord, spawnable, self.clock.current_tick());
        Ok(true)
    }

    /// Evict a chunk; its entities are removed at the next safe point
    pub fn unload_chunk(&mut self, coord: ChunkCoord) -> bool {
        if self.store.unload(coord).is_none() {
            return false;
        }
        self.lifecycle.on_unloaded(coord);
        true
    }

    /// Wait for all background chunk and regrowth work to finish
    pub async fn settle(&mut self) {
        self.lifecycle.settle().await;
        self.regrowth.settle().await;
    }

    /// Add an actor to the live set right away
    pub fn spawn_actor(&mut self, actor: Actor) -> EntityId {
        let id = actor.id;
        let predator = self.config.policies.get(actor.kind).predator;
        self.index.insert(summarize(&actor, predator));
        self.events.emit(WorldEvent::EntityAdded {
            id,
            kind: actor.kind,
            position: actor.position,
        });
        self.actors.push(actor);
        self.publish();
        id
    }

    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn live_count(&self) -> usize {
        self.actors.iter().filter(|a| a.is_alive()).count()
    }

    /// Splice staged registry changes into the live set
    ///
    /// Runs at the start of every tick. Afterwards no live actor stands in an
    /// unloaded chunk and the registry snapshot matches the live set.
    pub(crate) fn apply_staged(&mut self, events: &mut Vec<SimulationEvent>) {
        let chunk_size = self.store.chunk_size();
        for change in self.registry.drain_staged() {
            match change {
                StagedChange::Spawn(batch) => self.splice_batch(batch, events),
                StagedChange::DespawnChunk(coord) => {
                    self.remove_actors(|a| ChunkCoord::containing(a.position, chunk_size) == coord, events);
                    self.villages.retain(|_, v| v.chunk(chunk_size) != coord);
                }
                StagedChange::Despawn(id) => self.remove_actors(|a| a.id == id, events),
            }
        }

        // Sweep the dead and anything stranded in an evicted chunk
        let stranded: Vec<EntityId> = self
            .actors
            .iter()
            .filter(|a| !a.is_alive() || !self.store.is_cell_loaded(a.position))
            .map(|a| a.id)
            .collect();
        if !stranded.is_empty() {
            self.remove_actors(|a| stranded.contains(&a.id), events);
        }
        let store = &self.store;
        self.villages.retain(|_, v| store.is_loaded(v.chunk(chunk_size)));

        let config = &self.config;
        self.index
            .rebuild(self.actors.iter(), |kind| config.policies.get(kind).predator);
        self.publish();
    }

    fn splice_batch(&mut self, batch: SpawnBatch, events: &mut Vec<SimulationEvent>) {
        if !self.store.is_loaded(batch.chunk) {
            tracing::debug!(chunk = ?batch.chunk, "dropping spawn batch for evicted chunk");
            return;
        }
        if let Ok(house) = self.catalogs.terrain.get(HOUSE) {
            for village in &batch.villages {
                for cell in &village.houses {
                    self.store.set_terrain(*cell, house);
                }
            }
        }
        for village in batch.villages {
            tracing::info!(village = ?village.id, position = ?village.position, "village founded");
            self.villages.insert(village.id, village);
        }
        for actor in batch.actors {
            if !self.store.is_walkable(actor.position) {
                continue;
            }
            events.push(SimulationEvent::Spawned {
                id: actor.id,
                kind: actor.kind,
                position: actor.position,
            });
            self.events.emit(WorldEvent::EntityAdded {
                id: actor.id,
                kind: actor.kind,
                position: actor.position,
            });
            self.actors.push(actor);
        }
    }

    /// Remove matching actors, releasing their claims and village places
    fn remove_actors(&mut self, doomed: impl Fn(&Actor) -> bool, events: &mut Vec<SimulationEvent>) {
        let (removed, kept): (Vec<Actor>, Vec<Actor>) = std::mem::take(&mut self.actors).into_iter().partition(|a| doomed(a));
        self.actors = kept;
        for actor in removed {
            self.claims.release(actor.id);
            if let Some(village) = actor.home.and_then(|id| self.villages.get_mut(&id)) {
                village.remove_resident(actor.id);
            }
            self.index.remove(actor.id);
            self.events.emit(WorldEvent::EntityRemoved { id: actor.id });
            events.push(SimulationEvent::Despawned { id: actor.id });
        }
    }

    /// Loaded chunks whose population is final, with their lifecycle epoch
    ///
    /// A chunk whose spawn task is queued or running, or whose spawn batch
    /// still waits to be spliced in, would count as empty and is left out.
    pub(crate) fn settled_populations(&self) -> AHashMap<ChunkCoord, u64> {
        self.store
            .loaded_coords()
            .into_iter()
            .filter(|coord| self.lifecycle.is_generated(*coord))
            .filter(|coord| self.lifecycle.is_settled(*coord))
            .filter(|coord| !self.registry.has_pending_spawn(*coord))
            .map(|coord| (coord, self.lifecycle.epoch(coord)))
            .collect()
    }

    /// Publish the live set for readers on other threads
    fn publish(&self) {
        let chunk_size = self.store.chunk_size();
        let records = self
            .actors
            .iter()
            .filter(|a| a.is_alive())
            .map(|a| EntityRecord {
                id: a.id,
                kind: a.kind,
                position: a.position,
                chunk: ChunkCoord::containing(a.position, chunk_size),
                predator: self.config.policies.get(a.kind).predator,
                home: a.home,
            })
            .collect();
        self.registry.publish(records);
    }
}

impl Regrower for Simulation {
    fn regrow_wildlife(&mut self, chunk: ChunkCoord, predators: u32, prey: u32, epoch: u64) {
        if !self.store.is_loaded(chunk) {
            return;
        }
        let spawnable = self.store.spawnable_cells(chunk);
        self.lifecycle
            .request_wildlife(chunk, spawnable, predators, prey, epoch, self.clock.current_tick());
    }

    /// Turn free grass cells of the chunk into the missing resource
    fn regrow_resource(&mut self, chunk: ChunkCoord, terrain: TerrainId, missing: u32) -> Result<u32> {
        let descriptor = self.catalogs.terrain.get(terrain)?;
        let Some(loaded) = self.store.chunk(chunk) else {
            return Ok(0);
        };
        let candidates: Vec<Coord> = loaded
            .iter()
            .filter(|(_, cell)| cell.terrain == GRASS)
            .map(|(coord, _)| coord)
            .filter(|c| self.claims.holder(*c).is_none())
            .filter(|c| !self.index.is_occupied(*c, None))
            .filter(|c| loaded.items_at(*c).is_none())
            .collect();

        self.regrowth_epoch += 1;
        let cells = pick_regrowth_cells(chunk, &candidates, missing, &self.config, self.regrowth_epoch);
        for cell in &cells {
            self.store.set_terrain(*cell, descriptor);
        }
        tracing::debug!(?chunk, terrain = %descriptor.name, placed = cells.len(), "resources regrown");
        Ok(cells.len() as u32)
    }
}
