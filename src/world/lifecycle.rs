//! Chunk entity lifecycle on background tasks
//!
//! Load and unload side effects (spawning a chunk's wildlife and villages,
//! destroying everything inside an evicted chunk) run as tokio tasks. Tasks for
//! the same chunk form a lane: each one awaits the task submitted before it, so
//! a chunk's side effects always apply in submission order. Different chunks
//! proceed independently.
//!
//! Tasks never touch live actors. Their results go through the registry's
//! staged-change log and are spliced in at the start of the next tick.

use std::sync::{Arc, Mutex, PoisonError};

use ahash::{AHashMap, AHashSet};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::core::config::SimulationConfig;
use crate::core::types::{ChunkCoord, Coord, Tick};
use crate::entity::registry::EntityRegistry;
use crate::world::spawning::{populate_chunk, regrow_wildlife};

/// One-shot "entities generated" flags and generation counters
#[derive(Debug, Default)]
struct ChunkFlags {
    generated: AHashSet<ChunkCoord>,
    /// Population generations per chunk, bumped by every spawn
    ///
    /// Kept across unloads so a reloaded chunk never reuses an epoch (spawn
    /// seeds and pending regrowth requests depend on it). Holds one `u64` per
    /// chunk ever loaded, so it grows with the area a run has visited.
    epochs: AHashMap<ChunkCoord, u64>,
}

impl ChunkFlags {
    fn epoch(&self, coord: ChunkCoord) -> u64 {
        self.epochs.get(&coord).copied().unwrap_or(0)
    }

    /// Next epoch for the chunk, starting at 0
    fn bump_epoch(&mut self, coord: ChunkCoord) -> u64 {
        let epoch = self.epochs.entry(coord).or_insert(0);
        let current = *epoch;
        *epoch += 1;
        current
    }
}

pub struct ChunkLifecycle {
    runtime: Handle,
    registry: Arc<EntityRegistry>,
    config: Arc<SimulationConfig>,
    flags: Arc<Mutex<ChunkFlags>>,
    /// Most recent task per chunk
    lanes: Mutex<AHashMap<ChunkCoord, JoinHandle<()>>>,
}

impl ChunkLifecycle {
    pub fn new(runtime: Handle, registry: Arc<EntityRegistry>, config: Arc<SimulationConfig>) -> Self {
        Self {
            runtime,
            registry,
            config,
            flags: Arc::new(Mutex::new(ChunkFlags::default())),
            lanes: Mutex::new(AHashMap::new()),
        }
    }

    /// Queue the spawn side effect for a freshly loaded chunk
    ///
    /// Spawning happens at most once per residency: the task checks and sets
    /// the chunk's generated flag before doing anything.
    pub fn on_loaded(&self, coord: ChunkCoord, spawnable: Vec<Coord>, tick: Tick) {
        let flags = Arc::clone(&self.flags);
        let registry = Arc::clone(&self.registry);
        let config = Arc::clone(&self.config);
        self.submit(coord, move || {
            let epoch = {
                let mut flags = flags.lock().unwrap_or_else(PoisonError::into_inner);
                if !flags.generated.insert(coord) {
                    tracing::debug!(?coord, "chunk entities already generated");
                    return;
                }
                flags.bump_epoch(coord)
            };
            let batch = populate_chunk(coord, &spawnable, &config, epoch, tick);
            tracing::debug!(
                ?coord,
                actors = batch.actors.len(),
                villages = batch.villages.len(),
                "chunk entities generated"
            );
            registry.stage_spawn(batch);
        });
    }

    /// Queue removal of every entity in an evicted chunk and clear its flag
    pub fn on_unloaded(&self, coord: ChunkCoord) {
        let flags = Arc::clone(&self.flags);
        let registry = Arc::clone(&self.registry);
        self.submit(coord, move || {
            registry.stage_despawn_chunk(coord);
            flags
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .generated
                .remove(&coord);
        });
    }

    /// Queue regrown wildlife for a chunk
    ///
    /// `census_epoch` is the chunk's epoch when its population was counted.
    /// The request is skipped if the chunk was evicted meanwhile or its
    /// population was generated again since the census.
    pub fn request_wildlife(
        &self,
        coord: ChunkCoord,
        spawnable: Vec<Coord>,
        predators: u32,
        prey: u32,
        census_epoch: u64,
        tick: Tick,
    ) {
        let flags = Arc::clone(&self.flags);
        let registry = Arc::clone(&self.registry);
        let config = Arc::clone(&self.config);
        self.submit(coord, move || {
            let epoch = {
                let mut flags = flags.lock().unwrap_or_else(PoisonError::into_inner);
                if !flags.generated.contains(&coord) {
                    return;
                }
                if flags.epoch(coord) != census_epoch {
                    tracing::debug!(?coord, census_epoch, "stale wildlife request dropped");
                    return;
                }
                flags.bump_epoch(coord)
            };
            let batch = regrow_wildlife(coord, &spawnable, predators, prey, &config, epoch, tick);
            tracing::debug!(?coord, actors = batch.actors.len(), "wildlife regrown");
            registry.stage_spawn(batch);
        });
    }

    /// Append work to the chunk's lane
    fn submit<F>(&self, coord: ChunkCoord, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        lanes.retain(|c, handle| *c == coord || !handle.is_finished());

        let previous = lanes.remove(&coord);
        let handle = self.runtime.spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::warn!(?coord, error = %e, "previous chunk task failed");
                }
            }
            work();
        });
        lanes.insert(coord, handle);
    }

    /// Wait until every submitted task has finished
    pub async fn settle(&self) {
        let handles: Vec<(ChunkCoord, JoinHandle<()>)> = {
            let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
            lanes.drain().collect()
        };
        for (coord, handle) in handles {
            if let Err(e) = handle.await {
                tracing::warn!(?coord, error = %e, "chunk task failed");
            }
        }
    }

    /// True when no chunk task is pending
    pub fn is_idle(&self) -> bool {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(|h| h.is_finished())
    }

    /// True when no task for the chunk is queued or running
    pub fn is_settled(&self, coord: ChunkCoord) -> bool {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&coord)
            .map_or(true, |h| h.is_finished())
    }

    /// Current population epoch of the chunk
    pub fn epoch(&self, coord: ChunkCoord) -> u64 {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner).epoch(coord)
    }

    pub fn is_generated(&self, coord: ChunkCoord) -> bool {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generated
            .contains(&coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::registry::StagedChange;

    fn lifecycle() -> (ChunkLifecycle, Arc<EntityRegistry>) {
        let registry = Arc::new(EntityRegistry::new());
        let config = Arc::new(SimulationConfig {
            village_chance: 0.0,
            ..SimulationConfig::default()
        });
        (ChunkLifecycle::new(Handle::current(), Arc::clone(&registry), config), registry)
    }

    fn cells() -> Vec<Coord> {
        (0..4).flat_map(|y| (0..4).map(move |x| Coord::new(x, y))).collect()
    }

    #[tokio::test]
    async fn test_load_spawns_once() {
        let (lifecycle, registry) = lifecycle();
        let coord = ChunkCoord::new(0, 0);
        lifecycle.on_loaded(coord, cells(), 0);
        lifecycle.on_loaded(coord, cells(), 0);
        lifecycle.settle().await;

        assert!(lifecycle.is_generated(coord));
        let staged = registry.drain_staged();
        assert_eq!(staged.len(), 1);
        assert!(matches!(&staged[0], StagedChange::Spawn(b) if b.chunk == coord));
    }

    #[tokio::test]
    async fn test_lane_preserves_submission_order() {
        let (lifecycle, registry) = lifecycle();
        let coord = ChunkCoord::new(2, 3);
        lifecycle.on_loaded(coord, cells(), 0);
        lifecycle.on_unloaded(coord);
        lifecycle.on_loaded(coord, cells(), 0);
        lifecycle.settle().await;

        let staged = registry.drain_staged();
        assert_eq!(staged.len(), 3);
        assert!(matches!(staged[0], StagedChange::Spawn(_)));
        assert!(matches!(staged[1], StagedChange::DespawnChunk(c) if c == coord));
        assert!(matches!(staged[2], StagedChange::Spawn(_)));
        assert!(lifecycle.is_generated(coord));
        assert!(lifecycle.is_idle());
    }

    #[tokio::test]
    async fn test_unload_clears_flag() {
        let (lifecycle, _registry) = lifecycle();
        let coord = ChunkCoord::new(-1, 0);
        lifecycle.on_loaded(coord, cells(), 0);
        lifecycle.on_unloaded(coord);
        lifecycle.settle().await;
        assert!(!lifecycle.is_generated(coord));
    }

    #[tokio::test]
    async fn test_wildlife_request_for_evicted_chunk_is_dropped() {
        let (lifecycle, registry) = lifecycle();
        let coord = ChunkCoord::new(4, 4);
        lifecycle.request_wildlife(coord, cells(), 1, 1, 0, 0);
        lifecycle.settle().await;
        assert_eq!(registry.staged_len(), 0);

        lifecycle.on_loaded(coord, cells(), 0);
        lifecycle.request_wildlife(coord, cells(), 1, 2, 1, 0);
        lifecycle.settle().await;
        let staged = registry.drain_staged();
        assert_eq!(staged.len(), 2);
        match &staged[1] {
            StagedChange::Spawn(batch) => assert_eq!(batch.actors.len(), 3),
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wildlife_request_from_stale_census_is_dropped() {
        let (lifecycle, registry) = lifecycle();
        let coord = ChunkCoord::new(1, 1);
        lifecycle.on_loaded(coord, cells(), 0);
        lifecycle.settle().await;
        assert_eq!(lifecycle.epoch(coord), 1);
        assert!(lifecycle.is_settled(coord));
        registry.drain_staged();

        // Counted at epoch 0, before the chunk's own spawn
        lifecycle.request_wildlife(coord, cells(), 1, 2, 0, 0);
        assert!(!lifecycle.is_settled(coord));
        lifecycle.settle().await;
        assert_eq!(registry.staged_len(), 0);

        // A request that won consumes the epoch, so a duplicate is dropped
        lifecycle.request_wildlife(coord, cells(), 1, 2, 1, 0);
        lifecycle.request_wildlife(coord, cells(), 1, 2, 1, 0);
        lifecycle.settle().await;
        assert_eq!(registry.drain_staged().len(), 1);
        assert_eq!(lifecycle.epoch(coord), 2);
    }

    #[tokio::test]
    async fn test_epoch_survives_unload() {
        let (lifecycle, _registry) = lifecycle();
        let coord = ChunkCoord::new(3, 0);
        lifecycle.on_loaded(coord, cells(), 0);
        lifecycle.on_unloaded(coord);
        lifecycle.settle().await;
        assert!(!lifecycle.is_generated(coord));
        assert_eq!(lifecycle.epoch(coord), 1);

        lifecycle.on_loaded(coord, cells(), 5);
        lifecycle.settle().await;
        assert_eq!(lifecycle.epoch(coord), 2);
    }
}
