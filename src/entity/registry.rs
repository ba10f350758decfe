//! Thread-safe staged registry of live entities
//!
//! Background chunk tasks never touch the live actor set directly. They append
//! `StagedChange`s here; the main loop drains and applies them at the start of
//! a tick. Readers on other threads get an immutable `Arc` snapshot of the live
//! set as of the last publish, so iteration never races a mutation.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use ahash::AHashMap;

use crate::core::types::{ChunkCoord, Coord, EntityId, VillageId};
use crate::entity::actor::{Actor, ActorKind};
use crate::entity::village::Village;

/// Entities generated for one chunk, waiting to go live
#[derive(Debug)]
pub struct SpawnBatch {
    pub chunk: ChunkCoord,
    pub actors: Vec<Actor>,
    pub villages: Vec<Village>,
}

impl SpawnBatch {
    pub fn new(chunk: ChunkCoord) -> Self {
        Self {
            chunk,
            actors: Vec::new(),
            villages: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty() && self.villages.is_empty()
    }
}

#[derive(Debug)]
pub enum StagedChange {
    Spawn(SpawnBatch),
    /// Remove every entity positioned inside the chunk
    DespawnChunk(ChunkCoord),
    Despawn(EntityId),
}

/// What outside readers may know about a live entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub id: EntityId,
    pub kind: ActorKind,
    pub position: Coord,
    pub chunk: ChunkCoord,
    pub predator: bool,
    pub home: Option<VillageId>,
}

/// Per-chunk population counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkPopulation {
    pub entities: u32,
    pub wildlife: u32,
    pub predators: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub records: Vec<EntityRecord>,
}

impl RegistrySnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn in_chunk(&self, chunk: ChunkCoord) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter().filter(move |r| r.chunk == chunk)
    }

    pub fn population_by_chunk(&self) -> AHashMap<ChunkCoord, ChunkPopulation> {
        let mut counts: AHashMap<ChunkCoord, ChunkPopulation> = AHashMap::new();
        for record in &self.records {
            let entry = counts.entry(record.chunk).or_default();
            entry.entities += 1;
            if record.kind.is_wildlife() {
                entry.wildlife += 1;
                if record.predator {
                    entry.predators += 1;
                }
            }
        }
        counts
    }
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    staged: Mutex<Vec<StagedChange>>,
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_spawn(&self, batch: SpawnBatch) {
        if batch.is_empty() {
            return;
        }
        self.stage(StagedChange::Spawn(batch));
    }

    pub fn stage_despawn_chunk(&self, chunk: ChunkCoord) {
        self.stage(StagedChange::DespawnChunk(chunk));
    }

    pub fn stage_despawn(&self, id: EntityId) {
        self.stage(StagedChange::Despawn(id));
    }

    fn stage(&self, change: StagedChange) {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(change);
    }

    /// Take every staged change in submission order
    pub fn drain_staged(&self) -> Vec<StagedChange> {
        std::mem::take(&mut *self.staged.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// True while a spawn for the chunk waits to be spliced in
    pub fn has_pending_spawn(&self, chunk: ChunkCoord) -> bool {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|change| matches!(change, StagedChange::Spawn(batch) if batch.chunk == chunk))
    }

    pub fn staged_len(&self) -> usize {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Replace the published view of the live set
    pub fn publish(&self, records: Vec<EntityRecord>) {
        let snapshot = Arc::new(RegistrySnapshot { records });
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Copy-on-read view of the live set
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::policy::PolicyTable;

    fn record(kind: ActorKind, chunk: ChunkCoord, predator: bool) -> EntityRecord {
        EntityRecord {
            id: EntityId::new(),
            kind,
            position: Coord::new(0, 0),
            chunk,
            predator,
            home: None,
        }
    }

    #[test]
    fn test_drain_preserves_submission_order() {
        let registry = EntityRegistry::new();
        let table = PolicyTable::default();
        let mut batch = SpawnBatch::new(ChunkCoord::new(0, 0));
        batch.actors.push(Actor::new(ActorKind::Rabbit, Coord::new(1, 1), table.get(ActorKind::Rabbit), 0));

        registry.stage_spawn(batch);
        registry.stage_despawn_chunk(ChunkCoord::new(0, 0));

        let drained = registry.drain_staged();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], StagedChange::Spawn(_)));
        assert!(matches!(drained[1], StagedChange::DespawnChunk(_)));
        assert_eq!(registry.staged_len(), 0);
    }

    #[test]
    fn test_pending_spawn_until_drained() {
        let registry = EntityRegistry::new();
        let table = PolicyTable::default();
        let chunk = ChunkCoord::new(2, 0);
        let mut batch = SpawnBatch::new(chunk);
        batch.actors.push(Actor::new(ActorKind::Deer, Coord::new(70, 3), table.get(ActorKind::Deer), 0));

        registry.stage_despawn_chunk(ChunkCoord::new(0, 0));
        assert!(!registry.has_pending_spawn(chunk));
        registry.stage_spawn(batch);
        assert!(registry.has_pending_spawn(chunk));
        assert!(!registry.has_pending_spawn(ChunkCoord::new(0, 0)));

        registry.drain_staged();
        assert!(!registry.has_pending_spawn(chunk));
    }

    #[test]
    fn test_empty_batch_is_not_staged() {
        let registry = EntityRegistry::new();
        registry.stage_spawn(SpawnBatch::new(ChunkCoord::new(0, 0)));
        assert_eq!(registry.staged_len(), 0);
    }

    #[test]
    fn test_snapshot_is_stable_across_publish() {
        let registry = EntityRegistry::new();
        registry.publish(vec![record(ActorKind::Deer, ChunkCoord::new(0, 0), false)]);
        let before = registry.snapshot();

        registry.publish(Vec::new());

        assert_eq!(before.len(), 1);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_population_by_chunk() {
        let a = ChunkCoord::new(0, 0);
        let b = ChunkCoord::new(1, 0);
        let snapshot = RegistrySnapshot {
            records: vec![
                record(ActorKind::Rabbit, a, false),
                record(ActorKind::Wolf, a, true),
                record(ActorKind::Villager, a, false),
                record(ActorKind::Deer, b, false),
            ],
        };

        let counts = snapshot.population_by_chunk();
        assert_eq!(
            counts[&a],
            ChunkPopulation {
                entities: 3,
                wildlife: 2,
                predators: 1
            }
        );
        assert_eq!(counts[&b].wildlife, 1);
        assert_eq!(counts[&b].predators, 0);
    }
}
