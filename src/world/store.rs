//! Chunked world store
//!
//! Owns every loaded chunk. Reads and writes are synchronous so a mutation made
//! during a tick is visible to everything that runs later in the same tick.

use std::sync::Arc;

use ahash::AHashMap;

use crate::catalog::{Catalogs, Rgb, TerrainDescriptor, TerrainId};
use crate::core::error::{Result, SimError};
use crate::core::types::{manhattan, ChunkCoord, Coord};
use crate::entity::inventory::Inventory;
use crate::world::cell::WorldCell;
use crate::world::chunk::Chunk;
use crate::world::events::{EventSink, WorldEvent};
use crate::world::generation::TerrainGenerator;

pub struct ChunkStore {
    generator: TerrainGenerator,
    chunks: AHashMap<ChunkCoord, Chunk>,
    /// Fingerprint of every chunk ever generated, kept across evictions
    ///
    /// Never pruned: a reload is checked against it. One u64 per chunk
    /// visited, so it grows with the explored area, not with time.
    fingerprints: AHashMap<ChunkCoord, u64>,
    events: EventSink,
}

impl ChunkStore {
    pub fn new(generator: TerrainGenerator, events: EventSink) -> Self {
        Self {
            generator,
            chunks: AHashMap::new(),
            fingerprints: AHashMap::new(),
            events,
        }
    }

    pub fn chunk_size(&self) -> i32 {
        self.generator.chunk_size()
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn set_event_sink(&mut self, events: EventSink) {
        self.events = events;
    }

    pub fn chunk_of(&self, cell: Coord) -> ChunkCoord {
        ChunkCoord::containing(cell, self.chunk_size())
    }

    /// Generate and insert a chunk. Returns false if it was already loaded.
    ///
    /// A chunk that was generated before must come back identical; anything
    /// else means the generator is not deterministic and the world is corrupt.
    pub fn load(&mut self, coord: ChunkCoord) -> Result<bool> {
        if self.chunks.contains_key(&coord) {
            return Ok(false);
        }

        let chunk = self.generator.generate(coord)?;
        let fingerprint = chunk.fingerprint();
        match self.fingerprints.get(&coord) {
            Some(&expected) if expected != fingerprint => {
                tracing::error!(?coord, expected, actual = fingerprint, "chunk regeneration mismatch");
                return Err(SimError::ChunkRegenerationMismatch {
                    coord,
                    expected,
                    actual: fingerprint,
                });
            }
            Some(_) => tracing::debug!(?coord, "chunk regenerated identically"),
            None => {
                self.fingerprints.insert(coord, fingerprint);
            }
        }

        self.chunks.insert(coord, chunk);
        self.events.emit(WorldEvent::ChunkLoaded(coord));
        Ok(true)
    }

    /// Insert a prebuilt chunk, bypassing generation (tools and tests)
    pub fn insert_chunk(&mut self, chunk: Chunk) {
        let coord = chunk.coord;
        self.chunks.insert(coord, chunk);
        self.events.emit(WorldEvent::ChunkLoaded(coord));
    }

    /// Evict a chunk, returning it if it was loaded
    pub fn unload(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        let chunk = self.chunks.remove(&coord)?;
        self.events.emit(WorldEvent::ChunkUnloaded(coord));
        Some(chunk)
    }

    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn is_cell_loaded(&self, cell: Coord) -> bool {
        self.is_loaded(self.chunk_of(cell))
    }

    /// Loaded chunk coordinates in sorted order
    pub fn loaded_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.chunks.keys().copied().collect();
        coords.sort();
        coords
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn cell(&self, cell: Coord) -> Option<&WorldCell> {
        self.chunks.get(&self.chunk_of(cell))?.get(cell)
    }

    pub fn terrain_at(&self, cell: Coord) -> Option<TerrainId> {
        self.cell(cell).map(|c| c.terrain)
    }

    /// Unloaded cells are never walkable
    pub fn is_walkable(&self, cell: Coord) -> bool {
        self.cell(cell).map(|c| c.walkable).unwrap_or(false)
    }

    /// Replace a cell's terrain; visible immediately and reported to the renderer
    pub fn set_terrain(&mut self, cell: Coord, descriptor: &TerrainDescriptor) -> bool {
        let chunk_coord = self.chunk_of(cell);
        let Some(slot) = self.chunks.get_mut(&chunk_coord).and_then(|c| c.get_mut(cell)) else {
            return false;
        };
        let variant = (cell.x.wrapping_mul(31) ^ cell.y.wrapping_mul(17)).unsigned_abs() as usize;
        *slot = WorldCell::from_descriptor(descriptor, variant);
        let snapshot = slot.clone();
        self.events.emit(WorldEvent::CellChanged { coord: cell, cell: snapshot });
        true
    }

    /// Change only the visual color of a cell
    pub fn set_color(&mut self, cell: Coord, color: Rgb) -> bool {
        let chunk_coord = self.chunk_of(cell);
        let Some(slot) = self.chunks.get_mut(&chunk_coord).and_then(|c| c.get_mut(cell)) else {
            return false;
        };
        if slot.color == color {
            return true;
        }
        slot.color = color;
        let snapshot = slot.clone();
        self.events.emit(WorldEvent::CellChanged { coord: cell, cell: snapshot });
        true
    }

    /// Cells within `radius` (Manhattan) holding one of `wanted`, nearest first
    ///
    /// Ties are broken by (y, x) so the order is stable.
    pub fn find_terrain_near(&self, center: Coord, radius: i32, wanted: &[TerrainId]) -> Vec<Coord> {
        let mut found = Vec::new();
        for dy in -radius..=radius {
            let span = radius - dy.abs();
            for dx in -span..=span {
                let cell = Coord::new(center.x + dx, center.y + dy);
                if let Some(terrain) = self.terrain_at(cell) {
                    if wanted.contains(&terrain) {
                        found.push(cell);
                    }
                }
            }
        }
        found.sort_by_key(|c| (manhattan(center, *c), c.y, c.x));
        found
    }

    pub fn drop_items(&mut self, cell: Coord, items: Inventory) -> bool {
        let chunk_coord = self.chunk_of(cell);
        match self.chunks.get_mut(&chunk_coord) {
            Some(chunk) => {
                chunk.drop_items(cell, items);
                true
            }
            None => false,
        }
    }

    pub fn take_items(&mut self, cell: Coord) -> Inventory {
        let chunk_coord = self.chunk_of(cell);
        self.chunks
            .get_mut(&chunk_coord)
            .map(|c| c.take_items(cell))
            .unwrap_or_default()
    }

    pub fn items_at(&self, cell: Coord) -> Option<&Inventory> {
        self.chunks.get(&self.chunk_of(cell))?.items_at(cell)
    }

    /// Ground item cells within `radius` of `center`, nearest first
    pub fn ground_items_near(&self, center: Coord, radius: i32) -> Vec<Coord> {
        let mut found: Vec<Coord> = self
            .chunks
            .values()
            .flat_map(|c| c.ground_item_cells())
            .filter(|c| manhattan(center, *c) <= radius)
            .collect();
        found.sort_by_key(|c| (manhattan(center, *c), c.y, c.x));
        found
    }

    pub fn spawnable_cells(&self, coord: ChunkCoord) -> Vec<Coord> {
        self.chunks
            .get(&coord)
            .map(|c| c.spawnable_cells())
            .unwrap_or_default()
    }
}

/// Build a store around a generator for the given catalogs (shared helper)
pub fn store_for(
    config: &crate::core::config::SimulationConfig,
    catalogs: Arc<Catalogs>,
    events: EventSink,
) -> ChunkStore {
    ChunkStore::new(TerrainGenerator::new(config, catalogs), events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::items::BERRIES;
    use crate::catalog::terrain::{self, GRASS, TREE};
    use crate::core::config::SimulationConfig;

    fn small_store() -> (ChunkStore, Arc<Catalogs>) {
        let config = SimulationConfig {
            chunk_size: 8,
            ..SimulationConfig::default()
        };
        let catalogs = Arc::new(Catalogs::builtin());
        (store_for(&config, catalogs.clone(), EventSink::disabled()), catalogs)
    }

    fn grass_chunk(coord: ChunkCoord, catalogs: &Catalogs) -> Chunk {
        let grass = WorldCell::from_descriptor(catalogs.terrain.get(GRASS).unwrap(), 0);
        Chunk::filled(coord, 8, grass)
    }

    #[test]
    fn test_unloaded_cells_are_not_walkable() {
        let (mut store, catalogs) = small_store();
        store.insert_chunk(grass_chunk(ChunkCoord::new(0, 0), &catalogs));
        assert!(store.is_walkable(Coord::new(3, 3)));
        assert!(!store.is_walkable(Coord::new(8, 3)));
        assert!(!store.is_walkable(Coord::new(-1, 0)));
    }

    #[test]
    fn test_load_is_idempotent() {
        let (mut store, _) = small_store();
        assert!(store.load(ChunkCoord::new(0, 0)).unwrap());
        assert!(!store.load(ChunkCoord::new(0, 0)).unwrap());
        assert_eq!(store.loaded_count(), 1);
    }

    #[test]
    fn test_reload_after_eviction_matches() {
        let (mut store, _) = small_store();
        let coord = ChunkCoord::new(2, -1);
        store.load(coord).unwrap();
        let first = store.chunk(coord).unwrap().fingerprint();
        store.unload(coord);
        assert!(!store.is_loaded(coord));
        store.load(coord).unwrap();
        assert_eq!(store.chunk(coord).unwrap().fingerprint(), first);
    }

    #[test]
    fn test_set_terrain_is_visible_immediately_and_notifies() {
        let config = SimulationConfig {
            chunk_size: 8,
            ..SimulationConfig::default()
        };
        let catalogs = Arc::new(Catalogs::builtin());
        let (sink, mut rx) = EventSink::channel();
        let mut store = store_for(&config, catalogs.clone(), sink);
        store.insert_chunk(grass_chunk(ChunkCoord::new(0, 0), &catalogs));

        let tree = catalogs.terrain.get(TREE).unwrap();
        assert!(store.set_terrain(Coord::new(2, 2), tree));
        assert_eq!(store.terrain_at(Coord::new(2, 2)), Some(TREE));
        assert!(!store.is_walkable(Coord::new(2, 2)));

        assert_eq!(rx.try_recv().unwrap(), WorldEvent::ChunkLoaded(ChunkCoord::new(0, 0)));
        match rx.try_recv().unwrap() {
            WorldEvent::CellChanged { coord, cell } => {
                assert_eq!(coord, Coord::new(2, 2));
                assert_eq!(cell.terrain, TREE);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_set_terrain_outside_loaded_chunks_fails() {
        let (mut store, catalogs) = small_store();
        let grass = catalogs.terrain.get(terrain::GRASS).unwrap();
        assert!(!store.set_terrain(Coord::new(100, 100), grass));
    }

    #[test]
    fn test_find_terrain_near_orders_by_distance() {
        let (mut store, catalogs) = small_store();
        store.insert_chunk(grass_chunk(ChunkCoord::new(0, 0), &catalogs));
        let tree = catalogs.terrain.get(TREE).unwrap();
        store.set_terrain(Coord::new(6, 6), tree);
        store.set_terrain(Coord::new(2, 1), tree);
        store.set_terrain(Coord::new(1, 2), tree);

        let found = store.find_terrain_near(Coord::new(1, 1), 10, &[TREE]);
        assert_eq!(found, vec![Coord::new(2, 1), Coord::new(1, 2), Coord::new(6, 6)]);
    }

    #[test]
    fn test_ground_items_round_trip() {
        let (mut store, catalogs) = small_store();
        store.insert_chunk(grass_chunk(ChunkCoord::new(0, 0), &catalogs));
        let mut items = Inventory::new();
        items.add(BERRIES, 2);

        assert!(store.drop_items(Coord::new(4, 4), items));
        assert_eq!(store.ground_items_near(Coord::new(0, 0), 8), vec![Coord::new(4, 4)]);
        assert_eq!(store.take_items(Coord::new(4, 4)).get(BERRIES), 2);
        assert!(store.ground_items_near(Coord::new(0, 0), 8).is_empty());
    }
}
