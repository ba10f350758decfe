//! Fixed-size blocks of cells

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use ahash::AHashMap;

use crate::catalog::TerrainId;
use crate::core::types::{ChunkCoord, Coord};
use crate::entity::inventory::Inventory;
use crate::world::cell::WorldCell;

#[derive(Debug, Clone)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub size: i32,
    cells: Vec<WorldCell>,
    /// Loose items lying on cells of this chunk
    ground_items: AHashMap<Coord, Inventory>,
}

impl Chunk {
    /// Build from row-major cells; `cells.len()` must be `size * size`
    pub fn from_cells(coord: ChunkCoord, size: i32, cells: Vec<WorldCell>) -> Self {
        debug_assert_eq!(cells.len(), (size * size) as usize);
        Self {
            coord,
            size,
            cells,
            ground_items: AHashMap::new(),
        }
    }

    /// A chunk where every cell is `cell`
    pub fn filled(coord: ChunkCoord, size: i32, cell: WorldCell) -> Self {
        Self::from_cells(coord, size, vec![cell; (size * size) as usize])
    }

    #[inline]
    fn index(&self, cell: Coord) -> Option<usize> {
        let origin = self.coord.origin(self.size);
        let local = cell - origin;
        if local.x < 0 || local.y < 0 || local.x >= self.size || local.y >= self.size {
            return None;
        }
        Some((local.y * self.size + local.x) as usize)
    }

    pub fn get(&self, cell: Coord) -> Option<&WorldCell> {
        self.index(cell).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, cell: Coord) -> Option<&mut WorldCell> {
        self.index(cell).map(move |i| &mut self.cells[i])
    }

    /// Cells with their world coordinates, row-major
    pub fn iter(&self) -> impl Iterator<Item = (Coord, &WorldCell)> {
        self.coord.cells(self.size).zip(self.cells.iter())
    }

    pub fn terrain_counts(&self) -> AHashMap<TerrainId, u32> {
        let mut counts = AHashMap::new();
        for cell in &self.cells {
            *counts.entry(cell.terrain).or_insert(0) += 1;
        }
        counts
    }

    /// Walkable cells an entity could be placed on
    pub fn spawnable_cells(&self) -> Vec<Coord> {
        self.iter()
            .filter(|(_, cell)| cell.walkable)
            .map(|(coord, _)| coord)
            .collect()
    }

    /// Stable hash of the cell content, used to detect non-deterministic regeneration
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.coord.hash(&mut hasher);
        for cell in &self.cells {
            cell.terrain.hash(&mut hasher);
            cell.cell_type.hash(&mut hasher);
        }
        hasher.finish()
    }

    pub fn drop_items(&mut self, cell: Coord, items: Inventory) {
        if items.is_empty() || self.index(cell).is_none() {
            return;
        }
        self.ground_items.entry(cell).or_default().merge(items);
    }

    pub fn take_items(&mut self, cell: Coord) -> Inventory {
        self.ground_items.remove(&cell).unwrap_or_default()
    }

    pub fn items_at(&self, cell: Coord) -> Option<&Inventory> {
        self.ground_items.get(&cell)
    }

    pub fn ground_item_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.ground_items.keys().copied()
    }
}
