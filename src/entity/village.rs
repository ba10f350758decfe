//! Villages: shared storage and a roster of residents

use ahash::AHashSet;

use crate::core::types::{manhattan, ChunkCoord, Coord, EntityId, VillageId};
use crate::entity::inventory::Inventory;

#[derive(Debug, Clone)]
pub struct Village {
    pub id: VillageId,
    pub position: Coord,
    pub radius: i32,
    pub inventory: Inventory,
    pub houses: AHashSet<Coord>,
    pub residents: Vec<EntityId>,
}

impl Village {
    pub fn new(position: Coord, radius: i32) -> Self {
        Self {
            id: VillageId::new(),
            position,
            radius,
            inventory: Inventory::new(),
            houses: AHashSet::new(),
            residents: Vec::new(),
        }
    }

    /// True if the cell is within the village radius (Manhattan)
    pub fn contains(&self, cell: Coord) -> bool {
        manhattan(self.position, cell) <= self.radius
    }

    pub fn chunk(&self, chunk_size: i32) -> ChunkCoord {
        ChunkCoord::containing(self.position, chunk_size)
    }

    pub fn add_resident(&mut self, id: EntityId) {
        if !self.residents.contains(&id) {
            self.residents.push(id);
        }
    }

    pub fn remove_resident(&mut self, id: EntityId) {
        self.residents.retain(|r| *r != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_village_contains_radius() {
        let village = Village::new(Coord::new(10, 10), 3);
        assert!(village.contains(Coord::new(12, 11)));
        assert!(!village.contains(Coord::new(13, 11)));
    }

    #[test]
    fn test_roster_has_no_duplicates() {
        let mut village = Village::new(Coord::new(0, 0), 3);
        let id = EntityId::new();
        village.add_resident(id);
        village.add_resident(id);
        assert_eq!(village.residents.len(), 1);
        village.remove_resident(id);
        assert!(village.residents.is_empty());
    }
}
