//! Core type definitions used throughout the codebase

use glam::IVec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Integer cell coordinate on the world grid
pub type Coord = IVec2;

/// Manhattan distance between two cells
#[inline]
pub fn manhattan(a: Coord, b: Coord) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// The four orthogonal neighbours of a cell
#[inline]
pub fn neighbors4(c: Coord) -> [Coord; 4] {
    [
        Coord::new(c.x + 1, c.y),
        Coord::new(c.x - 1, c.y),
        Coord::new(c.x, c.y + 1),
        Coord::new(c.x, c.y - 1),
    ]
}

/// Unique identifier for villages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VillageId(pub Uuid);

impl VillageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VillageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Chunk coordinate (in chunk units, not cells)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing the given cell
    #[inline]
    pub fn containing(cell: Coord, chunk_size: i32) -> Self {
        Self {
            x: cell.x.div_euclid(chunk_size),
            y: cell.y.div_euclid(chunk_size),
        }
    }

    /// Cell coordinate of this chunk's top-left corner
    #[inline]
    pub fn origin(&self, chunk_size: i32) -> Coord {
        Coord::new(self.x * chunk_size, self.y * chunk_size)
    }

    pub fn contains(&self, cell: Coord, chunk_size: i32) -> bool {
        Self::containing(cell, chunk_size) == *self
    }

    /// Chessboard distance in chunks
    pub fn distance(&self, other: &Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// All cells of this chunk in row-major order
    pub fn cells(&self, chunk_size: i32) -> impl Iterator<Item = Coord> {
        let origin = self.origin(chunk_size);
        (0..chunk_size).flat_map(move |dy| {
            (0..chunk_size).map(move |dx| Coord::new(origin.x + dx, origin.y + dy))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan() {
        assert_eq!(manhattan(Coord::new(0, 0), Coord::new(3, -4)), 7);
        assert_eq!(manhattan(Coord::new(2, 2), Coord::new(2, 2)), 0);
    }

    #[test]
    fn test_chunk_containing_negative_cells() {
        assert_eq!(ChunkCoord::containing(Coord::new(-1, -1), 16), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::containing(Coord::new(-16, 0), 16), ChunkCoord::new(-1, 0));
        assert_eq!(ChunkCoord::containing(Coord::new(15, 16), 16), ChunkCoord::new(0, 1));
    }

    #[test]
    fn test_chunk_cells_cover_chunk() {
        let chunk = ChunkCoord::new(-2, 3);
        let cells: Vec<_> = chunk.cells(8).collect();
        assert_eq!(cells.len(), 64);
        assert!(cells.iter().all(|c| chunk.contains(*c, 8)));
        assert_eq!(cells[0], Coord::new(-16, 24));
    }

    #[test]
    fn test_chunk_distance() {
        let a = ChunkCoord::new(0, 0);
        assert_eq!(a.distance(&ChunkCoord::new(2, -1)), 2);
        assert_eq!(a.distance(&a), 0);
    }
}
