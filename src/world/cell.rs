//! Individual world cells

use serde::{Deserialize, Serialize};

use crate::catalog::{CellTypeId, Rgb, TerrainDescriptor, TerrainId};

/// One grid cell
///
/// Flags are copied out of the terrain descriptor when the cell is built, so
/// cells never hold references into the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldCell {
    pub cell_type: CellTypeId,
    pub terrain: TerrainId,
    pub walkable: bool,
    pub transparent: bool,
    pub is_resource: bool,
    pub glyph: char,
    pub color: Rgb,
}

impl WorldCell {
    /// Build a cell of `descriptor` using glyph variant `variant` (wrapped to range)
    pub fn from_descriptor(descriptor: &TerrainDescriptor, variant: usize) -> Self {
        let v = &descriptor.variants[variant % descriptor.variants.len()];
        Self {
            cell_type: v.cell_type,
            terrain: descriptor.id,
            walkable: descriptor.walkable,
            transparent: descriptor.transparent,
            is_resource: descriptor.is_resource,
            glyph: v.glyph,
            color: v.color,
        }
    }
}
