//! Terrain descriptors
//!
//! A terrain id is a logical category (grass, tree, ...). Each terrain owns one
//! or more cell types, which are purely visual variants of it.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::catalog::items::{self, ItemId};
use crate::core::error::{Result, SimError};

/// Logical terrain category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerrainId(pub u16);

/// Visual variant of a terrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellTypeId(pub u16);

pub const WATER: TerrainId = TerrainId(0);
pub const GRASS: TerrainId = TerrainId(1);
pub const SAND: TerrainId = TerrainId(2);
pub const MOUNTAIN: TerrainId = TerrainId(3);
pub const TREE: TerrainId = TerrainId(4);
pub const BERRY_BUSH: TerrainId = TerrainId(5);
pub const BOULDER: TerrainId = TerrainId(6);
pub const HOUSE: TerrainId = TerrainId(7);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// One glyph variant of a terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellVariant {
    pub cell_type: CellTypeId,
    pub glyph: char,
    pub color: Rgb,
}

/// Immutable description of a terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainDescriptor {
    pub id: TerrainId,
    pub name: String,
    pub walkable: bool,
    pub transparent: bool,
    pub is_resource: bool,
    pub variants: Vec<CellVariant>,
    /// Items granted when the cell is harvested
    pub drops: Vec<(ItemId, u32)>,
    /// Work ticks needed to harvest
    pub harvest_ticks: u32,
    /// Terrain the cell turns into once harvested
    pub replaced_by: Option<TerrainId>,
    /// Chance per eligible cell of rolling this resource during generation
    pub spawn_weight: f32,
}

impl TerrainDescriptor {
    fn basic(id: TerrainId, name: &str, walkable: bool, transparent: bool, variants: Vec<CellVariant>) -> Self {
        Self {
            id,
            name: name.to_string(),
            walkable,
            transparent,
            is_resource: false,
            variants,
            drops: Vec::new(),
            harvest_ticks: 0,
            replaced_by: None,
            spawn_weight: 0.0,
        }
    }

    fn resource(
        mut self,
        drops: Vec<(ItemId, u32)>,
        harvest_ticks: u32,
        replaced_by: TerrainId,
        spawn_weight: f32,
    ) -> Self {
        self.is_resource = true;
        self.drops = drops;
        self.harvest_ticks = harvest_ticks;
        self.replaced_by = Some(replaced_by);
        self.spawn_weight = spawn_weight;
        self
    }
}

fn variant(id: u16, glyph: char, color: Rgb) -> CellVariant {
    CellVariant {
        cell_type: CellTypeId(id),
        glyph,
        color,
    }
}

/// Read-only terrain lookup
#[derive(Debug, Clone, Default)]
pub struct TerrainCatalog {
    terrains: AHashMap<TerrainId, TerrainDescriptor>,
}

impl TerrainCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The terrain set the simulation ships with
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(TerrainDescriptor::basic(
            WATER,
            "water",
            false,
            true,
            vec![variant(0, '~', Rgb(40, 90, 200)), variant(1, '≈', Rgb(30, 80, 190))],
        ));
        catalog.insert(TerrainDescriptor::basic(
            GRASS,
            "grass",
            true,
            true,
            vec![
                variant(16, '.', Rgb(80, 170, 60)),
                variant(17, ',', Rgb(70, 160, 50)),
                variant(18, '"', Rgb(90, 180, 70)),
            ],
        ));
        catalog.insert(TerrainDescriptor::basic(
            SAND,
            "sand",
            true,
            true,
            vec![variant(32, '.', Rgb(220, 200, 130))],
        ));
        catalog.insert(TerrainDescriptor::basic(
            MOUNTAIN,
            "mountain",
            false,
            false,
            vec![variant(48, '^', Rgb(130, 120, 110)), variant(49, 'A', Rgb(150, 140, 130))],
        ));
        catalog.insert(
            TerrainDescriptor::basic(
                TREE,
                "tree",
                false,
                false,
                vec![variant(64, 'T', Rgb(20, 110, 30)), variant(65, '♣', Rgb(30, 100, 20))],
            )
            .resource(vec![(items::WOOD, 3)], 8, GRASS, 0.10),
        );
        catalog.insert(
            TerrainDescriptor::basic(
                BERRY_BUSH,
                "berry_bush",
                false,
                true,
                vec![variant(80, '%', Rgb(160, 40, 90))],
            )
            .resource(vec![(items::BERRIES, 4)], 4, GRASS, 0.04),
        );
        catalog.insert(
            TerrainDescriptor::basic(
                BOULDER,
                "boulder",
                false,
                false,
                vec![variant(96, 'o', Rgb(120, 120, 120))],
            )
            .resource(vec![(items::STONE, 2)], 12, GRASS, 0.015),
        );
        catalog.insert(TerrainDescriptor::basic(
            HOUSE,
            "house",
            false,
            false,
            vec![variant(112, 'H', Rgb(150, 90, 40))],
        ));
        catalog
    }

    pub fn insert(&mut self, descriptor: TerrainDescriptor) {
        self.terrains.insert(descriptor.id, descriptor);
    }

    /// Look up a terrain; a missing id means the catalog is corrupt
    pub fn get(&self, id: TerrainId) -> Result<&TerrainDescriptor> {
        self.terrains.get(&id).ok_or(SimError::UnknownTerrain(id))
    }

    pub fn by_name(&self, name: &str) -> Option<&TerrainDescriptor> {
        self.terrains.values().find(|t| t.name == name)
    }

    /// Resource terrains ordered rarest first (ties broken by id)
    pub fn resources_rarest_first(&self) -> Vec<&TerrainDescriptor> {
        let mut resources: Vec<_> = self.terrains.values().filter(|t| t.is_resource).collect();
        resources.sort_by(|a, b| {
            a.spawn_weight
                .partial_cmp(&b.spawn_weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        resources
    }

    /// Resource terrains whose drops include the given item
    pub fn resources_dropping(&self, item: ItemId) -> Vec<TerrainId> {
        let mut ids: Vec<_> = self
            .terrains
            .values()
            .filter(|t| t.is_resource && t.drops.iter().any(|(i, _)| *i == item))
            .map(|t| t.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &TerrainDescriptor> {
        self.terrains.values()
    }

    pub fn len(&self) -> usize {
        self.terrains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terrains.is_empty()
    }
}
