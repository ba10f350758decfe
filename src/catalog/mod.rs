//! Static terrain and item catalogs
//!
//! Built once at startup and shared read-only. Cells copy what they need out of
//! a descriptor; nothing ever mutates a catalog entry after construction.

pub mod items;
pub mod terrain;

pub use items::{ItemCatalog, ItemDescriptor, ItemId};
pub use terrain::{CellTypeId, CellVariant, Rgb, TerrainCatalog, TerrainDescriptor, TerrainId};

use crate::core::error::{Result, SimError};

#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub terrain: TerrainCatalog,
    pub items: ItemCatalog,
}

impl Catalogs {
    pub fn builtin() -> Self {
        Self {
            terrain: TerrainCatalog::builtin(),
            items: ItemCatalog::builtin(),
        }
    }

    /// Check every cross-reference; a dangling id is corrupted startup state
    pub fn validate(&self) -> Result<()> {
        for base in [terrain::WATER, terrain::GRASS, terrain::SAND, terrain::MOUNTAIN, terrain::HOUSE] {
            self.terrain.get(base)?;
        }
        for descriptor in self.terrain.iter() {
            if descriptor.variants.is_empty() {
                return Err(SimError::InvalidConfig(format!(
                    "terrain '{}' has no cell variants",
                    descriptor.name
                )));
            }
            for (item, _) in &descriptor.drops {
                self.items.get(*item)?;
            }
            if let Some(next) = descriptor.replaced_by {
                self.terrain.get(next)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogs_validate() {
        assert!(Catalogs::builtin().validate().is_ok());
    }

    #[test]
    fn test_dangling_drop_fails_validation() {
        let mut catalogs = Catalogs::builtin();
        let mut tree = catalogs.terrain.get(terrain::TREE).unwrap().clone();
        tree.drops.push((ItemId(4242), 1));
        catalogs.terrain.insert(tree);

        assert!(matches!(catalogs.validate(), Err(SimError::UnknownItem(ItemId(4242)))));
    }
}
