//! Item descriptors

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u16);

pub const WOOD: ItemId = ItemId(0);
pub const BERRIES: ItemId = ItemId(1);
pub const STONE: ItemId = ItemId(2);
pub const MEAT: ItemId = ItemId(3);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub id: ItemId,
    pub name: String,
    /// Hunger restored per unit eaten; None = inedible
    pub edible_worth: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: AHashMap<ItemId, ItemDescriptor>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (id, name, worth) in [
            (WOOD, "wood", None),
            (BERRIES, "berries", Some(15)),
            (STONE, "stone", None),
            (MEAT, "meat", Some(25)),
        ] {
            catalog.insert(ItemDescriptor {
                id,
                name: name.to_string(),
                edible_worth: worth,
            });
        }
        catalog
    }

    pub fn insert(&mut self, descriptor: ItemDescriptor) {
        self.items.insert(descriptor.id, descriptor);
    }

    pub fn get(&self, id: ItemId) -> Result<&ItemDescriptor> {
        self.items.get(&id).ok_or(SimError::UnknownItem(id))
    }

    pub fn edible_worth(&self, id: ItemId) -> Option<u32> {
        self.items.get(&id).and_then(|i| i.edible_worth)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }
}
