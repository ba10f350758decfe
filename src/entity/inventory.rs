//! Item inventories carried by actors, villages and the ground

use ahash::AHashMap;

use crate::catalog::ItemId;

/// Item id -> quantity. Quantities are never zero: an emptied entry is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    items: AHashMap<ItemId, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current quantity of an item (0 if absent)
    pub fn get(&self, item: ItemId) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.items.contains_key(&item)
    }

    pub fn add(&mut self, item: ItemId, amount: u32) {
        if amount == 0 {
            return;
        }
        *self.items.entry(item).or_insert(0) += amount;
    }

    /// Remove up to `amount`, returns amount actually removed
    ///
    /// Clamps to what is held; taking the last unit deletes the entry.
    pub fn take(&mut self, item: ItemId, amount: u32) -> u32 {
        let Some(held) = self.items.get_mut(&item) else {
            return 0;
        };
        let taken = amount.min(*held);
        *held -= taken;
        if *held == 0 {
            self.items.remove(&item);
        }
        taken
    }

    /// Move everything out, leaving this inventory empty
    pub fn take_all(&mut self) -> Inventory {
        std::mem::take(self)
    }

    pub fn merge(&mut self, other: Inventory) {
        for (item, amount) in other.items {
            self.add(item, amount);
        }
    }

    /// Items in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        let mut entries: Vec<_> = self.items.iter().map(|(i, q)| (*i, *q)).collect();
        entries.sort();
        entries.into_iter()
    }

    pub fn total(&self) -> u32 {
        self.items.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
