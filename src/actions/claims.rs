//! Claimed resource coordinates
//!
//! Before an action commits to a target cell it claims it here. The first
//! claimant wins; everyone else must look for another target. Each actor holds
//! at most one claim, released when its action ends, when it dies, or when it
//! is despawned.

use ahash::AHashMap;

use crate::core::types::{Coord, EntityId};

#[derive(Debug, Default)]
pub struct ClaimTable {
    by_cell: AHashMap<Coord, EntityId>,
    by_actor: AHashMap<EntityId, Coord>,
}

impl ClaimTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `cell` for `actor`, giving up any cell the actor held before
    ///
    /// Returns false if another actor already holds the cell.
    pub fn try_claim(&mut self, actor: EntityId, cell: Coord) -> bool {
        match self.by_cell.get(&cell) {
            Some(holder) if *holder == actor => return true,
            Some(_) => return false,
            None => {}
        }
        self.release(actor);
        self.by_cell.insert(cell, actor);
        self.by_actor.insert(actor, cell);
        true
    }

    pub fn holder(&self, cell: Coord) -> Option<EntityId> {
        self.by_cell.get(&cell).copied()
    }

    /// True if someone other than `actor` holds the cell
    pub fn is_claimed_by_other(&self, cell: Coord, actor: EntityId) -> bool {
        self.holder(cell).map_or(false, |h| h != actor)
    }

    pub fn claim_of(&self, actor: EntityId) -> Option<Coord> {
        self.by_actor.get(&actor).copied()
    }

    /// Drop the actor's claim, returning the freed cell
    pub fn release(&mut self, actor: EntityId) -> Option<Coord> {
        let cell = self.by_actor.remove(&actor)?;
        self.by_cell.remove(&cell);
        Some(cell)
    }

    pub fn len(&self) -> usize {
        self.by_cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cell.is_empty()
    }
}
