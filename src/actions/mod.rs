//! Action/behavior engine
//!
//! An action is a small state machine that holds its own progress and is
//! advanced by `execute` once per tick while it is an actor's current action.
//! It reports `Running` until it reaches exactly one terminal outcome
//! (`Completed` or `Canceled`). No action ever blocks.
//!
//! Cancellation is cooperative: `cancel` only raises a flag. The next
//! `execute` sees the flag first, applies whatever compensation the action
//! needs, and returns `Canceled`.
//!
//! Composite behaviors (Eat, Forage, Hunt, Defend) do no work themselves. They
//! push primitive follow-ups into the context and complete at once; the
//! scheduler puts the follow-ups at the front of the actor's queue.

pub mod basic;
pub mod claims;
pub mod combat;
pub mod eat;
pub mod gather;
pub mod movement;

use std::fmt;

use ahash::AHashMap;
use rand_chacha::ChaCha8Rng;

use crate::catalog::Catalogs;
use crate::core::config::SimulationConfig;
use crate::core::types::{Coord, EntityId, Tick, VillageId};
use crate::entity::actor::Actor;
use crate::entity::policy::KindPolicy;
use crate::entity::village::Village;
use crate::spatial::sparse_hash::ActorIndex;
use crate::world::store::ChunkStore;

pub use basic::{Stun, Wait};
pub use claims::ClaimTable;
pub use combat::{Attack, Defend};
pub use eat::{Consume, Eat, Forage, Hunt};
pub use gather::{Collect, Harvest, Haul, Withdraw};
pub use movement::{Flee, MoveTo, Wander};

/// Result of one `execute` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Running,
    Completed,
    Canceled,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActionStatus::Running)
    }
}

/// Effects on other actors, applied by the scheduler after the acting actor's step
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Damage {
        target: EntityId,
        source: EntityId,
        amount: f32,
        /// Stun the target for this many ticks (0 = no stun)
        stun_ticks: u32,
    },
}

/// Cancellation flag shared by every cancelable action
#[derive(Debug, Clone, Copy, Default)]
pub struct CancelFlag(bool);

impl CancelFlag {
    pub fn request(&mut self) {
        self.0 = true;
    }

    pub fn is_set(&self) -> bool {
        self.0
    }
}

/// Everything an action may read or mutate during its step
pub struct ActionContext<'a> {
    pub tick: Tick,
    pub config: &'a SimulationConfig,
    pub catalogs: &'a Catalogs,
    pub store: &'a mut ChunkStore,
    pub claims: &'a mut ClaimTable,
    pub villages: &'a mut AHashMap<VillageId, Village>,
    /// Other live actors as of their last step
    pub others: &'a ActorIndex,
    pub rng: &'a mut ChaCha8Rng,
    follow_ups: Vec<Box<dyn Action>>,
    interactions: Vec<Interaction>,
}

impl<'a> ActionContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tick: Tick,
        config: &'a SimulationConfig,
        catalogs: &'a Catalogs,
        store: &'a mut ChunkStore,
        claims: &'a mut ClaimTable,
        villages: &'a mut AHashMap<VillageId, Village>,
        others: &'a ActorIndex,
        rng: &'a mut ChaCha8Rng,
    ) -> Self {
        Self {
            tick,
            config,
            catalogs,
            store,
            claims,
            villages,
            others,
            rng,
            follow_ups: Vec::new(),
            interactions: Vec::new(),
        }
    }

    pub fn policy(&self, actor: &Actor) -> &'a KindPolicy {
        self.config.policies.get(actor.kind)
    }

    pub fn half_window(&self) -> i32 {
        self.config.path_half_window()
    }

    /// Queue a follow-up; follow-ups keep the order they were pushed in
    pub fn push_follow_up(&mut self, action: Box<dyn Action>) {
        self.follow_ups.push(action);
    }

    pub fn emit(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub fn take_follow_ups(&mut self) -> Vec<Box<dyn Action>> {
        std::mem::take(&mut self.follow_ups)
    }

    pub fn take_interactions(&mut self) -> Vec<Interaction> {
        std::mem::take(&mut self.interactions)
    }
}

/// A stateful, multi-tick behavior
pub trait Action: Send + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Advance one step
    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus;

    /// Request cancellation; takes effect on the next `execute`
    fn cancel(&mut self);

    fn is_cancel_requested(&self) -> bool;

    fn is_cancelable(&self) -> bool {
        true
    }

    /// Cell this action has committed to, if any
    fn target(&self) -> Option<Coord> {
        None
    }

    /// True for responses to being attacked (Defend, Flee, and the Attack a Defend expands to)
    fn is_reaction(&self) -> bool {
        false
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A small grass world and context for driving actions in unit tests

    use std::sync::Arc;

    use ahash::AHashMap;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::catalog::terrain::GRASS;
    use crate::core::types::ChunkCoord;
    use crate::entity::actor::ActorKind;
    use crate::world::cell::WorldCell;
    use crate::world::chunk::Chunk;
    use crate::world::events::EventSink;
    use crate::world::store::store_for;

    pub struct Harness {
        pub config: SimulationConfig,
        pub catalogs: Arc<Catalogs>,
        pub store: ChunkStore,
        pub claims: ClaimTable,
        pub villages: AHashMap<VillageId, Village>,
        pub index: ActorIndex,
        pub rng: ChaCha8Rng,
        pub tick: Tick,
    }

    impl Harness {
        /// One 32x32 grass chunk at the origin
        pub fn new() -> Self {
            let config = SimulationConfig::default();
            let catalogs = Arc::new(Catalogs::builtin());
            let grass = WorldCell::from_descriptor(catalogs.terrain.get(GRASS).unwrap(), 0);
            let mut store = store_for(&config, catalogs.clone(), EventSink::disabled());
            store.insert_chunk(Chunk::filled(ChunkCoord::new(0, 0), config.chunk_size, grass));
            Self {
                config,
                catalogs,
                store,
                claims: ClaimTable::new(),
                villages: AHashMap::new(),
                index: ActorIndex::new(8),
                rng: ChaCha8Rng::seed_from_u64(7),
                tick: 0,
            }
        }

        pub fn actor(&mut self, kind: ActorKind, x: i32, y: i32) -> Actor {
            let actor = Actor::new(kind, Coord::new(x, y), self.config.policies.get(kind), 0);
            self.index.insert(crate::spatial::sparse_hash::summarize(
                &actor,
                self.config.policies.get(kind).predator,
            ));
            actor
        }

        pub fn set(&mut self, cell: Coord, terrain: crate::catalog::TerrainId) {
            let descriptor = self.catalogs.terrain.get(terrain).unwrap().clone();
            self.store.set_terrain(cell, &descriptor);
        }

        /// Run one step; returns the status with any follow-ups and interactions
        pub fn step(
            &mut self,
            action: &mut dyn Action,
            actor: &mut Actor,
        ) -> (ActionStatus, Vec<Box<dyn Action>>, Vec<Interaction>) {
            self.tick += 1;
            let mut ctx = ActionContext::new(
                self.tick,
                &self.config,
                &self.catalogs,
                &mut self.store,
                &mut self.claims,
                &mut self.villages,
                &self.index,
                &mut self.rng,
            );
            let status = action.execute(actor, &mut ctx);
            let follow_ups = ctx.take_follow_ups();
            let interactions = ctx.take_interactions();
            self.index.update(actor);
            (status, follow_ups, interactions)
        }

        /// Step until terminal or `limit` steps; returns the final status and steps taken
        pub fn run(&mut self, action: &mut dyn Action, actor: &mut Actor, limit: usize) -> (ActionStatus, usize) {
            for i in 1..=limit {
                let (status, _, _) = self.step(action, actor);
                if status.is_terminal() {
                    return (status, i);
                }
            }
            (ActionStatus::Running, limit)
        }
    }
}
