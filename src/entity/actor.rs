//! Simulation actors: animals and villagers

use serde::{Deserialize, Serialize};

use crate::core::types::{Coord, EntityId, Tick, VillageId};
use crate::entity::inventory::Inventory;
use crate::entity::policy::KindPolicy;
use crate::entity::queue::ActionQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActorKind {
    Rabbit,
    Deer,
    Wolf,
    Bear,
    Villager,
}

impl ActorKind {
    pub const ALL: [ActorKind; 5] = [
        ActorKind::Rabbit,
        ActorKind::Deer,
        ActorKind::Wolf,
        ActorKind::Bear,
        ActorKind::Villager,
    ];

    pub fn is_wildlife(&self) -> bool {
        !matches!(self, ActorKind::Villager)
    }
}

/// A positioned, health- and hunger-bearing agent
#[derive(Debug)]
pub struct Actor {
    pub id: EntityId,
    pub kind: ActorKind,
    pub position: Coord,
    pub health: f32,
    pub max_health: f32,
    /// Satiety: `max_hunger` is full, 0 is starving
    pub hunger: f32,
    pub max_hunger: f32,
    pub inventory: Inventory,
    pub queue: ActionQueue,
    pub home: Option<VillageId>,
    /// Set by incoming damage, consumed by the attack-response policy
    pub attacked_by: Option<EntityId>,
    pub born_tick: Tick,
    alive: bool,
}

impl Actor {
    pub fn new(kind: ActorKind, position: Coord, policy: &KindPolicy, tick: Tick) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            position,
            health: policy.max_health,
            max_health: policy.max_health,
            hunger: policy.max_hunger,
            max_hunger: policy.max_hunger,
            inventory: Inventory::new(),
            queue: ActionQueue::new(),
            home: None,
            attacked_by: None,
            born_tick: tick,
            alive: true,
        }
    }

    pub fn with_home(mut self, village: VillageId) -> Self {
        self.home = Some(village);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Units of food worth `worth` each needed to fill up completely
    pub fn units_to_satiate(&self, worth: u32) -> u32 {
        if worth == 0 {
            return 0;
        }
        let missing = (self.max_hunger - self.hunger).max(0.0);
        (missing / worth as f32).ceil() as u32
    }

    pub fn eat(&mut self, amount: f32) {
        self.hunger = (self.hunger + amount).min(self.max_hunger);
    }

    pub fn hunger_fraction(&self) -> f32 {
        if self.max_hunger <= 0.0 {
            return 1.0;
        }
        self.hunger / self.max_hunger
    }

    /// Apply damage; returns true if this blow was lethal
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if !self.alive {
            return false;
        }
        self.health -= amount;
        if self.health <= 0.0 {
            self.health = 0.0;
            self.die();
            return true;
        }
        false
    }

    /// Stop scheduling immediately
    ///
    /// The queue is dropped without cancelling anything: death is not a
    /// cancellation and no compensating logic runs.
    pub fn die(&mut self) {
        self.alive = false;
        self.queue.clear();
    }
}
