//! Per-kind behavior policies
//!
//! Actor kinds differ only in data: each kind maps to one `KindPolicy` row in a
//! `PolicyTable` that is injected through the config.

use serde::Deserialize;

use crate::entity::actor::ActorKind;

/// What an actor does when something hits it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackResponse {
    /// Turn and fight the attacker
    Defend,
    /// Run away from the attacker
    Flee,
}

/// Where idle wandering is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WanderStrategy {
    /// Anywhere around the current position
    Roam,
    /// Inside the home village radius (falls back to Roam when homeless)
    StayNearHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diet {
    Herbivore,
    Carnivore,
    Omnivore,
}

impl Diet {
    pub fn eats_plants(&self) -> bool {
        matches!(self, Diet::Herbivore | Diet::Omnivore)
    }

    pub fn hunts(&self) -> bool {
        matches!(self, Diet::Carnivore)
    }
}

/// Behavior and stats of one actor kind
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KindPolicy {
    pub attack_response: AttackResponse,
    pub wander: WanderStrategy,
    pub diet: Diet,
    /// Counts toward the predator share of a chunk's wildlife
    pub predator: bool,
    pub max_health: f32,
    pub max_hunger: f32,
    /// Hunger lost per tick
    pub hunger_rate: f32,
    /// Health lost per tick while hunger is at zero
    pub starvation_damage: f32,
    pub attack_damage: f32,
    /// Ticks between two hits
    pub attack_interval: u32,
    /// Ticks a hit from this kind stuns its target (0 = never)
    pub stun_ticks: u32,
    /// Meat left on the ground when this kind dies
    pub carcass_meat: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PolicyTable {
    pub rabbit: KindPolicy,
    pub deer: KindPolicy,
    pub wolf: KindPolicy,
    pub bear: KindPolicy,
    pub villager: KindPolicy,
}

impl PolicyTable {
    pub fn get(&self, kind: ActorKind) -> &KindPolicy {
        match kind {
            ActorKind::Rabbit => &self.rabbit,
            ActorKind::Deer => &self.deer,
            ActorKind::Wolf => &self.wolf,
            ActorKind::Bear => &self.bear,
            ActorKind::Villager => &self.villager,
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        let prey = |max_health: f32, carcass_meat: u32| KindPolicy {
            attack_response: AttackResponse::Flee,
            wander: WanderStrategy::Roam,
            diet: Diet::Herbivore,
            predator: false,
            max_health,
            max_hunger: 100.0,
            hunger_rate: 0.05,
            starvation_damage: 0.5,
            attack_damage: 1.0,
            attack_interval: 4,
            stun_ticks: 0,
            carcass_meat,
        };

        Self {
            rabbit: prey(10.0, 1),
            deer: prey(30.0, 4),
            wolf: KindPolicy {
                attack_response: AttackResponse::Defend,
                wander: WanderStrategy::Roam,
                diet: Diet::Carnivore,
                predator: true,
                max_health: 40.0,
                max_hunger: 100.0,
                hunger_rate: 0.08,
                starvation_damage: 0.5,
                attack_damage: 6.0,
                attack_interval: 2,
                stun_ticks: 0,
                carcass_meat: 2,
            },
            bear: KindPolicy {
                attack_response: AttackResponse::Defend,
                wander: WanderStrategy::Roam,
                diet: Diet::Carnivore,
                predator: true,
                max_health: 90.0,
                max_hunger: 100.0,
                hunger_rate: 0.06,
                starvation_damage: 0.5,
                attack_damage: 12.0,
                attack_interval: 3,
                stun_ticks: 2,
                carcass_meat: 6,
            },
            villager: KindPolicy {
                attack_response: AttackResponse::Defend,
                wander: WanderStrategy::StayNearHome,
                diet: Diet::Omnivore,
                predator: false,
                max_health: 50.0,
                max_hunger: 100.0,
                hunger_rate: 0.04,
                starvation_damage: 0.5,
                attack_damage: 5.0,
                attack_interval: 2,
                stun_ticks: 0,
                carcass_meat: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prey_flees_predators_defend() {
        let table = PolicyTable::default();
        assert_eq!(table.get(ActorKind::Rabbit).attack_response, AttackResponse::Flee);
        assert_eq!(table.get(ActorKind::Deer).attack_response, AttackResponse::Flee);
        assert_eq!(table.get(ActorKind::Wolf).attack_response, AttackResponse::Defend);
        assert!(table.get(ActorKind::Bear).predator);
        assert!(!table.get(ActorKind::Villager).predator);
    }

    #[test]
    fn test_only_bears_stun() {
        let table = PolicyTable::default();
        for kind in ActorKind::ALL {
            let stuns = table.get(kind).stun_ticks > 0;
            assert_eq!(stuns, kind == ActorKind::Bear, "{:?}", kind);
        }
    }
}
