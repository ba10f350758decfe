//! Chunk-local entity generation: wildlife and villages
//!
//! Pure functions of (seed, chunk, epoch) and the chunk's walkable cells, so
//! they can run on a background task without touching the live world.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{ChunkCoord, Coord, Tick};
use crate::entity::actor::{Actor, ActorKind};
use crate::entity::policy::PolicyTable;
use crate::entity::registry::SpawnBatch;
use crate::entity::village::Village;
use crate::world::generation::{chunk_seed, ENTITY_SALT, REGROWTH_SALT};

/// Wildlife kinds split by the predator flag of their policy
fn wildlife_kinds(policies: &PolicyTable) -> (Vec<ActorKind>, Vec<ActorKind>) {
    ActorKind::ALL
        .iter()
        .copied()
        .filter(|k| k.is_wildlife())
        .partition(|k| policies.get(*k).predator)
}

fn spawn_animals(
    batch: &mut SpawnBatch,
    rng: &mut ChaCha8Rng,
    cells: &[Coord],
    kinds: &[ActorKind],
    count: u32,
    policies: &PolicyTable,
    tick: Tick,
) {
    if kinds.is_empty() || cells.is_empty() {
        return;
    }
    for _ in 0..count {
        let (Some(kind), Some(cell)) = (kinds.choose(rng), cells.choose(rng)) else {
            return;
        };
        batch.actors.push(Actor::new(*kind, *cell, policies.get(*kind), tick));
    }
}

/// Generate the initial population of a freshly loaded chunk
///
/// `epoch` counts how many times this chunk's entities have been generated, so
/// a chunk that is evicted and reloaded gets a fresh but reproducible roll.
pub fn populate_chunk(
    coord: ChunkCoord,
    spawnable: &[Coord],
    config: &SimulationConfig,
    epoch: u64,
    tick: Tick,
) -> SpawnBatch {
    let mut batch = SpawnBatch::new(coord);
    if spawnable.is_empty() {
        return batch;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(chunk_seed(config.seed, coord, ENTITY_SALT ^ epoch));
    let (predators, prey) = wildlife_kinds(&config.policies);

    for _ in 0..config.wildlife_per_chunk {
        let is_predator = rng.gen::<f32>() < config.predator_chance;
        let kinds = if is_predator { &predators } else { &prey };
        spawn_animals(&mut batch, &mut rng, spawnable, kinds, 1, &config.policies, tick);
    }

    if rng.gen::<f32>() < config.village_chance {
        if let Some(village) = build_village(&mut rng, spawnable, config, &mut batch, tick) {
            batch.villages.push(village);
        }
    }

    batch
}

/// Lay out one village: a center, some house cells, and its residents
fn build_village(
    rng: &mut ChaCha8Rng,
    spawnable: &[Coord],
    config: &SimulationConfig,
    batch: &mut SpawnBatch,
    tick: Tick,
) -> Option<Village> {
    let center = *spawnable.choose(rng)?;
    let mut village = Village::new(center, config.village_radius);

    let mut nearby: Vec<Coord> = spawnable
        .iter()
        .copied()
        .filter(|c| *c != center && village.contains(*c))
        .collect();
    nearby.shuffle(rng);

    let house_count = (config.houses_per_village as usize).min(nearby.len() / 2);
    let (houses, free) = nearby.split_at(house_count);
    village.houses.extend(houses.iter().copied());

    let homes: Vec<Coord> = if free.is_empty() { vec![center] } else { free.to_vec() };
    let policy = config.policies.get(ActorKind::Villager);
    for i in 0..config.villagers_per_village as usize {
        let cell = homes[i % homes.len()];
        let villager = Actor::new(ActorKind::Villager, cell, policy, tick).with_home(village.id);
        village.add_resident(villager.id);
        batch.actors.push(villager);
    }

    tracing::debug!(
        position = ?center,
        houses = village.houses.len(),
        residents = village.residents.len(),
        "village generated"
    );
    Some(village)
}

/// Spawn replacement wildlife for a depleted chunk
pub fn regrow_wildlife(
    coord: ChunkCoord,
    spawnable: &[Coord],
    predators: u32,
    prey: u32,
    config: &SimulationConfig,
    epoch: u64,
    tick: Tick,
) -> SpawnBatch {
    let mut batch = SpawnBatch::new(coord);
    let mut rng = ChaCha8Rng::seed_from_u64(chunk_seed(config.seed, coord, REGROWTH_SALT ^ epoch));
    let (predator_kinds, prey_kinds) = wildlife_kinds(&config.policies);
    spawn_animals(&mut batch, &mut rng, spawnable, &predator_kinds, predators, &config.policies, tick);
    spawn_animals(&mut batch, &mut rng, spawnable, &prey_kinds, prey, &config.policies, tick);
    batch
}

/// Grass cells to turn into `missing` units of a resource, picked reproducibly
pub fn pick_regrowth_cells(
    coord: ChunkCoord,
    candidates: &[Coord],
    missing: u32,
    config: &SimulationConfig,
    epoch: u64,
) -> Vec<Coord> {
    let mut rng = ChaCha8Rng::seed_from_u64(chunk_seed(config.seed, coord, REGROWTH_SALT ^ epoch.rotate_left(17)));
    let mut picked: Vec<Coord> = candidates
        .choose_multiple(&mut rng, missing as usize)
        .copied()
        .collect();
    picked.sort_by_key(|c| (c.y, c.x));
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(n: i32) -> Vec<Coord> {
        (0..n).flat_map(|y| (0..n).map(move |x| Coord::new(x, y))).collect()
    }

    #[test]
    fn test_populate_is_reproducible() {
        let config = SimulationConfig::default();
        let spawnable = cells(16);
        let a = populate_chunk(ChunkCoord::new(3, 4), &spawnable, &config, 0, 0);
        let b = populate_chunk(ChunkCoord::new(3, 4), &spawnable, &config, 0, 0);
        let kinds_a: Vec<_> = a.actors.iter().map(|x| (x.kind, x.position)).collect();
        let kinds_b: Vec<_> = b.actors.iter().map(|x| (x.kind, x.position)).collect();
        assert_eq!(kinds_a, kinds_b);
        assert_eq!(a.villages.len(), b.villages.len());
    }

    #[test]
    fn test_populate_spawns_configured_wildlife() {
        let config = SimulationConfig {
            village_chance: 0.0,
            ..SimulationConfig::default()
        };
        let batch = populate_chunk(ChunkCoord::new(0, 0), &cells(8), &config, 0, 0);
        assert_eq!(batch.actors.len(), config.wildlife_per_chunk as usize);
        assert!(batch.actors.iter().all(|a| a.kind.is_wildlife()));
        assert!(batch.villages.is_empty());
    }

    #[test]
    fn test_village_residents_avoid_houses() {
        let config = SimulationConfig {
            village_chance: 1.0,
            wildlife_per_chunk: 0,
            ..SimulationConfig::default()
        };
        let batch = populate_chunk(ChunkCoord::new(0, 0), &cells(16), &config, 0, 0);
        assert_eq!(batch.villages.len(), 1);
        let village = &batch.villages[0];
        assert_eq!(village.houses.len(), config.houses_per_village as usize);
        assert_eq!(village.residents.len(), config.villagers_per_village as usize);
        for actor in &batch.actors {
            assert_eq!(actor.kind, ActorKind::Villager);
            assert_eq!(actor.home, Some(village.id));
            assert!(!village.houses.contains(&actor.position));
        }
    }

    #[test]
    fn test_no_walkable_cells_spawns_nothing() {
        let config = SimulationConfig {
            village_chance: 1.0,
            ..SimulationConfig::default()
        };
        assert!(populate_chunk(ChunkCoord::new(0, 0), &[], &config, 0, 0).is_empty());
    }

    #[test]
    fn test_regrow_wildlife_counts() {
        let config = SimulationConfig::default();
        let batch = regrow_wildlife(ChunkCoord::new(1, 1), &cells(8), 2, 3, &config, 0, 10);
        let predators = batch
            .actors
            .iter()
            .filter(|a| config.policies.get(a.kind).predator)
            .count();
        assert_eq!(predators, 2);
        assert_eq!(batch.actors.len(), 5);
        assert!(batch.actors.iter().all(|a| a.born_tick == 10));
    }

    #[test]
    fn test_pick_regrowth_cells_clamps_to_candidates() {
        let config = SimulationConfig::default();
        let picked = pick_regrowth_cells(ChunkCoord::new(0, 0), &cells(2), 10, &config, 0);
        assert_eq!(picked.len(), 4);
    }
}
