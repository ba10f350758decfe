//! Tick system - orchestrates simulation updates
//!
//! One call to `run_simulation_tick` is one global tick:
//! staged spawns/despawns -> regrowth results -> one step per actor ->
//! interactions -> clock -> regrowth census.

use ahash::AHashMap;

use crate::actions::{ActionContext, ActionStatus, Interaction, Stun};
use crate::catalog::items::MEAT;
use crate::core::error::Result;
use crate::core::types::{Coord, EntityId, Tick};
use crate::entity::actor::ActorKind;
use crate::simulation::regrowth::{take_census, RegrowthRequest, Regrower};
use crate::simulation::scheduler::step_actor;
use crate::simulation::state::Simulation;

/// Events generated during a simulation tick
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    /// An actor's action became current and ran for the first time
    ActionStarted {
        id: EntityId,
        action: &'static str,
        tick: Tick,
    },
    /// An action reached a terminal status
    ActionFinished {
        id: EntityId,
        action: &'static str,
        status: ActionStatus,
        tick: Tick,
    },
    /// Combat: attacker hit defender
    Hit {
        attacker: EntityId,
        defender: EntityId,
        amount: f32,
    },
    Died {
        id: EntityId,
        kind: ActorKind,
        position: Coord,
        cause: DeathCause,
    },
    Spawned {
        id: EntityId,
        kind: ActorKind,
        position: Coord,
    },
    Despawned {
        id: EntityId,
    },
    /// A regrowth request was applied to the world
    RegrowthApplied(RegrowthRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Starvation,
    Killed,
}

/// Run a single simulation tick
///
/// 1. Splice staged registry changes into the live set (spawns from loaded
///    chunks, despawns from unloaded ones, the dead from last tick)
/// 2. Apply regrowth requests produced by the last background scan
/// 3. Step every live actor once, in live-set order, applying the
///    interactions each step emits before the next actor moves
/// 4. Advance the clock
/// 5. Launch a regrowth scan when its interval has elapsed
///
/// Returns the events that occurred during this tick.
pub fn run_simulation_tick(sim: &mut Simulation) -> Result<Vec<SimulationEvent>> {
    let mut events = Vec::new();

    sim.apply_staged(&mut events);
    apply_regrowth(sim, &mut events)?;
    step_actors(sim, &mut events);

    sim.clock.advance();
    let dt = sim.clock.seconds_per_tick();
    if sim.regrowth.due(dt) {
        let settled = sim.settled_populations();
        let census = take_census(&sim.store, &sim.registry.snapshot(), &settled);
        sim.regrowth.launch(census);
    }

    Ok(events)
}

fn apply_regrowth(sim: &mut Simulation, events: &mut Vec<SimulationEvent>) -> Result<()> {
    for request in sim.regrowth.drain() {
        sim.apply(&request)?;
        events.push(SimulationEvent::RegrowthApplied(request));
    }
    Ok(())
}

fn step_actors(sim: &mut Simulation, events: &mut Vec<SimulationEvent>) {
    let tick = sim.clock.current_tick();
    let slots: AHashMap<EntityId, usize> = sim
        .actors
        .iter()
        .enumerate()
        .map(|(slot, actor)| (actor.id, slot))
        .collect();

    for slot in 0..sim.actors.len() {
        if !sim.actors[slot].is_alive() {
            continue;
        }
        let interactions = {
            let actor = &mut sim.actors[slot];
            let mut ctx = ActionContext::new(
                tick,
                &sim.config,
                &sim.catalogs,
                &mut sim.store,
                &mut sim.claims,
                &mut sim.villages,
                &sim.index,
                &mut sim.rng,
            );
            step_actor(actor, &mut ctx, events);
            ctx.take_interactions()
        };
        sim.index.update(&sim.actors[slot]);

        if !sim.actors[slot].is_alive() {
            handle_death(sim, slot, DeathCause::Starvation, events);
        }
        for interaction in interactions {
            apply_interaction(sim, &slots, interaction, events);
        }
    }
}

fn apply_interaction(
    sim: &mut Simulation,
    slots: &AHashMap<EntityId, usize>,
    interaction: Interaction,
    events: &mut Vec<SimulationEvent>,
) {
    match interaction {
        Interaction::Damage {
            target,
            source,
            amount,
            stun_ticks,
        } => {
            let Some(&slot) = slots.get(&target) else {
                return;
            };
            let defender = &mut sim.actors[slot];
            if !defender.is_alive() {
                return;
            }
            let lethal = defender.apply_damage(amount);
            events.push(SimulationEvent::Hit {
                attacker: source,
                defender: target,
                amount,
            });
            if lethal {
                handle_death(sim, slot, DeathCause::Killed, events);
                return;
            }
            defender.attacked_by = Some(source);
            if stun_ticks > 0 {
                defender.queue.preempt(Box::new(Stun::new(stun_ticks)));
            }
        }
    }
}

/// Release what the dead actor held and leave its carcass
///
/// The actor itself stays in the live set, marked dead, until the next
/// tick's sweep removes it.
fn handle_death(sim: &mut Simulation, slot: usize, cause: DeathCause, events: &mut Vec<SimulationEvent>) {
    let actor = &mut sim.actors[slot];
    sim.claims.release(actor.id);
    sim.index.update(actor);

    let mut remains = actor.inventory.take_all();
    let carcass = sim.config.policies.get(actor.kind).carcass_meat;
    if carcass > 0 {
        remains.add(MEAT, carcass);
    }
    if !remains.is_empty() {
        sim.store.drop_items(actor.position, remains);
    }

    tracing::debug!(id = ?actor.id, kind = ?actor.kind, ?cause, "actor died");
    events.push(SimulationEvent::Died {
        id: actor.id,
        kind: actor.kind,
        position: actor.position,
        cause,
    });
}
