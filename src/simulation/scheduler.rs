//! Per-actor scheduling
//!
//! Every tick each live actor gets exactly one `step_actor` call:
//! hunger decay -> attack response -> idle policy -> one `execute` of the
//! current action -> follow-up dispatch and claim release.

use rand::Rng;

use crate::actions::{Action, ActionContext, Defend, Eat, Flee, Harvest, Haul, Wander};
use crate::catalog::{Catalogs, TerrainId};
use crate::entity::actor::{Actor, ActorKind};
use crate::entity::policy::{AttackResponse, KindPolicy};
use crate::simulation::tick::SimulationEvent;

/// Advance one actor by one tick
///
/// Returns without doing anything for a dead actor. An actor that starves to
/// death during this step is left dead with an empty queue; the caller handles
/// the remains.
pub fn step_actor(actor: &mut Actor, ctx: &mut ActionContext<'_>, events: &mut Vec<SimulationEvent>) {
    if !actor.is_alive() {
        return;
    }
    let policy = ctx.policy(actor);

    actor.hunger = (actor.hunger - policy.hunger_rate).max(0.0);
    if actor.hunger <= 0.0 && actor.apply_damage(policy.starvation_damage) {
        ctx.claims.release(actor.id);
        return;
    }

    respond_to_attack(actor, policy);

    if actor.queue.is_idle() {
        for action in choose_idle(actor, ctx) {
            actor.queue.push(action);
        }
    }

    let fresh = actor.queue.current().is_none();
    if !actor.queue.start_next() {
        return;
    }
    let Some(mut action) = actor.queue.take_current() else {
        return;
    };
    if fresh {
        events.push(SimulationEvent::ActionStarted {
            id: actor.id,
            action: action.name(),
            tick: ctx.tick,
        });
    }

    let status = action.execute(actor, ctx);

    let follow_ups = ctx.take_follow_ups();
    if !follow_ups.is_empty() {
        actor.queue.push_front_all(follow_ups);
    }

    if status.is_terminal() {
        ctx.claims.release(actor.id);
        events.push(SimulationEvent::ActionFinished {
            id: actor.id,
            action: action.name(),
            status,
            tick: ctx.tick,
        });
    } else {
        actor.queue.restore_current(action);
    }
}

/// Preempt with the kind's attack response unless already reacting
fn respond_to_attack(actor: &mut Actor, policy: &KindPolicy) {
    if actor.attacked_by.is_none() {
        return;
    }
    // A stun runs out before the actor can react
    let stunned = actor.queue.current().map_or(false, |a| !a.is_cancelable())
        || actor.queue.front().map_or(false, |a| !a.is_cancelable());
    if stunned {
        return;
    }
    let Some(attacker) = actor.attacked_by.take() else {
        return;
    };
    let reacting = actor.queue.current().map_or(false, |a| a.is_reaction())
        || actor.queue.front().map_or(false, |a| a.is_reaction());
    if reacting {
        return;
    }
    let response: Box<dyn Action> = match policy.attack_response {
        AttackResponse::Defend => Box::new(Defend::against(attacker)),
        AttackResponse::Flee => Box::new(Flee::from(attacker)),
    };
    tracing::trace!(id = ?actor.id, ?attacker, response = response.name(), "attacked");
    actor.queue.preempt(response);
}

/// What an actor with nothing to do decides to do
fn choose_idle(actor: &Actor, ctx: &mut ActionContext<'_>) -> Vec<Box<dyn Action>> {
    if actor.hunger_fraction() < ctx.config.hunger_threshold {
        // Wander afterwards so a fruitless search does not repeat every tick
        return vec![Box::new(Eat::new()), Box::new(Wander::new())];
    }

    if actor.kind == ActorKind::Villager {
        if let Some(home) = actor.home.filter(|id| ctx.villages.contains_key(id)) {
            if !actor.inventory.is_empty() {
                return vec![Box::new(Haul::to(home))];
            }
        }
        if ctx.rng.gen::<f32>() < ctx.config.work_chance {
            return vec![Box::new(Harvest::new(work_targets(ctx.catalogs)))];
        }
    }

    vec![Box::new(Wander::new())]
}

/// Every harvestable terrain, in id order
fn work_targets(catalogs: &Catalogs) -> Vec<TerrainId> {
    let mut ids: Vec<TerrainId> = catalogs
        .terrain
        .iter()
        .filter(|d| d.is_resource)
        .map(|d| d.id)
        .collect();
    ids.sort();
    ids
}
