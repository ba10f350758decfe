//! Combat: the Attack primitive and the Defend composite

use crate::actions::movement::{walk, WalkOutcome};
use crate::actions::{Action, ActionContext, ActionStatus, CancelFlag, Interaction};
use crate::core::types::{manhattan, EntityId};
use crate::entity::actor::Actor;
use crate::spatial::pathfinding::{PathGoal, Route};

/// Chase a target and hit it every `attack_interval` ticks while adjacent
///
/// Ends when the target is dead or gone, slips beyond `leash_distance`, or
/// cannot be reached. Damage is emitted as an interaction; the scheduler
/// applies it after this actor's step.
#[derive(Debug)]
pub struct Attack {
    target: EntityId,
    cooldown: u32,
    route: Option<Route>,
    reaction: bool,
    canceled: CancelFlag,
}

impl Attack {
    pub fn new(target: EntityId) -> Self {
        Self {
            target,
            cooldown: 0,
            route: None,
            reaction: false,
            canceled: CancelFlag::default(),
        }
    }

    /// An attack launched in self-defence
    pub fn reaction(target: EntityId) -> Self {
        Self {
            reaction: true,
            ..Self::new(target)
        }
    }

    pub fn target_id(&self) -> EntityId {
        self.target
    }
}

impl Action for Attack {
    fn name(&self) -> &'static str {
        "attack"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        let Some(target) = ctx.others.get(self.target).copied().filter(|t| t.alive) else {
            return ActionStatus::Completed;
        };
        let distance = manhattan(actor.position, target.position);
        if distance > ctx.config.leash_distance {
            return ActionStatus::Completed;
        }

        if distance <= 1 {
            self.route = None;
            if self.cooldown == 0 {
                let policy = ctx.policy(actor);
                ctx.emit(Interaction::Damage {
                    target: target.id,
                    source: actor.id,
                    amount: policy.attack_damage,
                    stun_ticks: policy.stun_ticks,
                });
                self.cooldown = policy.attack_interval.max(1);
            }
            self.cooldown -= 1;
            return ActionStatus::Running;
        }

        self.cooldown = self.cooldown.saturating_sub(1);
        let stale = self
            .route
            .as_ref()
            .map_or(true, |r| r.goal() != PathGoal::Adjacent(target.position));
        if stale {
            match Route::plan(&*ctx.store, actor.position, PathGoal::Adjacent(target.position), ctx.half_window()) {
                Some(route) => self.route = Some(route),
                None => return ActionStatus::Completed,
            }
        }
        let Some(route) = self.route.as_mut() else {
            return ActionStatus::Completed;
        };
        match walk(route, actor, ctx) {
            WalkOutcome::Moving | WalkOutcome::Arrived => ActionStatus::Running,
            WalkOutcome::Unreachable => ActionStatus::Completed,
        }
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }

    fn is_reaction(&self) -> bool {
        self.reaction
    }
}

/// Composite: turn on the attacker
#[derive(Debug)]
pub struct Defend {
    attacker: EntityId,
    canceled: CancelFlag,
}

impl Defend {
    pub fn against(attacker: EntityId) -> Self {
        Self {
            attacker,
            canceled: CancelFlag::default(),
        }
    }
}

impl Action for Defend {
    fn name(&self) -> &'static str {
        "defend"
    }

    fn execute(&mut self, _actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        ctx.push_follow_up(Box::new(Attack::reaction(self.attacker)));
        ActionStatus::Completed
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }

    fn is_reaction(&self) -> bool {
        true
    }
}
