//! Movement primitives: MoveTo, Wander, Flee

use rand::Rng;

use crate::actions::{Action, ActionContext, ActionStatus, CancelFlag};
use crate::core::types::{manhattan, neighbors4, Coord, EntityId};
use crate::entity::actor::Actor;
use crate::entity::policy::WanderStrategy;
use crate::spatial::pathfinding::{PathGoal, Route, StepOutcome};

/// Outcome of walking one tick along a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WalkOutcome {
    Moving,
    Arrived,
    Unreachable,
}

/// Take one step along `route`
///
/// A blocked step keeps the plan. Once the route has been blocked for
/// `max_blocked_ticks` in a row it is planned again from the current cell; if
/// that fails the destination is treated as unreachable.
pub(crate) fn walk(route: &mut Route, actor: &mut Actor, ctx: &ActionContext<'_>) -> WalkOutcome {
    match route.advance(&*ctx.store, &mut actor.position) {
        StepOutcome::Arrived => WalkOutcome::Arrived,
        StepOutcome::Moved if route.is_empty() => WalkOutcome::Arrived,
        StepOutcome::Moved => WalkOutcome::Moving,
        StepOutcome::Blocked if route.blocked_ticks() < ctx.config.max_blocked_ticks => WalkOutcome::Moving,
        StepOutcome::Blocked => {
            if !route.replan(&*ctx.store, actor.position, ctx.half_window()) {
                WalkOutcome::Unreachable
            } else if route.is_empty() {
                WalkOutcome::Arrived
            } else {
                WalkOutcome::Moving
            }
        }
    }
}

/// Walk to a cell
#[derive(Debug)]
pub struct MoveTo {
    dest: Coord,
    route: Option<Route>,
    canceled: CancelFlag,
}

impl MoveTo {
    pub fn new(dest: Coord) -> Self {
        Self {
            dest,
            route: None,
            canceled: CancelFlag::default(),
        }
    }
}

impl Action for MoveTo {
    fn name(&self) -> &'static str {
        "move_to"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        if self.route.is_none() {
            match Route::plan(&*ctx.store, actor.position, PathGoal::Exact(self.dest), ctx.half_window()) {
                Some(route) => self.route = Some(route),
                None => return ActionStatus::Completed,
            }
        }
        let Some(route) = self.route.as_mut() else {
            return ActionStatus::Completed;
        };
        match walk(route, actor, ctx) {
            WalkOutcome::Moving => ActionStatus::Running,
            WalkOutcome::Arrived | WalkOutcome::Unreachable => ActionStatus::Completed,
        }
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }

    fn target(&self) -> Option<Coord> {
        Some(self.dest)
    }
}

/// Stroll to a random nearby cell
///
/// The destination is picked around an anchor chosen by the actor's wander
/// strategy. Destinations whose path is longer than `max_wander_steps` are
/// abandoned at once.
#[derive(Debug, Default)]
pub struct Wander {
    dest: Option<Coord>,
    route: Option<Route>,
    canceled: CancelFlag,
}

const WANDER_ATTEMPTS: usize = 8;

impl Wander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wander toward a fixed destination
    pub fn toward(dest: Coord) -> Self {
        Self {
            dest: Some(dest),
            ..Self::default()
        }
    }

    fn pick_destination(actor: &Actor, ctx: &mut ActionContext<'_>) -> Option<Coord> {
        let policy = ctx.policy(actor);
        let home = match policy.wander {
            WanderStrategy::StayNearHome => actor
                .home
                .and_then(|id| ctx.villages.get(&id))
                .map(|v| (v.position, v.radius)),
            WanderStrategy::Roam => None,
        };
        let (anchor, radius) = home.unwrap_or((actor.position, ctx.config.wander_radius));
        let radius = radius.max(1);

        for _ in 0..WANDER_ATTEMPTS {
            let cell = anchor
                + Coord::new(
                    ctx.rng.gen_range(-radius..=radius),
                    ctx.rng.gen_range(-radius..=radius),
                );
            if cell != actor.position && ctx.store.is_walkable(cell) {
                return Some(cell);
            }
        }
        None
    }
}

impl Action for Wander {
    fn name(&self) -> &'static str {
        "wander"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        if self.route.is_none() {
            let dest = match self.dest {
                Some(dest) => dest,
                None => match Self::pick_destination(actor, ctx) {
                    Some(dest) => dest,
                    None => return ActionStatus::Completed,
                },
            };
            self.dest = Some(dest);
            let Some(route) = Route::plan(&*ctx.store, actor.position, PathGoal::Exact(dest), ctx.half_window())
            else {
                return ActionStatus::Completed;
            };
            if route.len() > ctx.config.max_wander_steps {
                tracing::trace!(id = ?actor.id, steps = route.len(), "wander destination too far");
                return ActionStatus::Completed;
            }
            self.route = Some(route);
        }
        let Some(route) = self.route.as_mut() else {
            return ActionStatus::Completed;
        };
        match walk(route, actor, ctx) {
            WalkOutcome::Moving => ActionStatus::Running,
            WalkOutcome::Arrived | WalkOutcome::Unreachable => ActionStatus::Completed,
        }
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }

    fn target(&self) -> Option<Coord> {
        self.dest
    }
}

/// Run away from a threat, one cell per tick
///
/// Ends once `flee_distance` separates the two, when the budget of steps runs
/// out, when no step increases the distance, or when the threat is gone.
#[derive(Debug)]
pub struct Flee {
    threat: EntityId,
    steps_left: Option<i32>,
    canceled: CancelFlag,
}

impl Flee {
    pub fn from(threat: EntityId) -> Self {
        Self {
            threat,
            steps_left: None,
            canceled: CancelFlag::default(),
        }
    }
}

impl Action for Flee {
    fn name(&self) -> &'static str {
        "flee"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        let Some(threat) = ctx.others.get(self.threat).filter(|t| t.alive) else {
            return ActionStatus::Completed;
        };
        let steps_left = self.steps_left.get_or_insert(ctx.config.flee_distance * 2);
        if *steps_left <= 0 {
            return ActionStatus::Completed;
        }

        let here = manhattan(actor.position, threat.position);
        if here >= ctx.config.flee_distance {
            return ActionStatus::Completed;
        }
        let best = neighbors4(actor.position)
            .into_iter()
            .filter(|c| ctx.store.is_walkable(*c))
            .max_by_key(|c| (manhattan(*c, threat.position), -c.y, -c.x));
        match best {
            Some(next) if manhattan(next, threat.position) > here => {
                actor.position = next;
                *steps_left -= 1;
                if manhattan(next, threat.position) >= ctx.config.flee_distance {
                    ActionStatus::Completed
                } else {
                    ActionStatus::Running
                }
            }
            _ => ActionStatus::Completed,
        }
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
