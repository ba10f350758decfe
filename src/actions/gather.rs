//! Gathering and logistics: Harvest, Collect, Haul, Withdraw

use crate::actions::movement::{walk, WalkOutcome};
use crate::actions::{Action, ActionContext, ActionStatus, CancelFlag};
use crate::catalog::{ItemId, Rgb, TerrainId};
use crate::core::types::{Coord, VillageId};
use crate::entity::actor::Actor;
use crate::entity::inventory::Inventory;
use crate::spatial::pathfinding::{PathGoal, Route};

/// Candidate targets tried per search before giving up
const MAX_CANDIDATES: usize = 8;

#[derive(Debug)]
enum HarvestState {
    Searching,
    Approaching { cell: Coord, route: Route },
    Working { cell: Coord, remaining: u32, original: Rgb },
}

/// Harvest the nearest unclaimed resource cell of a wanted terrain
///
/// The cell is claimed before the actor commits to it, so two harvesters never
/// work the same cell; a late arrival moves on to the next-closest one. When
/// the work is done the cell becomes its replacement terrain and the drops go
/// into the actor's inventory.
#[derive(Debug)]
pub struct Harvest {
    wanted: Vec<TerrainId>,
    state: HarvestState,
    canceled: CancelFlag,
}

impl Harvest {
    pub fn new(wanted: Vec<TerrainId>) -> Self {
        Self {
            wanted,
            state: HarvestState::Searching,
            canceled: CancelFlag::default(),
        }
    }

    fn still_wanted(wanted: &[TerrainId], cell: Coord, ctx: &ActionContext<'_>) -> bool {
        ctx.store.terrain_at(cell).map_or(false, |t| wanted.contains(&t))
    }

    /// Claim the closest reachable cell nobody else holds
    fn find_target(&self, actor: &Actor, ctx: &mut ActionContext<'_>) -> Option<(Coord, Route)> {
        let candidates: Vec<Coord> = ctx
            .store
            .find_terrain_near(actor.position, ctx.config.resource_search_radius, &self.wanted)
            .into_iter()
            .filter(|c| !ctx.claims.is_claimed_by_other(*c, actor.id))
            .take(MAX_CANDIDATES)
            .collect();
        for cell in candidates {
            let Some(route) = Route::plan(&*ctx.store, actor.position, PathGoal::Adjacent(cell), ctx.half_window())
            else {
                continue;
            };
            if ctx.claims.try_claim(actor.id, cell) {
                return Some((cell, route));
            }
        }
        None
    }

    fn start_work(cell: Coord, ctx: &mut ActionContext<'_>) -> HarvestState {
        let remaining = ctx
            .store
            .terrain_at(cell)
            .and_then(|t| ctx.catalogs.terrain.get(t).ok())
            .map_or(1, |d| d.harvest_ticks.max(1));
        let original = ctx.store.cell(cell).map_or(Rgb(0, 0, 0), |c| c.color);
        ctx.store.set_color(cell, dim(original));
        HarvestState::Working { cell, remaining, original }
    }

    /// Turn the cell into its replacement and collect the drops
    fn finish(cell: Coord, actor: &mut Actor, ctx: &mut ActionContext<'_>) {
        let catalogs = ctx.catalogs;
        let Some(descriptor) = ctx.store.terrain_at(cell).and_then(|t| catalogs.terrain.get(t).ok()) else {
            return;
        };
        for (item, amount) in &descriptor.drops {
            actor.inventory.add(*item, *amount);
        }
        if let Some(next) = descriptor.replaced_by.and_then(|t| catalogs.terrain.get(t).ok()) {
            ctx.store.set_terrain(cell, next);
        }
        tracing::trace!(id = ?actor.id, ?cell, terrain = %descriptor.name, "harvested");
    }
}

/// Visual cue for a cell being worked
fn dim(color: Rgb) -> Rgb {
    Rgb(color.0 / 2, color.1 / 2, color.2 / 2)
}

impl Action for Harvest {
    fn name(&self) -> &'static str {
        "harvest"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            if let HarvestState::Working { cell, original, .. } = self.state {
                ctx.store.set_color(cell, original);
            }
            return ActionStatus::Canceled;
        }

        match &mut self.state {
            HarvestState::Searching => match self.find_target(actor, ctx) {
                Some((cell, route)) if route.is_empty() => {
                    self.state = Self::start_work(cell, ctx);
                    ActionStatus::Running
                }
                Some((cell, route)) => {
                    self.state = HarvestState::Approaching { cell, route };
                    ActionStatus::Running
                }
                None => ActionStatus::Completed,
            },
            HarvestState::Approaching { cell, route } => {
                let cell = *cell;
                let outcome = walk(route, actor, ctx);
                if !Self::still_wanted(&self.wanted, cell, ctx) {
                    ctx.claims.release(actor.id);
                    self.state = HarvestState::Searching;
                    return ActionStatus::Running;
                }
                match outcome {
                    WalkOutcome::Moving => ActionStatus::Running,
                    WalkOutcome::Arrived => {
                        self.state = Self::start_work(cell, ctx);
                        ActionStatus::Running
                    }
                    WalkOutcome::Unreachable => ActionStatus::Completed,
                }
            }
            HarvestState::Working { cell, remaining, original } => {
                let (cell, original) = (*cell, *original);
                if !Self::still_wanted(&self.wanted, cell, ctx) {
                    return ActionStatus::Completed;
                }
                *remaining -= 1;
                if *remaining > 0 {
                    return ActionStatus::Running;
                }
                ctx.store.set_color(cell, original);
                Self::finish(cell, actor, ctx);
                ActionStatus::Completed
            }
        }
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }

    fn target(&self) -> Option<Coord> {
        match &self.state {
            HarvestState::Searching => None,
            HarvestState::Approaching { cell, .. } | HarvestState::Working { cell, .. } => Some(*cell),
        }
    }
}

/// Walk to the nearest loose items and pick them up
#[derive(Debug)]
pub struct Collect {
    item: Option<ItemId>,
    target: Option<(Coord, Route)>,
    canceled: CancelFlag,
}

impl Collect {
    /// Collect whatever lies closest
    pub fn any() -> Self {
        Self {
            item: None,
            target: None,
            canceled: CancelFlag::default(),
        }
    }

    /// Collect one kind of item, leaving the rest on the ground
    pub fn item(item: ItemId) -> Self {
        Self {
            item: Some(item),
            ..Self::any()
        }
    }

    fn matches(&self, items: &Inventory) -> bool {
        match self.item {
            Some(item) => items.contains(item),
            None => !items.is_empty(),
        }
    }

    fn find_target(&self, actor: &Actor, ctx: &mut ActionContext<'_>) -> Option<(Coord, Route)> {
        let candidates: Vec<Coord> = ctx
            .store
            .ground_items_near(actor.position, ctx.config.resource_search_radius)
            .into_iter()
            .filter(|c| ctx.store.items_at(*c).map_or(false, |items| self.matches(items)))
            .filter(|c| !ctx.claims.is_claimed_by_other(*c, actor.id))
            .take(MAX_CANDIDATES)
            .collect();
        for cell in candidates {
            let Some(route) = Route::plan(&*ctx.store, actor.position, PathGoal::Exact(cell), ctx.half_window())
            else {
                continue;
            };
            if ctx.claims.try_claim(actor.id, cell) {
                return Some((cell, route));
            }
        }
        None
    }

    fn pick_up(&self, cell: Coord, actor: &mut Actor, ctx: &mut ActionContext<'_>) {
        let mut items = ctx.store.take_items(cell);
        match self.item {
            Some(item) => {
                let taken = items.take(item, u32::MAX);
                actor.inventory.add(item, taken);
                ctx.store.drop_items(cell, items);
            }
            None => actor.inventory.merge(items),
        }
    }
}

impl Action for Collect {
    fn name(&self) -> &'static str {
        "collect"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        if self.target.is_none() {
            match self.find_target(actor, ctx) {
                Some(target) => self.target = Some(target),
                None => return ActionStatus::Completed,
            }
        }
        let Some((cell, route)) = self.target.as_mut() else {
            return ActionStatus::Completed;
        };
        let cell = *cell;
        let outcome = if route.is_empty() {
            WalkOutcome::Arrived
        } else {
            walk(route, actor, ctx)
        };
        match outcome {
            WalkOutcome::Moving => ActionStatus::Running,
            WalkOutcome::Arrived => {
                self.pick_up(cell, actor, ctx);
                ActionStatus::Completed
            }
            WalkOutcome::Unreachable => ActionStatus::Completed,
        }
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }

    fn target(&self) -> Option<Coord> {
        self.target.as_ref().map(|(cell, _)| *cell)
    }
}

/// Carry everything in the inventory to the home village store
///
/// The goods leave the inventory when the trip starts. If the haul is
/// canceled on the way, the cargo is dropped on the current tile.
#[derive(Debug)]
pub struct Haul {
    village: VillageId,
    cargo: Inventory,
    route: Option<Route>,
    canceled: CancelFlag,
}

impl Haul {
    pub fn to(village: VillageId) -> Self {
        Self {
            village,
            cargo: Inventory::new(),
            route: None,
            canceled: CancelFlag::default(),
        }
    }

    pub fn cargo(&self) -> &Inventory {
        &self.cargo
    }

    fn deliver(&mut self, actor: &Actor, ctx: &mut ActionContext<'_>) {
        let cargo = self.cargo.take_all();
        match ctx.villages.get_mut(&self.village) {
            Some(village) => {
                tracing::debug!(id = ?actor.id, village = ?village.id, items = cargo.total(), "cargo delivered");
                village.inventory.merge(cargo);
            }
            None => {
                ctx.store.drop_items(actor.position, cargo);
            }
        }
    }
}

impl Action for Haul {
    fn name(&self) -> &'static str {
        "haul"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            if !self.cargo.is_empty() {
                let cargo = self.cargo.take_all();
                ctx.store.drop_items(actor.position, cargo);
            }
            return ActionStatus::Canceled;
        }

        if self.route.is_none() {
            let Some(home) = ctx.villages.get(&self.village).map(|v| v.position) else {
                return ActionStatus::Completed;
            };
            let Some(route) = Route::plan(&*ctx.store, actor.position, PathGoal::Exact(home), ctx.half_window()) else {
                return ActionStatus::Completed;
            };
            self.cargo = actor.inventory.take_all();
            if self.cargo.is_empty() {
                return ActionStatus::Completed;
            }
            if route.is_empty() {
                self.deliver(actor, ctx);
                return ActionStatus::Completed;
            }
            self.route = Some(route);
        }

        let Some(route) = self.route.as_mut() else {
            return ActionStatus::Completed;
        };
        match walk(route, actor, ctx) {
            WalkOutcome::Moving => ActionStatus::Running,
            WalkOutcome::Arrived => {
                self.deliver(actor, ctx);
                ActionStatus::Completed
            }
            WalkOutcome::Unreachable => {
                actor.inventory.merge(self.cargo.take_all());
                ActionStatus::Completed
            }
        }
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }
}

/// Fetch food from the home village store, enough to fill up
#[derive(Debug)]
pub struct Withdraw {
    village: VillageId,
    item: ItemId,
    route: Option<Route>,
    canceled: CancelFlag,
}

impl Withdraw {
    pub fn new(village: VillageId, item: ItemId) -> Self {
        Self {
            village,
            item,
            route: None,
            canceled: CancelFlag::default(),
        }
    }

    fn take(&self, actor: &mut Actor, ctx: &mut ActionContext<'_>) {
        let worth = ctx.catalogs.items.edible_worth(self.item).unwrap_or(0);
        let wanted = actor.units_to_satiate(worth).max(1);
        if let Some(village) = ctx.villages.get_mut(&self.village) {
            let taken = village.inventory.take(self.item, wanted);
            actor.inventory.add(self.item, taken);
        }
    }
}

impl Action for Withdraw {
    fn name(&self) -> &'static str {
        "withdraw"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        if self.route.is_none() {
            let Some(home) = ctx.villages.get(&self.village).map(|v| v.position) else {
                return ActionStatus::Completed;
            };
            let Some(route) = Route::plan(&*ctx.store, actor.position, PathGoal::Exact(home), ctx.half_window()) else {
                return ActionStatus::Completed;
            };
            if route.is_empty() {
                self.take(actor, ctx);
                return ActionStatus::Completed;
            }
            self.route = Some(route);
        }
        let Some(route) = self.route.as_mut() else {
            return ActionStatus::Completed;
        };
        match walk(route, actor, ctx) {
            WalkOutcome::Moving => ActionStatus::Running,
            WalkOutcome::Arrived => {
                self.take(actor, ctx);
                ActionStatus::Completed
            }
            WalkOutcome::Unreachable => ActionStatus::Completed,
        }
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::Harness;
    use crate::catalog::items::{BERRIES, MEAT, WOOD};
    use crate::catalog::terrain::{GRASS, TREE};
    use crate::entity::actor::ActorKind;
    use crate::entity::village::Village;

    #[test]
    fn test_harvest_converts_cell_and_collects_drops() {
        let mut h = Harness::new();
        let tree = Coord::new(5, 2);
        h.set(tree, TREE);
        let mut actor = h.actor(ActorKind::Villager, 2, 2);
        let mut action = Harvest::new(vec![TREE]);

        let (status, _) = h.run(&mut action, &mut actor, 40);
        assert_eq!(status, ActionStatus::Completed);
        assert_eq!(h.store.terrain_at(tree), Some(GRASS));
        assert_eq!(actor.inventory.get(WOOD), 3);
        assert_eq!(actor.position, Coord::new(4, 2));
    }

    #[test]
    fn test_racing_harvesters_pick_different_targets() {
        let mut h = Harness::new();
        let near = Coord::new(10, 10);
        let next = Coord::new(10, 14);
        h.set(near, TREE);
        h.set(next, TREE);
        let mut a = h.actor(ActorKind::Villager, 8, 10);
        let mut b = h.actor(ActorKind::Villager, 8, 11);
        let mut first = Harvest::new(vec![TREE]);
        let mut second = Harvest::new(vec![TREE]);

        h.step(&mut first, &mut a);
        h.step(&mut second, &mut b);

        assert_eq!(first.target(), Some(near));
        assert_eq!(second.target(), Some(next));
        assert_eq!(h.claims.holder(near), Some(a.id));
        assert_eq!(h.claims.holder(next), Some(b.id));
    }

    #[test]
    fn test_harvest_without_resources_completes() {
        let mut h = Harness::new();
        let mut actor = h.actor(ActorKind::Villager, 2, 2);
        let mut action = Harvest::new(vec![TREE]);
        assert_eq!(h.step(&mut action, &mut actor).0, ActionStatus::Completed);
        assert!(h.claims.is_empty());
    }

    #[test]
    fn test_canceled_harvest_restores_color() {
        let mut h = Harness::new();
        let tree = Coord::new(3, 2);
        h.set(tree, TREE);
        let color = h.store.cell(tree).unwrap().color;
        let mut actor = h.actor(ActorKind::Villager, 2, 2);
        let mut action = Harvest::new(vec![TREE]);

        h.step(&mut action, &mut actor);
        assert_ne!(h.store.cell(tree).unwrap().color, color);
        action.cancel();
        assert_eq!(h.step(&mut action, &mut actor).0, ActionStatus::Canceled);
        assert_eq!(h.store.cell(tree).unwrap().color, color);
        assert_eq!(h.store.terrain_at(tree), Some(TREE));
    }

    #[test]
    fn test_collect_single_item_leaves_rest() {
        let mut h = Harness::new();
        let mut pile = Inventory::new();
        pile.add(MEAT, 2);
        pile.add(WOOD, 1);
        h.store.drop_items(Coord::new(6, 6), pile);
        let mut actor = h.actor(ActorKind::Wolf, 4, 6);
        let mut action = Collect::item(MEAT);

        assert_eq!(h.run(&mut action, &mut actor, 10).0, ActionStatus::Completed);
        assert_eq!(actor.inventory.get(MEAT), 2);
        assert_eq!(h.store.items_at(Coord::new(6, 6)).map(|i| i.get(WOOD)), Some(1));
    }

    fn village_at(h: &mut Harness, pos: Coord) -> VillageId {
        let village = Village::new(pos, 5);
        let id = village.id;
        h.villages.insert(id, village);
        id
    }

    #[test]
    fn test_haul_delivers_to_village() {
        let mut h = Harness::new();
        let home = village_at(&mut h, Coord::new(10, 10));
        let mut actor = h.actor(ActorKind::Villager, 6, 10);
        actor.inventory.add(WOOD, 3);
        let mut action = Haul::to(home);

        assert_eq!(h.run(&mut action, &mut actor, 20).0, ActionStatus::Completed);
        assert!(actor.inventory.is_empty());
        assert_eq!(h.villages.get(&home).unwrap().inventory.get(WOOD), 3);
    }

    #[test]
    fn test_canceled_haul_drops_cargo_on_current_tile() {
        let mut h = Harness::new();
        let home = village_at(&mut h, Coord::new(10, 10));
        let mut actor = h.actor(ActorKind::Villager, 2, 10);
        actor.inventory.add(WOOD, 2);
        let mut action = Haul::to(home);

        h.step(&mut action, &mut actor);
        assert_eq!(action.cargo().get(WOOD), 2);
        action.cancel();
        assert_eq!(h.step(&mut action, &mut actor).0, ActionStatus::Canceled);
        assert_eq!(h.store.items_at(actor.position).map(|i| i.get(WOOD)), Some(2));
        assert_eq!(h.villages.get(&home).unwrap().inventory.get(WOOD), 0);
    }

    #[test]
    fn test_withdraw_takes_clamped_amount() {
        let mut h = Harness::new();
        let home = village_at(&mut h, Coord::new(3, 3));
        h.villages.get_mut(&home).unwrap().inventory.add(BERRIES, 2);
        let mut actor = h.actor(ActorKind::Villager, 3, 3);
        actor.hunger = 10.0;
        let mut action = Withdraw::new(home, BERRIES);

        assert_eq!(h.step(&mut action, &mut actor).0, ActionStatus::Completed);
        assert_eq!(actor.inventory.get(BERRIES), 2);
        assert!(!h.villages.get(&home).unwrap().inventory.contains(BERRIES));
    }
}
