//! Eating: the Consume primitive and the Eat, Forage and Hunt composites

use crate::actions::combat::Attack;
use crate::actions::gather::{Collect, Harvest, Withdraw};
use crate::actions::{Action, ActionContext, ActionStatus, CancelFlag};
use crate::catalog::items::MEAT;
use crate::catalog::{Catalogs, ItemId, TerrainId};
use crate::entity::actor::Actor;
use crate::entity::inventory::Inventory;
use crate::entity::policy::Diet;

/// Can this diet eat the item at all?
fn diet_allows(diet: Diet, item: ItemId) -> bool {
    match diet {
        Diet::Herbivore => item != MEAT,
        Diet::Carnivore => item == MEAT,
        Diet::Omnivore => true,
    }
}

/// Most nourishing edible item in `inventory` the diet allows
fn best_edible(inventory: &Inventory, diet: Diet, catalogs: &Catalogs) -> Option<(ItemId, u32)> {
    inventory
        .iter()
        .filter(|(item, _)| diet_allows(diet, *item))
        .filter_map(|(item, _)| catalogs.items.edible_worth(item).map(|worth| (item, worth)))
        .max_by_key(|(item, worth)| (*worth, std::cmp::Reverse(*item)))
}

/// Resource terrains whose drops the diet can eat
fn edible_resources(diet: Diet, catalogs: &Catalogs) -> Vec<TerrainId> {
    let mut ids: Vec<TerrainId> = catalogs
        .terrain
        .iter()
        .filter(|d| d.is_resource)
        .filter(|d| {
            d.drops
                .iter()
                .any(|(item, _)| diet_allows(diet, *item) && catalogs.items.edible_worth(*item).is_some())
        })
        .map(|d| d.id)
        .collect();
    ids.sort();
    ids
}

/// Eat held food until full, or until the food runs out
///
/// Eats `ceil((max_hunger - hunger) / worth)` units, clamped to what is held.
#[derive(Debug)]
pub struct Consume {
    item: Option<ItemId>,
    canceled: CancelFlag,
}

impl Consume {
    /// Eat the most nourishing food the diet allows
    pub fn any() -> Self {
        Self {
            item: None,
            canceled: CancelFlag::default(),
        }
    }

    pub fn item(item: ItemId) -> Self {
        Self {
            item: Some(item),
            canceled: CancelFlag::default(),
        }
    }
}

impl Action for Consume {
    fn name(&self) -> &'static str {
        "consume"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        let diet = ctx.policy(actor).diet;
        let choice = match self.item {
            Some(item) => ctx.catalogs.items.edible_worth(item).map(|worth| (item, worth)),
            None => best_edible(&actor.inventory, diet, ctx.catalogs),
        };
        let Some((item, worth)) = choice else {
            return ActionStatus::Completed;
        };
        let wanted = actor.units_to_satiate(worth);
        let eaten = actor.inventory.take(item, wanted);
        actor.eat((eaten * worth) as f32);
        tracing::trace!(id = ?actor.id, ?item, eaten, hunger = actor.hunger, "consumed");
        ActionStatus::Completed
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }
}

/// Composite: get something to eat by whatever means the actor has
///
/// In order of preference: food already carried, food in the home village
/// store, foraging (plant eaters), hunting (meat eaters).
#[derive(Debug, Default)]
pub struct Eat {
    canceled: CancelFlag,
}

impl Eat {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Action for Eat {
    fn name(&self) -> &'static str {
        "eat"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        let diet = ctx.policy(actor).diet;

        if best_edible(&actor.inventory, diet, ctx.catalogs).is_some() {
            ctx.push_follow_up(Box::new(Consume::any()));
            return ActionStatus::Completed;
        }

        let stocked = actor.home.and_then(|id| {
            let village = ctx.villages.get(&id)?;
            best_edible(&village.inventory, diet, ctx.catalogs).map(|(item, _)| (id, item))
        });
        if let Some((village, item)) = stocked {
            ctx.push_follow_up(Box::new(Withdraw::new(village, item)));
            ctx.push_follow_up(Box::new(Consume::item(item)));
            return ActionStatus::Completed;
        }

        if diet.eats_plants() {
            ctx.push_follow_up(Box::new(Forage::new()));
        } else if diet.hunts() {
            ctx.push_follow_up(Box::new(Hunt::new()));
        }
        ActionStatus::Completed
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }
}

/// Composite: harvest an edible plant, then eat what it gave
#[derive(Debug, Default)]
pub struct Forage {
    canceled: CancelFlag,
}

impl Forage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Action for Forage {
    fn name(&self) -> &'static str {
        "forage"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        let wanted = edible_resources(ctx.policy(actor).diet, ctx.catalogs);
        if !wanted.is_empty() {
            ctx.push_follow_up(Box::new(Harvest::new(wanted)));
            ctx.push_follow_up(Box::new(Consume::any()));
        }
        ActionStatus::Completed
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }
}

/// Composite: kill the nearest prey, pick up the meat, eat it
#[derive(Debug, Default)]
pub struct Hunt {
    canceled: CancelFlag,
}

impl Hunt {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Action for Hunt {
    fn name(&self) -> &'static str {
        "hunt"
    }

    fn execute(&mut self, actor: &mut Actor, ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        let hunter = actor.id;
        let prey = ctx
            .others
            .nearest(actor.position, ctx.config.resource_search_radius, |s| {
                s.id != hunter && s.kind.is_wildlife() && !s.predator
            })
            .map(|s| s.id);
        if let Some(prey) = prey {
            ctx.push_follow_up(Box::new(Attack::new(prey)));
            ctx.push_follow_up(Box::new(Collect::item(MEAT)));
            ctx.push_follow_up(Box::new(Consume::item(MEAT)));
        }
        ActionStatus::Completed
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }
}
