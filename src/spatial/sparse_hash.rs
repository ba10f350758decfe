//! Sparse hash grid over live actors for neighbour queries

use ahash::AHashMap;

use crate::core::types::{manhattan, Coord, EntityId};
use crate::entity::actor::{Actor, ActorKind};

/// What other actors may read about an actor during a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorSummary {
    pub id: EntityId,
    pub kind: ActorKind,
    pub position: Coord,
    pub predator: bool,
    pub alive: bool,
}

/// Sparse bucket grid for O(1) neighbour queries
#[derive(Debug)]
pub struct SparseHashGrid {
    bucket_size: i32,
    buckets: AHashMap<(i32, i32), Vec<EntityId>>,
}

impl SparseHashGrid {
    pub fn new(bucket_size: i32) -> Self {
        Self {
            bucket_size: bucket_size.max(1),
            buckets: AHashMap::new(),
        }
    }

    #[inline]
    fn bucket(&self, pos: Coord) -> (i32, i32) {
        (pos.x.div_euclid(self.bucket_size), pos.y.div_euclid(self.bucket_size))
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    pub fn insert(&mut self, entity: EntityId, pos: Coord) {
        let key = self.bucket(pos);
        self.buckets.entry(key).or_default().push(entity);
    }

    pub fn remove(&mut self, entity: EntityId, pos: Coord) {
        let key = self.bucket(pos);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.retain(|&e| e != entity);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    /// Entities in every bucket overlapping the square of `radius` around `center`
    pub fn query_square(&self, center: Coord, radius: i32) -> impl Iterator<Item = EntityId> + '_ {
        let (min_x, min_y) = self.bucket(center - Coord::splat(radius));
        let (max_x, max_y) = self.bucket(center + Coord::splat(radius));
        (min_y..=max_y).flat_map(move |by| {
            (min_x..=max_x).flat_map(move |bx| self.buckets.get(&(bx, by)).into_iter().flatten().copied())
        })
    }
}

/// Positions of live actors, kept current within a tick
#[derive(Debug)]
pub struct ActorIndex {
    grid: SparseHashGrid,
    summaries: AHashMap<EntityId, ActorSummary>,
}

impl ActorIndex {
    pub fn new(bucket_size: i32) -> Self {
        Self {
            grid: SparseHashGrid::new(bucket_size),
            summaries: AHashMap::new(),
        }
    }

    /// Rebuild from the live actor list
    pub fn rebuild<'a>(&mut self, actors: impl Iterator<Item = &'a Actor>, predator: impl Fn(ActorKind) -> bool) {
        self.grid.clear();
        self.summaries.clear();
        for actor in actors {
            self.insert(summarize(actor, predator(actor.kind)));
        }
    }

    pub fn insert(&mut self, summary: ActorSummary) {
        if let Some(old) = self.summaries.insert(summary.id, summary) {
            self.grid.remove(old.id, old.position);
        }
        self.grid.insert(summary.id, summary.position);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<ActorSummary> {
        let old = self.summaries.remove(&id)?;
        self.grid.remove(id, old.position);
        Some(old)
    }

    /// Refresh an actor's position and liveness after it stepped
    pub fn update(&mut self, actor: &Actor) {
        let Some(summary) = self.summaries.get_mut(&actor.id) else {
            return;
        };
        let old = summary.position;
        summary.position = actor.position;
        summary.alive = actor.is_alive();
        if old != actor.position {
            self.grid.remove(actor.id, old);
            self.grid.insert(actor.id, actor.position);
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&ActorSummary> {
        self.summaries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Nearest live actor within `radius` (Manhattan) passing `filter`
    ///
    /// Ties are broken by position so the result never depends on hash order.
    pub fn nearest(
        &self,
        center: Coord,
        radius: i32,
        filter: impl Fn(&ActorSummary) -> bool,
    ) -> Option<&ActorSummary> {
        self.grid
            .query_square(center, radius)
            .filter_map(|id| self.summaries.get(&id))
            .filter(|s| s.alive && manhattan(center, s.position) <= radius && filter(s))
            .min_by_key(|s| (manhattan(center, s.position), s.position.y, s.position.x))
    }

    /// True if any live actor other than `except` stands on `cell`
    pub fn is_occupied(&self, cell: Coord, except: Option<EntityId>) -> bool {
        self.grid
            .query_square(cell, 0)
            .filter_map(|id| self.summaries.get(&id))
            .any(|s| s.alive && Some(s.id) != except && s.position == cell)
    }
}

pub fn summarize(actor: &Actor, predator: bool) -> ActorSummary {
    ActorSummary {
        id: actor.id,
        kind: actor.kind,
        position: actor.position,
        predator,
        alive: actor.is_alive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::policy::PolicyTable;

    fn actor(kind: ActorKind, x: i32, y: i32) -> Actor {
        let table = PolicyTable::default();
        Actor::new(kind, Coord::new(x, y), table.get(kind), 0)
    }

    #[test]
    fn test_grid_query_spans_buckets() {
        let mut grid = SparseHashGrid::new(4);
        let a = EntityId::new();
        let b = EntityId::new();
        grid.insert(a, Coord::new(-1, 0));
        grid.insert(b, Coord::new(9, 9));
        let found: Vec<_> = grid.query_square(Coord::new(1, 1), 2).collect();
        assert_eq!(found, vec![a]);
        grid.remove(a, Coord::new(-1, 0));
        assert_eq!(grid.query_square(Coord::new(1, 1), 2).count(), 0);
    }

    #[test]
    fn test_nearest_respects_filter_and_radius() {
        let rabbit = actor(ActorKind::Rabbit, 3, 0);
        let deer = actor(ActorKind::Deer, 1, 0);
        let far = actor(ActorKind::Rabbit, 30, 0);
        let table = PolicyTable::default();
        let mut index = ActorIndex::new(8);
        index.rebuild([&rabbit, &deer, &far].into_iter(), |k| table.get(k).predator);

        let hit = index.nearest(Coord::new(0, 0), 10, |s| s.kind == ActorKind::Rabbit);
        assert_eq!(hit.map(|s| s.id), Some(rabbit.id));
        let any = index.nearest(Coord::new(0, 0), 10, |_| true);
        assert_eq!(any.map(|s| s.id), Some(deer.id));
        assert!(index.nearest(Coord::new(0, 0), 2, |s| s.kind == ActorKind::Rabbit).is_none());
    }

    #[test]
    fn test_update_moves_and_marks_dead() {
        let mut wolf = actor(ActorKind::Wolf, 0, 0);
        let mut index = ActorIndex::new(4);
        index.insert(summarize(&wolf, true));

        wolf.position = Coord::new(10, 10);
        index.update(&wolf);
        assert!(index.is_occupied(Coord::new(10, 10), None));
        assert!(!index.is_occupied(Coord::new(10, 10), Some(wolf.id)));
        assert!(!index.is_occupied(Coord::new(0, 0), None));

        wolf.die();
        index.update(&wolf);
        assert!(index.nearest(Coord::new(10, 10), 1, |_| true).is_none());
        assert_eq!(index.remove(wolf.id).map(|s| s.alive), Some(false));
        assert!(index.is_empty());
    }
}
