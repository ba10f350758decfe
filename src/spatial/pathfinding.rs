//! Windowed A* pathfinding over the chunk store
//!
//! Searches are confined to a square window centred on the requesting actor.
//! Cells outside the window, and cells in chunks that are not loaded, count as
//! blocked.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use ahash::AHashMap;

use crate::core::types::{manhattan, neighbors4, Coord};
use crate::world::store::ChunkStore;

/// Where a path should end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathGoal {
    /// Stand on this cell
    Exact(Coord),
    /// Stand on any walkable cell orthogonally next to this one
    Adjacent(Coord),
}

impl PathGoal {
    pub fn target(&self) -> Coord {
        match self {
            PathGoal::Exact(c) | PathGoal::Adjacent(c) => *c,
        }
    }

    fn is_reached(&self, cell: Coord) -> bool {
        match self {
            PathGoal::Exact(c) => cell == *c,
            PathGoal::Adjacent(c) => manhattan(cell, *c) == 1,
        }
    }

    fn heuristic(&self, cell: Coord) -> i32 {
        match self {
            PathGoal::Exact(c) => manhattan(cell, *c),
            PathGoal::Adjacent(c) => (manhattan(cell, *c) - 1).max(0),
        }
    }
}

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    coord: Coord,
    f_cost: i32,
    g_cost: i32,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; prefer deeper nodes, then a fixed cell order
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| self.g_cost.cmp(&other.g_cost))
            .then_with(|| (other.coord.y, other.coord.x).cmp(&(self.coord.y, self.coord.x)))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn in_window(origin: Coord, cell: Coord, half_window: i32) -> bool {
    (cell.x - origin.x).abs() <= half_window && (cell.y - origin.y).abs() <= half_window
}

/// Find a path with A*
///
/// Returns the steps to take, excluding `start`; an empty path means the goal
/// is already satisfied. Returns None if no path exists inside the window.
pub fn find_path(store: &ChunkStore, start: Coord, goal: PathGoal, half_window: i32) -> Option<Vec<Coord>> {
    if goal.is_reached(start) {
        return Some(Vec::new());
    }
    if let PathGoal::Exact(end) = goal {
        if !in_window(start, end, half_window) || !store.is_walkable(end) {
            return None;
        }
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<Coord, Coord> = AHashMap::new();
    let mut g_scores: AHashMap<Coord, i32> = AHashMap::new();

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        coord: start,
        f_cost: goal.heuristic(start),
        g_cost: 0,
    });

    while let Some(current) = open_set.pop() {
        if goal.is_reached(current.coord) {
            return Some(reconstruct_path(&came_from, current.coord));
        }

        let current_g = *g_scores.get(&current.coord).unwrap_or(&i32::MAX);
        if current.g_cost > current_g {
            continue; // stale entry
        }

        for neighbor in neighbors4(current.coord) {
            if !in_window(start, neighbor, half_window) || !store.is_walkable(neighbor) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&i32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    coord: neighbor,
                    f_cost: tentative_g + goal.heuristic(neighbor),
                    g_cost: tentative_g,
                });
            }
        }
    }

    None // No path found
}

/// Shortest path from `start` to exactly `end`
pub fn shortest_path(store: &ChunkStore, start: Coord, end: Coord, half_window: i32) -> Option<Vec<Coord>> {
    find_path(store, start, PathGoal::Exact(end), half_window)
}

/// Reconstruct path from came_from map, dropping the start cell
fn reconstruct_path(came_from: &AHashMap<Coord, Coord>, mut current: Coord) -> Vec<Coord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.pop();
    path.reverse();
    path
}

/// Result of trying to take one step along a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    /// The next cell is not walkable right now; the plan is kept
    Blocked,
    /// No steps left
    Arrived,
}

/// A planned path consumed one step per tick
#[derive(Debug, Clone)]
pub struct Route {
    goal: PathGoal,
    steps: VecDeque<Coord>,
    blocked_ticks: u32,
}

impl Route {
    pub fn plan(store: &ChunkStore, start: Coord, goal: PathGoal, half_window: i32) -> Option<Self> {
        let steps = find_path(store, start, goal, half_window)?;
        Some(Self {
            goal,
            steps: steps.into(),
            blocked_ticks: 0,
        })
    }

    pub fn goal(&self) -> PathGoal {
        self.goal
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Consecutive ticks the next step has been blocked
    pub fn blocked_ticks(&self) -> u32 {
        self.blocked_ticks
    }

    /// Take the next step, re-checking it against the store first
    pub fn advance(&mut self, store: &ChunkStore, position: &mut Coord) -> StepOutcome {
        let Some(&next) = self.steps.front() else {
            return StepOutcome::Arrived;
        };
        if manhattan(*position, next) != 1 || !store.is_walkable(next) {
            self.blocked_ticks += 1;
            return StepOutcome::Blocked;
        }
        self.steps.pop_front();
        *position = next;
        self.blocked_ticks = 0;
        StepOutcome::Moved
    }

    /// Plan again from `start` toward the same goal; false if no path remains
    pub fn replan(&mut self, store: &ChunkStore, start: Coord, half_window: i32) -> bool {
        match find_path(store, start, self.goal, half_window) {
            Some(steps) => {
                self.steps = steps.into();
                self.blocked_ticks = 0;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::catalog::terrain::{GRASS, MOUNTAIN};
    use crate::catalog::Catalogs;
    use crate::core::config::SimulationConfig;
    use crate::core::types::ChunkCoord;
    use crate::world::cell::WorldCell;
    use crate::world::chunk::Chunk;
    use crate::world::events::EventSink;
    use crate::world::store::store_for;

    /// One loaded 16x16 grass chunk at the origin
    fn open_store() -> ChunkStore {
        let config = SimulationConfig {
            chunk_size: 16,
            ..SimulationConfig::default()
        };
        let catalogs = Arc::new(Catalogs::builtin());
        let grass = WorldCell::from_descriptor(catalogs.terrain.get(GRASS).unwrap(), 0);
        let mut store = store_for(&config, catalogs, EventSink::disabled());
        store.insert_chunk(Chunk::filled(ChunkCoord::new(0, 0), 16, grass));
        store
    }

    fn wall(store: &mut ChunkStore, cells: &[Coord]) {
        let catalogs = Catalogs::builtin();
        let mountain = catalogs.terrain.get(MOUNTAIN).unwrap();
        for cell in cells {
            store.set_terrain(*cell, mountain);
        }
    }

    #[test]
    fn test_pathfind_straight_line() {
        let store = open_store();
        let path = shortest_path(&store, Coord::new(0, 0), Coord::new(5, 0), 20).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&Coord::new(1, 0)));
        assert_eq!(path.last(), Some(&Coord::new(5, 0)));
    }

    #[test]
    fn test_pathfind_around_obstacle() {
        let mut store = open_store();
        wall(&mut store, &[Coord::new(2, 0), Coord::new(2, 1), Coord::new(2, 2)]);
        let path = shortest_path(&store, Coord::new(0, 0), Coord::new(4, 0), 20).unwrap();
        assert!(!path.contains(&Coord::new(2, 0)));
        assert_eq!(path.len(), 10);
    }

    #[test]
    fn test_pathfind_no_path() {
        let mut store = open_store();
        let goal = Coord::new(5, 5);
        wall(&mut store, &neighbors4(goal));
        assert!(shortest_path(&store, Coord::new(0, 0), goal, 20).is_none());
    }

    #[test]
    fn test_unloaded_cells_block() {
        let store = open_store();
        assert!(shortest_path(&store, Coord::new(15, 0), Coord::new(16, 0), 20).is_none());
        assert!(shortest_path(&store, Coord::new(0, 0), Coord::new(-1, 0), 20).is_none());
    }

    #[test]
    fn test_window_limits_search() {
        let store = open_store();
        assert!(shortest_path(&store, Coord::new(0, 0), Coord::new(10, 0), 4).is_none());
        assert!(shortest_path(&store, Coord::new(0, 0), Coord::new(4, 0), 4).is_some());
    }

    #[test]
    fn test_adjacent_goal_stops_next_to_target() {
        let mut store = open_store();
        let tree = Coord::new(6, 3);
        wall(&mut store, &[tree]);
        let path = find_path(&store, Coord::new(0, 3), PathGoal::Adjacent(tree), 20).unwrap();
        assert_eq!(path.last(), Some(&Coord::new(5, 3)));
        assert_eq!(find_path(&store, Coord::new(5, 3), PathGoal::Adjacent(tree), 20), Some(Vec::new()));
    }

    #[test]
    fn test_route_blocks_then_replans() {
        let mut store = open_store();
        let mut pos = Coord::new(0, 0);
        let mut route = Route::plan(&store, pos, PathGoal::Exact(Coord::new(3, 0)), 20).unwrap();
        assert_eq!(route.advance(&store, &mut pos), StepOutcome::Moved);
        assert_eq!(pos, Coord::new(1, 0));

        wall(&mut store, &[Coord::new(2, 0)]);
        assert_eq!(route.advance(&store, &mut pos), StepOutcome::Blocked);
        assert_eq!(route.advance(&store, &mut pos), StepOutcome::Blocked);
        assert_eq!(route.blocked_ticks(), 2);
        assert_eq!(pos, Coord::new(1, 0));
        assert_eq!(route.len(), 2);

        assert!(route.replan(&store, pos, 20));
        assert_eq!(route.blocked_ticks(), 0);
        while route.advance(&store, &mut pos) == StepOutcome::Moved {}
        assert_eq!(pos, Coord::new(3, 0));
    }
}
