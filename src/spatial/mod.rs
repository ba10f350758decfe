//! Spatial queries: pathfinding and actor neighbourhoods

pub mod pathfinding;
pub mod sparse_hash;

pub use pathfinding::{find_path, shortest_path, PathGoal, Route, StepOutcome};
pub use sparse_hash::{ActorIndex, ActorSummary, SparseHashGrid};
