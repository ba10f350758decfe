//! Which chunks to load and unload around points of interest

use ahash::AHashSet;

use crate::core::types::{ChunkCoord, Coord};

/// Chunks to bring in and evict, both in sorted order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPlan {
    pub load: Vec<ChunkCoord>,
    pub unload: Vec<ChunkCoord>,
}

impl StreamPlan {
    pub fn is_empty(&self) -> bool {
        self.load.is_empty() && self.unload.is_empty()
    }
}

/// Plan streaming for a set of points of interest
///
/// Everything within `load_radius` chunks of a point is wanted. A loaded chunk
/// is only evicted once it is farther than `unload_radius` from every point.
pub fn plan_streaming(
    loaded: &[ChunkCoord],
    points: &[Coord],
    chunk_size: i32,
    load_radius: i32,
    unload_radius: i32,
) -> StreamPlan {
    let centers: Vec<ChunkCoord> = points
        .iter()
        .map(|p| ChunkCoord::containing(*p, chunk_size))
        .collect();
    let loaded_set: AHashSet<ChunkCoord> = loaded.iter().copied().collect();

    let mut wanted = AHashSet::new();
    for center in &centers {
        for dy in -load_radius..=load_radius {
            for dx in -load_radius..=load_radius {
                wanted.insert(ChunkCoord::new(center.x + dx, center.y + dy));
            }
        }
    }

    let mut load: Vec<ChunkCoord> = wanted
        .into_iter()
        .filter(|c| !loaded_set.contains(c))
        .collect();
    load.sort();

    let mut unload: Vec<ChunkCoord> = loaded
        .iter()
        .copied()
        .filter(|c| centers.iter().all(|center| center.distance(c) > unload_radius))
        .collect();
    unload.sort();

    StreamPlan { load, unload }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_load_covers_radius() {
        let plan = plan_streaming(&[], &[Coord::new(5, 5)], 16, 1, 2);
        assert_eq!(plan.load.len(), 9);
        assert!(plan.unload.is_empty());
        assert!(plan.load.contains(&ChunkCoord::new(-1, -1)));
        assert!(plan.load.contains(&ChunkCoord::new(1, 1)));
    }

    #[test]
    fn test_hysteresis_keeps_nearby_chunks() {
        // Point moved one chunk east; the column it left is within unload_radius
        let loaded: Vec<ChunkCoord> = (-1..=1)
            .flat_map(|y| (-1..=1).map(move |x| ChunkCoord::new(x, y)))
            .collect();
        let plan = plan_streaming(&loaded, &[Coord::new(20, 0)], 16, 1, 2);
        assert!(plan.unload.is_empty());
        assert_eq!(plan.load.len(), 3);
        assert!(plan.load.iter().all(|c| c.x == 2));
    }

    #[test]
    fn test_far_chunks_unload() {
        let loaded = vec![ChunkCoord::new(0, 0), ChunkCoord::new(5, 0)];
        let plan = plan_streaming(&loaded, &[Coord::new(0, 0)], 16, 0, 2);
        assert_eq!(plan.unload, vec![ChunkCoord::new(5, 0)]);
        assert!(plan.load.is_empty());
    }

    #[test]
    fn test_no_points_unloads_everything() {
        let loaded = vec![ChunkCoord::new(0, 0)];
        let plan = plan_streaming(&loaded, &[], 16, 1, 2);
        assert_eq!(plan.unload, loaded);
        assert!(plan.load.is_empty());
    }
}
