//! Property tests for the invariants that must hold for any input

use std::sync::Arc;

use proptest::prelude::*;

use wildlands::actions::{Action, Stun, Wait};
use wildlands::catalog::items::BERRIES;
use wildlands::catalog::Catalogs;
use wildlands::core::types::ChunkCoord;
use wildlands::core::SimulationConfig;
use wildlands::entity::{ActionQueue, Inventory};
use wildlands::world::TerrainGenerator;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn generation_is_deterministic(seed in any::<u64>(), x in -500i32..500, y in -500i32..500) {
        let mut config = SimulationConfig::default();
        config.seed = seed;
        config.chunk_size = 16;
        let catalogs = Arc::new(Catalogs::builtin());
        let first = TerrainGenerator::new(&config, Arc::clone(&catalogs));
        let second = TerrainGenerator::new(&config, catalogs);

        let coord = ChunkCoord::new(x, y);
        let a = first.generate(coord).unwrap();
        let b = second.generate(coord).unwrap();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
        let cells_a: Vec<_> = a.iter().map(|(c, cell)| (c, cell.clone())).collect();
        let cells_b: Vec<_> = b.iter().map(|(c, cell)| (c, cell.clone())).collect();
        prop_assert_eq!(cells_a, cells_b);
    }

    #[test]
    fn inventory_take_clamps(held in 1u32..1000, wanted in 0u32..2000) {
        let mut inventory = Inventory::new();
        inventory.add(BERRIES, held);
        let taken = inventory.take(BERRIES, wanted);

        prop_assert_eq!(taken, wanted.min(held));
        if wanted >= held {
            prop_assert!(!inventory.contains(BERRIES));
        } else {
            prop_assert_eq!(inventory.get(BERRIES), held - wanted);
        }
    }

    #[test]
    fn queue_starts_actions_in_push_order(kinds in proptest::collection::vec(any::<bool>(), 0..20)) {
        let mut queue = ActionQueue::new();
        for stun in &kinds {
            let action: Box<dyn Action> = if *stun {
                Box::new(Stun::new(1))
            } else {
                Box::new(Wait::new(1))
            };
            queue.push(action);
        }

        let mut order = Vec::new();
        while queue.start_next() {
            prop_assert!(queue.current().is_some());
            let Some(action) = queue.take_current() else { break };
            order.push(action.name());
        }
        let expected: Vec<&str> = kinds.iter().map(|s| if *s { "stun" } else { "wait" }).collect();
        prop_assert_eq!(order, expected);
    }
}
