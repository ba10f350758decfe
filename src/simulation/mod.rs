//! Simulation driver: the per-tick loop and the state it runs over

pub mod regrowth;
pub mod scheduler;
pub mod state;
pub mod tick;

pub use regrowth::{RegrowthMonitor, RegrowthRequest, RegrowthTargets, Regrower};
pub use scheduler::step_actor;
pub use state::Simulation;
pub use tick::{run_simulation_tick, DeathCause, SimulationEvent};
