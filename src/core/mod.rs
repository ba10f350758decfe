pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::TickClock;
pub use config::SimulationConfig;
pub use error::{Result, SimError};
