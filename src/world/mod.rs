//! Chunk-streamed procedural world

pub mod cell;
pub mod chunk;
pub mod events;
pub mod generation;
pub mod lifecycle;
pub mod spawning;
pub mod store;
pub mod streaming;

pub use cell::WorldCell;
pub use chunk::Chunk;
pub use events::{EventSink, WorldEvent};
pub use generation::TerrainGenerator;
pub use lifecycle::ChunkLifecycle;
pub use store::ChunkStore;
pub use streaming::{plan_streaming, StreamPlan};
