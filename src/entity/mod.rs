pub mod actor;
pub mod inventory;
pub mod policy;
pub mod queue;
pub mod registry;
pub mod village;

pub use actor::{Actor, ActorKind};
pub use inventory::Inventory;
pub use policy::{AttackResponse, Diet, KindPolicy, PolicyTable, WanderStrategy};
pub use queue::ActionQueue;
pub use registry::{EntityRecord, EntityRegistry, RegistrySnapshot, SpawnBatch, StagedChange};
pub use village::Village;
