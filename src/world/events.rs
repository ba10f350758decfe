//! Notifications for the presentation layer
//!
//! The core only reports what changed. A renderer that stopped listening is
//! not an error; events are simply dropped.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::core::types::{ChunkCoord, Coord, EntityId};
use crate::entity::actor::ActorKind;
use crate::world::cell::WorldCell;

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    CellChanged { coord: Coord, cell: WorldCell },
    EntityAdded { id: EntityId, kind: ActorKind, position: Coord },
    EntityRemoved { id: EntityId },
    ChunkLoaded(ChunkCoord),
    ChunkUnloaded(ChunkCoord),
}

#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<WorldEvent>>,
}

impl EventSink {
    /// A sink wired to a fresh receiver
    pub fn channel() -> (Self, UnboundedReceiver<WorldEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards everything
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: WorldEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
