use thiserror::Error;

use crate::catalog::{ItemId, TerrainId};
use crate::core::types::ChunkCoord;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unknown terrain id: {0:?}")]
    UnknownTerrain(TerrainId),

    #[error("Unknown item id: {0:?}")]
    UnknownItem(ItemId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Chunk {coord:?} regenerated with different terrain (fingerprint {expected:#x} != {actual:#x})")]
    ChunkRegenerationMismatch {
        coord: ChunkCoord,
        expected: u64,
        actual: u64,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
