//! Deterministic chunk terrain generation
//!
//! Terrain for a chunk is a pure function of (world seed, chunk coordinate):
//! 1. sample a multi-octave Perlin height field once per cell
//! 2. normalize the samples across the chunk to [0, 1]
//! 3. classify each cell by height band (water / sand / grass / mountain)
//! 4. roll grass cells against the resource terrains, rarest first, using a
//!    ChaCha8 stream seeded from (seed, chunk coordinate)

use std::sync::Arc;

use noise::{NoiseFn, Perlin};
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::catalog::terrain::{GRASS, MOUNTAIN, SAND, WATER};
use crate::catalog::{Catalogs, TerrainDescriptor, TerrainId};
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::ChunkCoord;
use crate::world::cell::WorldCell;
use crate::world::chunk::Chunk;

/// Salt for the terrain stream of a chunk
pub const TERRAIN_SALT: u64 = 0x7e44_a1d0;
/// Salt for entity spawning streams
pub const ENTITY_SALT: u64 = 0x5ba_77e1;
/// Salt for regrowth placement streams
pub const REGROWTH_SALT: u64 = 0x4e6_0a11;

/// Mix a seed, chunk coordinate and salt into one stream seed (splitmix64 finalizer)
pub fn chunk_seed(seed: u64, coord: ChunkCoord, salt: u64) -> u64 {
    let mut z = seed
        ^ (coord.x as u32 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (coord.y as u32 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ salt.wrapping_mul(0x1656_67B1_9E37_79F9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Pick a resource for a roll in [0, 1), walking the list rarest first
fn pick_resource(roll: f32, rarest_first: &[&TerrainDescriptor]) -> Option<TerrainId> {
    let mut threshold = 0.0;
    for resource in rarest_first {
        threshold += resource.spawn_weight;
        if roll < threshold {
            return Some(resource.id);
        }
    }
    None
}

#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    seed: u64,
    chunk_size: i32,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
    scale: f64,
    water_level: f32,
    sand_level: f32,
    mountain_level: f32,
    perlin: Perlin,
    catalogs: Arc<Catalogs>,
}

impl TerrainGenerator {
    pub fn new(config: &SimulationConfig, catalogs: Arc<Catalogs>) -> Self {
        Self {
            seed: config.seed,
            chunk_size: config.chunk_size,
            octaves: config.octaves,
            persistence: config.persistence,
            lacunarity: config.lacunarity,
            scale: config.noise_scale,
            water_level: config.water_level,
            sand_level: config.sand_level,
            mountain_level: config.mountain_level,
            perlin: Perlin::new((config.seed ^ (config.seed >> 32)) as u32),
            catalogs,
        }
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Normalized heights for every cell of the chunk, row-major
    pub fn height_field(&self, coord: ChunkCoord) -> Vec<f32> {
        let raw: Vec<f64> = coord
            .cells(self.chunk_size)
            .map(|cell| {
                let mut amplitude = 1.0;
                let mut frequency = self.scale;
                let mut total = 0.0;
                for _ in 0..self.octaves {
                    total += amplitude
                        * self.perlin.get([cell.x as f64 * frequency, cell.y as f64 * frequency]);
                    amplitude *= self.persistence;
                    frequency *= self.lacunarity;
                }
                total
            })
            .collect();

        let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
        let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        if range < 1e-12 {
            return vec![0.5; raw.len()];
        }
        raw.iter().map(|h| ((h - min) / range) as f32).collect()
    }

    /// Height band classification
    pub fn classify(&self, height: f32) -> TerrainId {
        if height < self.water_level {
            WATER
        } else if height < self.sand_level {
            SAND
        } else if height > self.mountain_level {
            MOUNTAIN
        } else {
            GRASS
        }
    }

    /// Generate the chunk's terrain
    ///
    /// Fails only if the catalog is missing a terrain the generator needs.
    pub fn generate(&self, coord: ChunkCoord) -> Result<Chunk> {
        let heights = self.height_field(coord);
        let resources = self.catalogs.terrain.resources_rarest_first();
        let mut rng = ChaCha8Rng::seed_from_u64(chunk_seed(self.seed, coord, TERRAIN_SALT));

        let mut cells = Vec::with_capacity(heights.len());
        for height in heights {
            let mut terrain = self.classify(height);
            // Roll for every cell so the stream position never depends on the band
            let roll: f32 = rng.gen();
            if terrain == GRASS {
                if let Some(resource) = pick_resource(roll, &resources) {
                    terrain = resource;
                }
            }
            let descriptor = self.catalogs.terrain.get(terrain)?;
            let variant = rng.gen_range(0..descriptor.variants.len().max(1));
            cells.push(WorldCell::from_descriptor(descriptor, variant));
        }

        Ok(Chunk::from_cells(coord, self.chunk_size, cells))
    }
}
