//! Simulation configuration with documented constants
//!
//! All tunables are collected here with explanations of their purpose
//! and how they interact with each other. A config is built once at startup
//! (defaults, or a TOML file) and passed explicitly to whatever needs it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::error::{Result, SimError};
use crate::entity::policy::PolicyTable;

/// Configuration for the simulation systems
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === CLOCK ===
    /// Simulated seconds that elapse per global tick
    pub seconds_per_tick: f32,

    // === TERRAIN GENERATION ===
    /// World seed; together with a chunk coordinate it fully determines terrain
    pub seed: u64,

    /// Side length of a chunk in cells
    pub chunk_size: i32,

    /// Number of noise octaves summed per cell
    pub octaves: u32,

    /// Amplitude multiplier applied per octave (0.5 = each octave half as strong)
    pub persistence: f64,

    /// Frequency multiplier applied per octave (2.0 = each octave twice as fine)
    pub lacunarity: f64,

    /// Base frequency in noise units per cell
    ///
    /// Smaller = broader landmasses. At 0.03 a feature spans roughly 30 cells.
    pub noise_scale: f64,

    /// Normalized heights below this are water
    pub water_level: f32,

    /// Normalized heights in [water_level, sand_level) are sand
    pub sand_level: f32,

    /// Normalized heights above this are mountain
    ///
    /// Resource rolls never happen on mountain, water or sand.
    pub mountain_level: f32,

    // === STREAMING ===
    /// Chunks within this chessboard distance of a point of interest are loaded
    pub load_radius: i32,

    /// Loaded chunks farther than this from every point of interest are unloaded
    ///
    /// Must be >= load_radius; the gap is hysteresis that stops a point walking
    /// along a chunk border from thrashing load/unload.
    pub unload_radius: i32,

    // === POPULATION ===
    /// Animals spawned when a chunk's entities are generated
    pub wildlife_per_chunk: u32,

    /// Chance each spawned animal is a predator
    pub predator_chance: f32,

    /// Chance a freshly generated chunk hosts a village
    pub village_chance: f32,

    /// Villagers spawned per village
    pub villagers_per_village: u32,

    /// Village radius in cells; villagers staying home wander within it
    pub village_radius: i32,

    /// Houses placed per village
    pub houses_per_village: u32,

    // === BEHAVIOR ===
    /// Side length of the square pathfinding window centered on the actor
    ///
    /// Must be odd so the actor sits exactly in the middle. 41 gives a reach of 20.
    pub path_window: i32,

    /// Wander destinations whose path is longer than this are abandoned
    pub max_wander_steps: usize,

    /// How far from its anchor a wander destination may be picked
    pub wander_radius: i32,

    /// Consecutive blocked steps before a mover re-plans its route
    pub max_blocked_ticks: u32,

    /// Radius searched for harvestable resources and ground items
    pub resource_search_radius: i32,

    /// Fraction of max hunger below which an idle actor goes to eat
    pub hunger_threshold: f32,

    /// Chance an idle villager picks up work instead of wandering
    pub work_chance: f32,

    /// Distance a fleeing animal tries to put between itself and the threat
    pub flee_distance: i32,

    /// Attackers give up once their target is farther than this
    pub leash_distance: i32,

    /// Per-kind behavior policies
    pub policies: PolicyTable,

    // === REGROWTH ===
    /// Simulated seconds between regrowth scans
    pub regrowth_interval_secs: f32,

    /// Minimum share of predators in a chunk's wildlife, in percent
    pub min_predator_percent: f32,

    /// Minimum number of animals per loaded chunk
    pub min_wildlife_per_chunk: u32,

    /// Minimum count per resource terrain (by terrain name) per chunk
    pub resource_floors: BTreeMap<String, u32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let mut resource_floors = BTreeMap::new();
        resource_floors.insert("tree".to_string(), 12);
        resource_floors.insert("berry_bush".to_string(), 6);
        resource_floors.insert("boulder".to_string(), 2);

        Self {
            seconds_per_tick: 0.25,

            seed: 1337,
            chunk_size: 32,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            noise_scale: 0.03,
            water_level: 0.22,
            sand_level: 0.3,
            mountain_level: 0.82,

            load_radius: 1,
            unload_radius: 2,

            wildlife_per_chunk: 6,
            predator_chance: 0.2,
            village_chance: 0.15,
            villagers_per_village: 4,
            village_radius: 5,
            houses_per_village: 3,

            path_window: 41,
            max_wander_steps: 20,
            wander_radius: 8,
            max_blocked_ticks: 3,
            resource_search_radius: 16,
            hunger_threshold: 0.5,
            work_chance: 0.3,
            flee_distance: 8,
            leash_distance: 24,
            policies: PolicyTable::default(),

            regrowth_interval_secs: 60.0,
            min_predator_percent: 10.0,
            min_wildlife_per_chunk: 3,
            resource_floors,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Half the pathfinding window (the reach in each direction)
    pub fn path_half_window(&self) -> i32 {
        self.path_window / 2
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));

        if self.seconds_per_tick <= 0.0 {
            return invalid(format!("seconds_per_tick ({}) must be positive", self.seconds_per_tick));
        }
        if self.chunk_size <= 0 {
            return invalid(format!("chunk_size ({}) must be positive", self.chunk_size));
        }
        if self.octaves == 0 {
            return invalid("octaves must be at least 1".into());
        }
        if !(0.0 <= self.water_level
            && self.water_level <= self.sand_level
            && self.sand_level < self.mountain_level
            && self.mountain_level <= 1.0)
        {
            return invalid(format!(
                "height bands must satisfy 0 <= water ({}) <= sand ({}) < mountain ({}) <= 1",
                self.water_level, self.sand_level, self.mountain_level
            ));
        }
        if self.load_radius < 0 || self.unload_radius < self.load_radius {
            return invalid(format!(
                "unload_radius ({}) should be >= load_radius ({}) >= 0",
                self.unload_radius, self.load_radius
            ));
        }
        if self.path_window < 3 || self.path_window % 2 == 0 {
            return invalid(format!("path_window ({}) must be odd and >= 3", self.path_window));
        }
        if !(0.0..=100.0).contains(&self.min_predator_percent) {
            return invalid(format!(
                "min_predator_percent ({}) must be within 0..=100",
                self.min_predator_percent
            ));
        }
        if self.regrowth_interval_secs <= 0.0 {
            return invalid("regrowth_interval_secs must be positive".into());
        }
        for (name, chance) in [
            ("predator_chance", self.predator_chance),
            ("village_chance", self.village_chance),
            ("hunger_threshold", self.hunger_threshold),
            ("work_chance", self.work_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return invalid(format!("{} ({}) must be within 0..=1", name, chance));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 99
            chunk_size = 16

            [resource_floors]
            tree = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 99);
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.resource_floors.get("tree"), Some(&4));
        assert_eq!(config.max_wander_steps, 20);
    }

    #[test]
    fn test_rejects_even_window() {
        let config = SimulationConfig {
            path_window: 40,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_unordered_bands() {
        let config = SimulationConfig {
            water_level: 0.5,
            sand_level: 0.4,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unload_inside_load_radius() {
        let config = SimulationConfig {
            load_radius: 3,
            unload_radius: 2,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = SimulationConfig::from_toml_str("seed = \"not a number\"").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }
}
