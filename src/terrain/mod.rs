//! Terrain oracle interface
//!
//! The host world answers height, biome and river queries through
//! [`TerrainOracle`]. Everything in the road pipeline treats it as a black
//! box: the pathfinder samples it for edge costs, the densifier for road
//! heights, the island detector for the land/water raster.

pub mod blend;
pub mod procedural;
pub mod synthetic;

pub use blend::{blended_height, BLEND_TILE_SIZE};
pub use procedural::NoiseTerrain;
pub use synthetic::FnTerrain;

/// Biomes reported by the terrain oracle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum Biome {
    #[default]
    Meadows,
    BlackForest,
    Swamp,
    Mountain,
    Plains,
    Mistlands,
    AshLands,
    DeepNorth,
    Ocean,
}

impl Biome {
    pub fn is_mountain(&self) -> bool {
        matches!(self, Biome::Mountain)
    }
}

/// River field sample at a world point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RiverSample {
    /// 0 = no river, 1 = river centre
    pub weight: f32,
}

impl RiverSample {
    pub const NONE: RiverSample = RiverSample { weight: 0.0 };
}

/// Capability set the host environment provides for terrain queries.
///
/// Implementations must be safe to share across threads; the island
/// detector samples the raster in parallel.
pub trait TerrainOracle: Send + Sync {
    /// Raw terrain height, not blended across biome seams.
    fn height(&self, x: f32, z: f32) -> f32;

    fn biome(&self, x: f32, z: f32) -> Biome;

    /// Height at this point if `biome` were authoritative here.
    fn biome_height(&self, biome: Biome, x: f32, z: f32) -> f32;

    /// Coarse height used for land/water classification.
    fn base_height(&self, x: f32, z: f32) -> f32;

    fn river_weight(&self, x: f32, z: f32) -> RiverSample;

    /// World seed
    fn seed(&self) -> u64;

    /// Whether the oracle can answer queries yet.
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: TerrainOracle + ?Sized> TerrainOracle for &T {
    fn height(&self, x: f32, z: f32) -> f32 {
        (**self).height(x, z)
    }

    fn biome(&self, x: f32, z: f32) -> Biome {
        (**self).biome(x, z)
    }

    fn biome_height(&self, biome: Biome, x: f32, z: f32) -> f32 {
        (**self).biome_height(biome, x, z)
    }

    fn base_height(&self, x: f32, z: f32) -> f32 {
        (**self).base_height(x, z)
    }

    fn river_weight(&self, x: f32, z: f32) -> RiverSample {
        (**self).river_weight(x, z)
    }

    fn seed(&self) -> u64 {
        (**self).seed()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
