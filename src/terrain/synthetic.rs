//! Closure-backed terrain for synthetic scenarios
//!
//! Lets tests and tools describe a terrain as a handful of functions of
//! (x, z) instead of implementing the full oracle.

use super::{Biome, RiverSample, TerrainOracle};

type ScalarFn = Box<dyn Fn(f32, f32) -> f32 + Send + Sync>;
type BiomeFn = Box<dyn Fn(f32, f32) -> Biome + Send + Sync>;
type BiomeHeightFn = Box<dyn Fn(Biome, f32, f32) -> f32 + Send + Sync>;

/// Terrain defined by plain functions of world position.
///
/// By default the biome height ignores the biome and the base height equals
/// the terrain height.
pub struct FnTerrain {
    height: ScalarFn,
    base_height: Option<ScalarFn>,
    biome: BiomeFn,
    biome_height: Option<BiomeHeightFn>,
    river: ScalarFn,
    seed: u64,
    available: bool,
}

impl FnTerrain {
    /// Flat riverless meadow at a constant height
    pub fn flat(height: f32) -> Self {
        Self {
            height: Box::new(move |_, _| height),
            base_height: None,
            biome: Box::new(|_, _| Biome::Meadows),
            biome_height: None,
            river: Box::new(|_, _| 0.0),
            seed: 0,
            available: true,
        }
    }

    pub fn with_height(mut self, f: impl Fn(f32, f32) -> f32 + Send + Sync + 'static) -> Self {
        self.height = Box::new(f);
        self
    }

    pub fn with_base_height(mut self, f: impl Fn(f32, f32) -> f32 + Send + Sync + 'static) -> Self {
        self.base_height = Some(Box::new(f));
        self
    }

    pub fn with_biome(mut self, f: impl Fn(f32, f32) -> Biome + Send + Sync + 'static) -> Self {
        self.biome = Box::new(f);
        self
    }

    pub fn with_biome_height(
        mut self,
        f: impl Fn(Biome, f32, f32) -> f32 + Send + Sync + 'static,
    ) -> Self {
        self.biome_height = Some(Box::new(f));
        self
    }

    pub fn with_river(mut self, f: impl Fn(f32, f32) -> f32 + Send + Sync + 'static) -> Self {
        self.river = Box::new(f);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

impl TerrainOracle for FnTerrain {
    fn height(&self, x: f32, z: f32) -> f32 {
        let biome = (self.biome)(x, z);
        self.biome_height(biome, x, z)
    }

    fn biome(&self, x: f32, z: f32) -> Biome {
        (self.biome)(x, z)
    }

    fn biome_height(&self, biome: Biome, x: f32, z: f32) -> f32 {
        match &self.biome_height {
            Some(f) => f(biome, x, z),
            None => (self.height)(x, z),
        }
    }

    fn base_height(&self, x: f32, z: f32) -> f32 {
        match &self.base_height {
            Some(f) => f(x, z),
            None => (self.height)(x, z),
        }
    }

    fn river_weight(&self, x: f32, z: f32) -> RiverSample {
        RiverSample { weight: (self.river)(x, z) }
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
