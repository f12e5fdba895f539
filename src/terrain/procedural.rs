//! Noise-based procedural terrain
//!
//! A self-contained terrain oracle for tools and integration tests: a round
//! continent with an fBm coastline, biome rings perturbed by noise, per-biome
//! relief and a ridged river network. Heights are relative to a sea level of 0.

use noise::{NoiseFn, Perlin, Seedable};

use super::{Biome, RiverSample, TerrainOracle};
use crate::geometry::smooth_step;

/// Heights below this are water
pub const SEA_LEVEL: f32 = 0.0;

/// Height carved out of the terrain at a river centre
const RIVER_DEPTH: f32 = 6.0;

/// Base height above which land is always mountain
const MOUNTAIN_BASE_HEIGHT: f32 = 55.0;

/// Procedural terrain built from seeded Perlin noise.
pub struct NoiseTerrain {
    seed: u64,
    world_radius: f32,
    continent_noise: Perlin,
    biome_noise: Perlin,
    detail_noise: Perlin,
    ridge_noise: Perlin,
    river_noise: Perlin,
}

impl NoiseTerrain {
    pub fn new(seed: u64, world_radius: f32) -> Self {
        Self {
            seed,
            world_radius,
            continent_noise: Perlin::new(1).set_seed(seed as u32),
            biome_noise: Perlin::new(1).set_seed((seed as u32).wrapping_add(1111)),
            detail_noise: Perlin::new(1).set_seed((seed as u32).wrapping_add(2222)),
            ridge_noise: Perlin::new(1).set_seed((seed as u32).wrapping_add(3333)),
            river_noise: Perlin::new(1).set_seed((seed as u32).wrapping_add(4444)),
        }
    }

    pub fn world_radius(&self) -> f32 {
        self.world_radius
    }

    fn detail(&self, x: f32, z: f32) -> f32 {
        fbm(&self.detail_noise, x as f64 / 300.0, z as f64 / 300.0, 3, 0.5, 2.0) as f32
    }

    fn ridge(&self, x: f32, z: f32) -> f32 {
        1.0 - (self.ridge_noise.get([x as f64 / 800.0, z as f64 / 800.0]) as f32).abs()
    }

    fn river_strength(&self, x: f32, z: f32) -> f32 {
        let n = self.river_noise.get([x as f64 / 2000.0, z as f64 / 2000.0]) as f32;
        smooth_step(0.96, 0.99, 1.0 - n.abs())
    }
}

impl TerrainOracle for NoiseTerrain {
    fn height(&self, x: f32, z: f32) -> f32 {
        self.biome_height(self.biome(x, z), x, z)
    }

    fn biome(&self, x: f32, z: f32) -> Biome {
        let base = self.base_height(x, z);
        if base < SEA_LEVEL {
            return Biome::Ocean;
        }
        if base > MOUNTAIN_BASE_HEIGHT {
            return Biome::Mountain;
        }

        let variation = self.biome_noise.get([x as f64 / 2500.0, z as f64 / 2500.0]) as f32;
        let ring = (x * x + z * z).sqrt() / self.world_radius + 0.08 * variation;

        if ring < 0.15 {
            Biome::Meadows
        } else if ring < 0.35 {
            if base < 8.0 { Biome::Swamp } else { Biome::BlackForest }
        } else if ring < 0.55 {
            if variation > 0.0 { Biome::Plains } else { Biome::Mistlands }
        } else if ring < 0.8 {
            Biome::Mistlands
        } else if z < 0.0 {
            Biome::AshLands
        } else {
            Biome::DeepNorth
        }
    }

    fn biome_height(&self, biome: Biome, x: f32, z: f32) -> f32 {
        let base = self.base_height(x, z);
        let detail = self.detail(x, z);

        let h = match biome {
            Biome::Meadows => base + 4.0 * detail,
            Biome::BlackForest => base + 10.0 * detail + 4.0,
            Biome::Swamp => base.min(6.0) * 0.5 - 0.5 + 1.5 * detail,
            Biome::Mountain => base + 50.0 + 40.0 * self.ridge(x, z),
            Biome::Plains => base + 3.0 * detail + 2.0,
            Biome::Mistlands => base + 18.0 * detail.abs() + 5.0,
            Biome::AshLands => base + 8.0 * detail,
            Biome::DeepNorth => base + 12.0 * detail + 10.0,
            Biome::Ocean => base,
        };

        if base > SEA_LEVEL {
            h - RIVER_DEPTH * self.river_strength(x, z)
        } else {
            h
        }
    }

    fn base_height(&self, x: f32, z: f32) -> f32 {
        let r = (x * x + z * z).sqrt() / self.world_radius;
        if r >= 1.0 {
            return -100.0;
        }
        let continent = fbm(&self.continent_noise, x as f64 / 3000.0, z as f64 / 3000.0, 5, 0.5, 2.0) as f32;
        30.0 + 60.0 * continent - 80.0 * r.powi(4)
    }

    fn river_weight(&self, x: f32, z: f32) -> RiverSample {
        if self.base_height(x, z) <= SEA_LEVEL {
            return RiverSample::NONE;
        }
        let weight = self.river_strength(x, z);
        if weight <= 0.0 {
            return RiverSample::NONE;
        }
        RiverSample { weight }
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

/// Fractional Brownian Motion noise
fn fbm(noise: &Perlin, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += amplitude * noise.get([x * frequency, y * frequency]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    total / max_value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_world_is_ocean() {
        let terrain = NoiseTerrain::new(7, 4000.0);
        assert_eq!(terrain.biome(5000.0, 0.0), Biome::Ocean);
        assert!(terrain.base_height(0.0, 4500.0) < SEA_LEVEL);
        assert_eq!(terrain.river_weight(5000.0, 0.0), RiverSample::NONE);
    }

    #[test]
    fn test_same_seed_same_terrain() {
        let a = NoiseTerrain::new(99, 4000.0);
        let b = NoiseTerrain::new(99, 4000.0);
        for i in 0..20 {
            let x = i as f32 * 137.0 - 1200.0;
            let z = i as f32 * -71.0 + 300.0;
            assert_eq!(a.height(x, z), b.height(x, z));
            assert_eq!(a.biome(x, z), b.biome(x, z));
        }
    }
}
