//! Biome-blended height sampling
//!
//! The renderer builds terrain per tile by sampling the biome at the four
//! tile corners and blending the four biome heights bilinearly, with a
//! smooth step applied to the interpolation parameter. A plain per-point
//! biome lookup jumps at biome seams where the rendered terrain does not,
//! so road heights must be sampled with the same blend.

use super::TerrainOracle;
use crate::geometry::smooth_step;

/// Tile granularity of the terrain renderer
pub const BLEND_TILE_SIZE: f32 = 64.0;

/// Height at `(x, z)` blended across the four corner biomes of its tile.
pub fn blended_height<T: TerrainOracle + ?Sized>(oracle: &T, x: f32, z: f32, tile_size: f32) -> f32 {
    let x0 = (x / tile_size).floor() * tile_size;
    let z0 = (z / tile_size).floor() * tile_size;
    let x1 = x0 + tile_size;
    let z1 = z0 + tile_size;

    let b00 = oracle.biome(x0, z0);
    let b10 = oracle.biome(x1, z0);
    let b01 = oracle.biome(x0, z1);
    let b11 = oracle.biome(x1, z1);

    if b00 == b10 && b00 == b01 && b00 == b11 {
        return oracle.biome_height(b00, x, z);
    }

    let tx = smooth_step(0.0, 1.0, (x - x0) / tile_size);
    let tz = smooth_step(0.0, 1.0, (z - z0) / tile_size);

    let h00 = oracle.biome_height(b00, x, z);
    let h10 = oracle.biome_height(b10, x, z);
    let h01 = oracle.biome_height(b01, x, z);
    let h11 = oracle.biome_height(b11, x, z);

    let top = h00 + (h10 - h00) * tx;
    let bottom = h01 + (h11 - h01) * tx;
    top + (bottom - top) * tz
}
