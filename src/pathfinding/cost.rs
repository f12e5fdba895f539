//! Edge cost model for road pathfinding
//!
//! Prices a move between two neighbouring search nodes from terrain
//! queries. Impassable edges cost `f32::INFINITY` and are never expanded.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::config::PathfinderParams;
use crate::geometry::WorldPoint;
use crate::terrain::TerrainOracle;

use super::GridCell;

/// Terrain-aware edge costs with per-cell memoization.
///
/// One model lives for one search; the caches are not shared between
/// searches, so the model needs no synchronization.
pub struct EdgeCostModel<'a, T: TerrainOracle + ?Sized> {
    oracle: &'a T,
    params: &'a PathfinderParams,
    heights: RefCell<HashMap<GridCell, f32>>,
    rough: RefCell<HashMap<GridCell, bool>>,
}

impl<'a, T: TerrainOracle + ?Sized> EdgeCostModel<'a, T> {
    pub fn new(oracle: &'a T, params: &'a PathfinderParams) -> Self {
        Self {
            oracle,
            params,
            heights: RefCell::new(HashMap::new()),
            rough: RefCell::new(HashMap::new()),
        }
    }

    pub fn cell_position(&self, cell: GridCell) -> WorldPoint {
        WorldPoint::new(cell.0 as f32 * self.params.cell_size, cell.1 as f32 * self.params.cell_size)
    }

    fn height_at(&self, cell: GridCell) -> f32 {
        if let Some(&h) = self.heights.borrow().get(&cell) {
            return h;
        }
        let p = self.cell_position(cell);
        let h = self.oracle.height(p.x, p.z);
        self.heights.borrow_mut().insert(cell, h);
        h
    }

    fn is_rough(&self, cell: GridCell) -> bool {
        if let Some(&rough) = self.rough.borrow().get(&cell) {
            return rough;
        }
        let p = self.cell_position(cell);
        let rough = terrain_variance(
            self.oracle,
            p,
            self.params.roughness_radius,
            self.params.roughness_samples,
        ) > self.params.roughness_threshold;
        self.rough.borrow_mut().insert(cell, rough);
        rough
    }

    fn river_blocked(&self, p: WorldPoint) -> bool {
        self.oracle.river_weight(p.x, p.z).weight > self.params.river_impassable_weight
    }

    /// Cost of moving from `from` to the neighbouring node `to`.
    pub fn cost(&self, from: GridCell, to: GridCell) -> f32 {
        let params = self.params;
        let from_pos = self.cell_position(from);
        let to_pos = self.cell_position(to);
        let distance = from_pos.distance(to_pos);
        let travel = params.base_cost * distance;

        let river = self.oracle.river_weight(to_pos.x, to_pos.z);
        if river.weight > params.river_impassable_weight {
            return f32::INFINITY;
        }
        // Long moves must not hop over a thin river
        let long_move = (to.0 - from.0).abs() + (to.1 - from.1).abs() > 1;
        if long_move && self.river_blocked(from_pos.lerp(to_pos, 0.5)) {
            return f32::INFINITY;
        }

        let from_h = self.height_at(from);
        let to_h = self.height_at(to);
        let grade = (to_h - from_h).abs() / distance.max(f32::EPSILON);

        if self.oracle.biome(to_pos.x, to_pos.z).is_mountain() && grade > params.mountain_max_grade {
            return f32::INFINITY;
        }

        if to_h < params.water_level - params.deep_water_depth {
            return params.deep_water_penalty + travel;
        }
        if to_h < params.water_level {
            return params.shallow_water_penalty + travel;
        }

        if self.is_rough(to) {
            return params.rough_terrain_penalty + travel;
        }

        let mut cost = travel + grade * grade * params.slope_multiplier;
        if river.weight > 0.0 {
            cost += params.water_penalty * river.weight;
        }
        cost
    }
}

/// Max - min height on a ring of `samples` points around `center`.
pub fn terrain_variance<T: TerrainOracle + ?Sized>(
    oracle: &T,
    center: WorldPoint,
    radius: f32,
    samples: usize,
) -> f32 {
    if samples == 0 {
        return 0.0;
    }
    let mut min_h = f32::MAX;
    let mut max_h = f32::MIN;
    for i in 0..samples {
        let angle = std::f32::consts::TAU * i as f32 / samples as f32;
        let h = oracle.height(center.x + angle.cos() * radius, center.z + angle.sin() * radius);
        min_h = min_h.min(h);
        max_h = max_h.max(h);
    }
    max_h - min_h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{Biome, FnTerrain};

    #[test]
    fn test_flat_cost_is_distance() {
        let terrain = FnTerrain::flat(10.0);
        let params = PathfinderParams::default();
        let model = EdgeCostModel::new(&terrain, &params);
        assert_eq!(model.cost((0, 0), (1, 0)), 8.0);
        assert!((model.cost((0, 0), (2, 1)) - 8.0 * 5f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_slope_penalty_grows_with_grade() {
        let terrain = FnTerrain::flat(0.0).with_height(|x, _| x * 0.1);
        let params = PathfinderParams::default();
        let model = EdgeCostModel::new(&terrain, &params);
        let along = model.cost((0, 0), (0, 1));
        let uphill = model.cost((0, 0), (1, 0));
        assert_eq!(along, 8.0);
        assert!((uphill - (8.0 + 0.01 * 400.0)).abs() < 1e-3);
    }

    #[test]
    fn test_impassable_river_blocks() {
        let terrain = FnTerrain::flat(5.0).with_river(|x, _| if x > 10.0 { 1.0 } else { 0.0 });
        let params = PathfinderParams::default();
        let model = EdgeCostModel::new(&terrain, &params);
        assert!(model.cost((0, 0), (2, 0)).is_infinite());
        assert!(model.cost((0, 0), (1, 0)).is_finite());
    }

    #[test]
    fn test_fordable_river_is_penalized() {
        let terrain = FnTerrain::flat(5.0).with_river(|_, _| 0.5);
        let params = PathfinderParams::default();
        let model = EdgeCostModel::new(&terrain, &params);
        assert_eq!(model.cost((0, 0), (1, 0)), 8.0 + 200.0 * 0.5);
    }

    #[test]
    fn test_deep_water_costs_more_than_shallow() {
        let terrain = FnTerrain::flat(0.0).with_height(|x, _| if x < 12.0 { -2.0 } else { -10.0 });
        let params = PathfinderParams::default();
        let model = EdgeCostModel::new(&terrain, &params);
        let shallow = model.cost((0, 0), (1, 0));
        let deep = model.cost((0, 0), (2, 0));
        assert!(shallow >= params.shallow_water_penalty);
        assert!(deep > shallow);
    }

    #[test]
    fn test_steep_mountain_blocked() {
        let terrain = FnTerrain::flat(0.0)
            .with_height(|x, _| x * 0.5)
            .with_biome(|_, _| Biome::Mountain);
        let mut params = PathfinderParams::default();
        params.roughness_threshold = f32::MAX;
        let model = EdgeCostModel::new(&terrain, &params);
        assert!(model.cost((0, 0), (1, 0)).is_infinite());
        assert!(model.cost((0, 0), (0, 1)).is_finite());
    }

    #[test]
    fn test_rough_terrain_penalty() {
        let terrain = FnTerrain::flat(0.0).with_height(|x, _| if x > 10.0 { 20.0 } else { 0.0 });
        let params = PathfinderParams::default();
        assert_eq!(terrain_variance(&terrain, WorldPoint::new(8.0, 0.0), 6.0, 8), 20.0);

        let model = EdgeCostModel::new(&terrain, &params);
        let cost = model.cost((0, 0), (1, 0));
        assert_eq!(cost, params.rough_terrain_penalty + 8.0);
    }
}
