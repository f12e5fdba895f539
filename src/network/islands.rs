//! Landmass detection
//!
//! Rasterizes the bounded world into a land/water grid from the oracle's
//! base height, then groups land cells into landmasses with a 4-connected
//! flood fill. Small components (rocks, sandbars) are discarded.

use std::collections::VecDeque;

use rayon::prelude::*;
use tracing::debug;

use crate::config::IslandParams;
use crate::geometry::{WorldPoint, WorldRect};
use crate::grid::Grid;
use crate::terrain::TerrainOracle;

/// A connected area of land
#[derive(Clone, Debug, PartialEq)]
pub struct Landmass {
    /// Rank by area, 0 = largest
    pub id: usize,
    /// Centroid snapped to the nearest land cell centre
    pub center: WorldPoint,
    /// World-space extent of the landmass cells
    pub bounds: WorldRect,
    pub cell_count: usize,
    /// Approximate area in square world units
    pub area: f32,
    /// Land cell centre closest to the bounding box boundary; road anchor
    /// when no spawn location lies on this landmass
    pub edge_point: WorldPoint,
}

/// Result of island detection: the landmasses and the cell labels behind
/// them.
#[derive(Clone, Debug)]
pub struct IslandMap {
    pub landmasses: Vec<Landmass>,
    labels: Grid<Option<usize>>,
    cell_size: f32,
    world_radius: f32,
}

impl IslandMap {
    fn cell_of(&self, p: WorldPoint) -> (i64, i64) {
        (
            ((p.x + self.world_radius) / self.cell_size).floor() as i64,
            ((p.z + self.world_radius) / self.cell_size).floor() as i64,
        )
    }

    fn label(&self, x: i64, y: i64) -> Option<usize> {
        if self.labels.in_bounds(x, y) {
            *self.labels.get(x as usize, y as usize)
        } else {
            None
        }
    }

    /// Landmass containing `p`.
    ///
    /// Points on a water cell next to land (a location on the shoreline)
    /// resolve to the first landmass found in the surrounding ring.
    pub fn landmass_at(&self, p: WorldPoint) -> Option<usize> {
        if !p.is_finite() {
            return None;
        }
        let (cx, cy) = self.cell_of(p);
        if let Some(id) = self.label(cx, cy) {
            return Some(id);
        }
        (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (cx + dx, cy + dy)))
            .find_map(|(x, y)| self.label(x, y))
    }

    pub fn is_land(&self, p: WorldPoint) -> bool {
        let (cx, cy) = self.cell_of(p);
        self.label(cx, cy).is_some()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

/// World position of the centre of raster cell (i, j).
fn cell_center(i: usize, j: usize, params: &IslandParams) -> WorldPoint {
    WorldPoint::new(
        -params.world_radius + (i as f32 + 0.5) * params.cell_size,
        -params.world_radius + (j as f32 + 0.5) * params.cell_size,
    )
}

/// Sample the land/water raster. Cells outside the world circle are water.
fn land_mask<T: TerrainOracle + ?Sized>(oracle: &T, params: &IslandParams) -> Grid<bool> {
    let size = ((2.0 * params.world_radius) / params.cell_size).ceil().max(0.0) as usize;
    let data: Vec<bool> = (0..size * size)
        .into_par_iter()
        .map(|idx| {
            let p = cell_center(idx % size, idx / size, params);
            p.length() <= params.world_radius && oracle.base_height(p.x, p.z) >= params.water_level
        })
        .collect();
    Grid::from_vec(size, size, data).unwrap_or_else(|| Grid::new_with(0, 0, false))
}

/// Detect landmasses, largest first.
pub fn detect_islands<T: TerrainOracle + ?Sized>(oracle: &T, params: &IslandParams) -> IslandMap {
    let land = land_mask(oracle, params);
    let (width, height) = (land.width, land.height);

    let mut visited = Grid::new_with(width, height, false);
    let mut components: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut dropped = 0usize;

    for y in 0..height {
        for x in 0..width {
            if !*land.get(x, y) || *visited.get(x, y) {
                continue;
            }

            let mut cells = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back((x, y));
            visited.set(x, y, true);

            while let Some((cx, cy)) = queue.pop_front() {
                cells.push((cx, cy));
                for (nx, ny) in land.neighbors(cx, cy) {
                    if *land.get(nx, ny) && !*visited.get(nx, ny) {
                        visited.set(nx, ny, true);
                        queue.push_back((nx, ny));
                    }
                }
            }

            if cells.len() >= params.min_cells {
                components.push(cells);
            } else {
                dropped += 1;
            }
        }
    }

    // Stable: equal areas keep scan order
    components.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut labels = Grid::new_with(width, height, None);
    let landmasses: Vec<Landmass> = components
        .iter()
        .enumerate()
        .map(|(id, cells)| {
            for &(x, y) in cells {
                labels.set(x, y, Some(id));
            }
            summarize(id, cells, params)
        })
        .collect();

    debug!(landmasses = landmasses.len(), dropped, "island detection done");

    IslandMap {
        landmasses,
        labels,
        cell_size: params.cell_size,
        world_radius: params.world_radius,
    }
}

fn summarize(id: usize, cells: &[(usize, usize)], params: &IslandParams) -> Landmass {
    let centers: Vec<WorldPoint> = cells.iter().map(|&(x, y)| cell_center(x, y, params)).collect();
    let n = centers.len() as f32;
    let half = params.cell_size * 0.5;

    let mut min = WorldPoint::new(f32::MAX, f32::MAX);
    let mut max = WorldPoint::new(f32::MIN, f32::MIN);
    let mut sum = (0.0f64, 0.0f64);
    for c in &centers {
        min.x = min.x.min(c.x - half);
        min.z = min.z.min(c.z - half);
        max.x = max.x.max(c.x + half);
        max.z = max.z.max(c.z + half);
        sum.0 += c.x as f64;
        sum.1 += c.z as f64;
    }
    let bounds = WorldRect::new(min, max);
    let centroid = WorldPoint::new((sum.0 / n as f64) as f32, (sum.1 / n as f64) as f32);

    let center = nearest_by(&centers, |c| c.distance_sq(centroid));
    let edge_point = nearest_by(&centers, |c| bounds.distance_to_boundary(*c));

    Landmass {
        id,
        center,
        bounds,
        cell_count: cells.len(),
        area: n * params.cell_size * params.cell_size,
        edge_point,
    }
}

/// First point minimizing `key`.
fn nearest_by(points: &[WorldPoint], key: impl Fn(&WorldPoint) -> f32) -> WorldPoint {
    let mut best = points[0];
    let mut best_key = key(&best);
    for p in &points[1..] {
        let k = key(p);
        if k < best_key {
            best = *p;
            best_key = k;
        }
    }
    best
}
