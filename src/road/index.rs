//! Spatial index of road points
//!
//! A uniform grid keyed by floor-snapped cell coordinates. Each road point is
//! stored in every cell its influence circle (half the road width) overlaps,
//! so a single-cell scan answers "how strongly does a road influence this
//! point" without false negatives.
//!
//! Mutation (insert, clear) happens during the single-threaded generation
//! pass under the write lock. Afterwards many terrain consumers read
//! concurrently; the read lock keeps them from observing a half-inserted road.
//! Each reader thread caches the last cell it scanned, so readers never
//! contend on the cache.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::IndexParams;
use crate::error::{Result, RoadError};
use crate::geometry::{smooth_step, WorldPoint, WorldRect};

use super::{RoadPoint, ZoneId};

/// Grid cell coordinate
pub type CellKey = (i32, i32);

/// Result of an influence query
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RoadInfluence {
    /// 0 = no road, 1 = fully on the road surface
    pub weight: f32,
    /// Width of the road point with the strongest influence
    pub width: f32,
    /// Influence-weighted road surface height
    pub height: f32,
}

impl RoadInfluence {
    pub const NONE: RoadInfluence = RoadInfluence { weight: 0.0, width: 0.0, height: 0.0 };

    pub fn is_none(&self) -> bool {
        self.weight <= 0.0
    }
}

/// What happened when a road was inserted
#[derive(Clone, Debug, Default)]
pub struct InsertReport {
    /// The points as stored, after overlap blending
    pub points: Vec<RoadPoint>,
    /// Points that had an existing road point within the search radius
    pub overlapping: usize,
    /// Whether the overlap fraction was high enough to merge surfaces
    pub merged: bool,
}

#[derive(Default)]
struct IndexState {
    cells: HashMap<CellKey, Arc<Vec<RoadPoint>>>,
    /// Bumped on every mutation; invalidates the query cache
    revision: u64,
    point_count: usize,
    max_half_width: f32,
}

struct CachedCell {
    index_id: u64,
    revision: u64,
    key: CellKey,
    points: Option<Arc<Vec<RoadPoint>>>,
}

static NEXT_INDEX_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Last cell scanned on this thread, tagged with its index and revision
    static LAST_CELL: RefCell<Option<CachedCell>> = const { RefCell::new(None) };
}

/// Road point grid with overlap blending and influence queries.
pub struct RoadSpatialIndex {
    id: u64,
    params: IndexParams,
    state: RwLock<IndexState>,
}

impl RoadSpatialIndex {
    pub fn new(params: IndexParams) -> Self {
        Self {
            id: NEXT_INDEX_ID.fetch_add(1, Ordering::Relaxed),
            params,
            state: RwLock::new(IndexState::default()),
        }
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    pub fn cell_of(&self, p: WorldPoint) -> CellKey {
        cell_of(p, self.params.cell_size)
    }

    /// Number of distinct road points
    pub fn point_count(&self) -> usize {
        self.state.read().point_count
    }

    pub fn cell_count(&self) -> usize {
        self.state.read().cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().point_count == 0
    }

    /// Drop every road point.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.cells.clear();
        state.point_count = 0;
        state.max_half_width = 0.0;
        state.revision += 1;
    }

    /// Register a road, blending its heights into roads already present.
    ///
    /// Every new point with existing road points within
    /// `width * overlap_search_factor` is pulled toward their
    /// distance-weighted mean height, in proportion to how close the nearest
    /// one is. When more than `overlap_threshold` of the road overlaps, the
    /// road is running along an existing one and overlapping points adopt the
    /// existing surface outright. Blend offsets fade out over
    /// `merge_feather_samples` points on either side of each overlapping run.
    ///
    /// Nothing is stored unless every point has a positive width and finite
    /// coordinates and height.
    pub fn insert_path(&self, path: &[RoadPoint], width: f32) -> Result<InsertReport> {
        if !(width > 0.0) || !width.is_finite() {
            return Err(RoadError::InvalidRoadWidth(width));
        }
        for (index, p) in path.iter().enumerate() {
            if !(p.width > 0.0) || !p.width.is_finite() {
                return Err(RoadError::InvalidRoadWidth(p.width));
            }
            if !p.position.is_finite() || !p.height.is_finite() {
                return Err(RoadError::NonFiniteRoadPoint { index });
            }
        }
        if path.is_empty() {
            return Ok(InsertReport::default());
        }

        let mut state = self.state.write();
        let radius = width * self.params.overlap_search_factor;
        let cell_size = self.params.cell_size;

        let targets: Vec<Option<(f32, f32)>> = path
            .iter()
            .map(|p| blended_target(&points_within(&state, cell_size, p.position, radius), radius))
            .collect();

        let overlapping = targets.iter().filter(|t| t.is_some()).count();
        let merged = overlapping as f32 / path.len() as f32 > self.params.overlap_threshold;

        let deltas: Vec<Option<f32>> = path
            .iter()
            .zip(&targets)
            .map(|(p, target)| {
                target.map(|(height, closeness)| {
                    let strength = if merged { 1.0 } else { closeness };
                    (height - p.height) * strength
                })
            })
            .collect();

        let offsets = feather_offsets(&deltas, self.params.merge_feather_samples);
        let points: Vec<RoadPoint> = path
            .iter()
            .zip(&offsets)
            .map(|(p, offset)| RoadPoint::new(p.position, p.width, p.height + offset))
            .collect();

        for p in &points {
            insert_point(&mut state, cell_size, *p);
        }
        state.point_count += points.len();
        state.revision += 1;

        Ok(InsertReport { points, overlapping, merged })
    }

    /// Road influence at `p`, from a scan of the single cell containing it.
    ///
    /// Weight is 1 within `inner_fraction` of a point's half-width and eases
    /// to 0 at the half-width; the strongest point wins.
    pub fn query_influence(&self, p: WorldPoint) -> RoadInfluence {
        let key = self.cell_of(p);
        let points = {
            let state = self.state.read();
            LAST_CELL.with(|cell| {
                let mut cached = cell.borrow_mut();
                match cached.as_ref() {
                    Some(c) if c.index_id == self.id && c.revision == state.revision && c.key == key => {
                        c.points.clone()
                    }
                    _ => {
                        let points = state.cells.get(&key).cloned();
                        *cached = Some(CachedCell {
                            index_id: self.id,
                            revision: state.revision,
                            key,
                            points: points.clone(),
                        });
                        points
                    }
                }
            })
        };

        let Some(points) = points else {
            return RoadInfluence::NONE;
        };

        let mut best = RoadInfluence::NONE;
        let mut weight_sum = 0.0f32;
        let mut height_sum = 0.0f32;
        for pt in points.iter() {
            let w = point_influence(pt, p, self.params.inner_fraction);
            if w <= 0.0 {
                continue;
            }
            weight_sum += w;
            height_sum += w * pt.height;
            if w > best.weight {
                best.weight = w;
                best.width = pt.width;
            }
        }
        if weight_sum > 0.0 {
            best.height = height_sum / weight_sum;
        }
        best
    }

    /// All road points whose influence circle reaches within `radius` of `p`.
    pub fn query_points_near(&self, p: WorldPoint, radius: f32) -> Vec<RoadPoint> {
        let state = self.state.read();
        let reach = radius + state.max_half_width;
        let rect = WorldRect::new(
            WorldPoint::new(p.x - reach, p.z - reach),
            WorldPoint::new(p.x + reach, p.z + reach),
        );
        let found: Vec<RoadPoint> = scan_rect(&state, self.params.cell_size, rect)
            .filter(|pt| pt.position.distance(p) <= radius + pt.half_width())
            .collect();
        found
    }

    /// All road points whose influence circle overlaps the terrain zone.
    pub fn query_points_in_zone(&self, zone: ZoneId) -> Vec<RoadPoint> {
        let state = self.state.read();
        let bounds = zone.bounds();
        let reach = state.max_half_width;
        let rect = WorldRect::new(
            WorldPoint::new(bounds.min.x - reach, bounds.min.z - reach),
            WorldPoint::new(bounds.max.x + reach, bounds.max.z + reach),
        );
        let found: Vec<RoadPoint> = scan_rect(&state, self.params.cell_size, rect)
            .filter(|pt| bounds.intersects_circle(pt.position, pt.half_width()))
            .collect();
        found
    }

    /// Snapshot of all cells sorted by key, replicas included.
    pub fn cells_sorted(&self) -> Vec<(CellKey, Vec<RoadPoint>)> {
        let state = self.state.read();
        let mut cells: Vec<(CellKey, Vec<RoadPoint>)> = state
            .cells
            .iter()
            .map(|(key, points)| (*key, points.as_ref().clone()))
            .collect();
        cells.sort_by_key(|(key, _)| *key);
        cells
    }

    /// Rebuild an index from stored cells, replicas included.
    pub fn from_cells(params: IndexParams, cells: Vec<(CellKey, Vec<RoadPoint>)>) -> Self {
        let index = Self::new(params);
        {
            let mut state = index.state.write();
            let cell_size = index.params.cell_size;
            for (key, points) in cells {
                for p in &points {
                    state.max_half_width = state.max_half_width.max(p.half_width());
                    if cell_of(p.position, cell_size) == key {
                        state.point_count += 1;
                    }
                }
                Arc::make_mut(state.cells.entry(key).or_default()).extend(points);
            }
            state.revision += 1;
        }
        index
    }
}

fn cell_of(p: WorldPoint, cell_size: f32) -> CellKey {
    ((p.x / cell_size).floor() as i32, (p.z / cell_size).floor() as i32)
}

fn insert_point(state: &mut IndexState, cell_size: f32, p: RoadPoint) {
    let hw = p.half_width();
    let (min_x, min_z) = cell_of(WorldPoint::new(p.position.x - hw, p.position.z - hw), cell_size);
    let (max_x, max_z) = cell_of(WorldPoint::new(p.position.x + hw, p.position.z + hw), cell_size);

    for cz in min_z..=max_z {
        for cx in min_x..=max_x {
            Arc::make_mut(state.cells.entry((cx, cz)).or_default()).push(p);
        }
    }
    state.max_half_width = state.max_half_width.max(hw);
}

/// Each point once: only taken from its home cell.
fn scan_rect<'a>(state: &'a IndexState, cell_size: f32, rect: WorldRect) -> impl Iterator<Item = RoadPoint> + 'a {
    let (min_x, min_z) = cell_of(rect.min, cell_size);
    let (max_x, max_z) = cell_of(rect.max, cell_size);

    (min_z..=max_z)
        .flat_map(move |cz| (min_x..=max_x).map(move |cx| (cx, cz)))
        .filter_map(move |key| state.cells.get(&key).map(|points| (key, points)))
        .flat_map(move |(key, points)| {
            points
                .iter()
                .filter(move |pt| cell_of(pt.position, cell_size) == key)
                .copied()
        })
}

fn points_within(state: &IndexState, cell_size: f32, p: WorldPoint, radius: f32) -> Vec<(f32, RoadPoint)> {
    let rect = WorldRect::new(
        WorldPoint::new(p.x - radius, p.z - radius),
        WorldPoint::new(p.x + radius, p.z + radius),
    );
    scan_rect(state, cell_size, rect)
        .map(|pt| (pt.position.distance(p), pt))
        .filter(|(d, _)| *d <= radius)
        .collect()
}

/// Distance-weighted mean height of `neighbors` and the closeness of the
/// nearest one (1 at zero distance, 0 at the search radius).
fn blended_target(neighbors: &[(f32, RoadPoint)], radius: f32) -> Option<(f32, f32)> {
    if neighbors.is_empty() {
        return None;
    }
    let mut weight_sum = 0.0f32;
    let mut height_sum = 0.0f32;
    let mut closeness = 0.0f32;
    for (d, pt) in neighbors {
        let w = (1.0 - d / radius).max(1e-3);
        weight_sum += w;
        height_sum += w * pt.height;
        closeness = closeness.max(w);
    }
    Some((height_sum / weight_sum, closeness))
}

/// Spread blend offsets to nearby non-overlapping points with a linear fade.
fn feather_offsets(deltas: &[Option<f32>], feather: usize) -> Vec<f32> {
    let n = deltas.len();
    (0..n)
        .map(|i| {
            if let Some(d) = deltas[i] {
                return d;
            }
            let lo = i.saturating_sub(feather);
            let hi = (i + feather).min(n - 1);
            let mut best: Option<(usize, f32)> = None;
            for (j, delta) in deltas.iter().enumerate().take(hi + 1).skip(lo) {
                if let Some(d) = delta {
                    let k = i.abs_diff(j);
                    if best.map_or(true, |(bk, _)| k < bk) {
                        best = Some((k, *d));
                    }
                }
            }
            match best {
                Some((k, d)) => d * (1.0 - k as f32 / (feather + 1) as f32),
                None => 0.0,
            }
        })
        .collect()
}

fn point_influence(pt: &RoadPoint, p: WorldPoint, inner_fraction: f32) -> f32 {
    let hw = pt.half_width();
    let inner = hw * inner_fraction;
    let d = pt.position.distance(p);
    if d <= inner {
        1.0
    } else if d >= hw {
        0.0
    } else {
        1.0 - smooth_step(inner, hw, d)
    }
}
