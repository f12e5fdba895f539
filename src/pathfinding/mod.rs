//! Road pathfinding using A*
//!
//! Searches an implicit grid laid over the terrain oracle. Nodes sit on the
//! lattice points `(i * cell_size, j * cell_size)`; a world point belongs to
//! the node of its floor-snapped cell. Moves use a 16-direction set (4
//! cardinal, 4 diagonal, 8 knight moves) so diagonal routes do not
//! staircase.

pub mod cost;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::config::PathfinderParams;
use crate::error::{Result, RoadError};
use crate::geometry::WorldPoint;
use crate::terrain::TerrainOracle;

pub use cost::{terrain_variance, EdgeCostModel};

/// Integer search grid coordinate
pub type GridCell = (i32, i32);

/// 4 cardinal, 4 diagonal and 8 knight moves
pub const MOVES: [(i32, i32); 16] = [
    (1, 0), (0, 1), (-1, 0), (0, -1),
    (1, 1), (1, -1), (-1, 1), (-1, -1),
    (2, 1), (1, 2), (-1, 2), (-2, 1),
    (-2, -1), (-1, -2), (1, -2), (2, -1),
];

/// Entry of the open set, ordered by f-cost then position
#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f: f32,
    cell: GridCell,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f.total_cmp(&other.f).then_with(|| self.cell.cmp(&other.cell))
    }
}

/// A* road pathfinder over a terrain oracle.
pub struct Pathfinder<'a, T: TerrainOracle + ?Sized> {
    oracle: &'a T,
    params: &'a PathfinderParams,
}

impl<'a, T: TerrainOracle + ?Sized> Pathfinder<'a, T> {
    pub fn new(oracle: &'a T, params: &'a PathfinderParams) -> Self {
        Self { oracle, params }
    }

    pub fn cell_of(&self, p: WorldPoint) -> GridCell {
        (
            (p.x / self.params.cell_size).floor() as i32,
            (p.z / self.params.cell_size).floor() as i32,
        )
    }

    /// Find a waypoint polyline from `start` to `end`, both inclusive.
    ///
    /// Interior waypoints are search lattice points; the first and last
    /// points are exactly `start` and `end`.
    pub fn find_path(&self, start: WorldPoint, end: WorldPoint) -> Result<Vec<WorldPoint>> {
        if !start.is_finite() || !end.is_finite() {
            return Err(RoadError::PathNotFound);
        }

        let start_cell = self.cell_of(start);
        let goal_cell = self.cell_of(end);
        if start_cell == goal_cell {
            return Ok(vec![start, end]);
        }

        let model = EdgeCostModel::new(self.oracle, self.params);
        let goal_pos = model.cell_position(goal_cell);
        let heuristic = |cell: GridCell| model.cell_position(cell).distance(goal_pos) * self.params.base_cost;
        let max_radius_sq = self.params.max_search_radius * self.params.max_search_radius;

        let mut open = BTreeSet::new();
        let mut g_score: HashMap<GridCell, f32> = HashMap::new();
        let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
        let mut closed: HashSet<GridCell> = HashSet::new();

        g_score.insert(start_cell, 0.0);
        open.insert(OpenNode { f: heuristic(start_cell), cell: start_cell });

        let mut iterations = 0usize;
        while let Some(current) = open.pop_first() {
            iterations += 1;
            if iterations > self.params.max_iterations {
                debug!(iterations, "pathfinder gave up");
                return Err(RoadError::IterationLimitReached { iterations: self.params.max_iterations });
            }

            let cell = current.cell;
            if cell == goal_cell {
                debug!(iterations, "pathfinder reached goal");
                return Ok(self.reconstruct(&model, &came_from, cell, start, end));
            }
            closed.insert(cell);

            let g = g_score.get(&cell).copied().unwrap_or(f32::INFINITY);
            for (dx, dy) in MOVES {
                let next = (cell.0 + dx, cell.1 + dy);
                if closed.contains(&next) {
                    continue;
                }
                if model.cell_position(next).distance_sq(WorldPoint::ORIGIN) > max_radius_sq {
                    continue;
                }

                let step = model.cost(cell, next);
                if !step.is_finite() {
                    continue;
                }

                let tentative = g + step;
                let previous = g_score.get(&next).copied().unwrap_or(f32::INFINITY);
                if tentative < previous {
                    if previous.is_finite() {
                        open.remove(&OpenNode { f: previous + heuristic(next), cell: next });
                    }
                    g_score.insert(next, tentative);
                    came_from.insert(next, cell);
                    open.insert(OpenNode { f: tentative + heuristic(next), cell: next });
                }
            }
        }

        debug!(iterations, "pathfinder exhausted open set");
        Err(RoadError::PathNotFound)
    }

    fn reconstruct(
        &self,
        model: &EdgeCostModel<'_, T>,
        came_from: &HashMap<GridCell, GridCell>,
        goal: GridCell,
        start: WorldPoint,
        end: WorldPoint,
    ) -> Vec<WorldPoint> {
        let mut cells = vec![goal];
        let mut current = goal;
        while let Some(&prev) = came_from.get(&current) {
            cells.push(prev);
            current = prev;
        }
        cells.reverse();

        let mut path: Vec<WorldPoint> = cells.into_iter().map(|c| model.cell_position(c)).collect();
        if let Some(first) = path.first_mut() {
            *first = start;
        }
        if let Some(last) = path.last_mut() {
            *last = end;
        }
        path
    }
}
