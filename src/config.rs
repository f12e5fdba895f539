//! Road generation parameters and configuration
//!
//! Every stage has its own parameter struct with tuned defaults. The whole
//! set is grouped in [`RoadConfig`], which can be loaded from JSON; missing
//! fields fall back to the defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadError};

/// Cost model and search limits for the A* pathfinder
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderParams {
    /// World units per search grid cell
    pub cell_size: f32,

    /// Cost per world unit travelled; the heuristic is scaled by it too
    pub base_cost: f32,

    /// Multiplier on the squared grade (rise over run) of an edge
    pub slope_multiplier: f32,

    /// River weight above which an edge is impassable
    pub river_impassable_weight: f32,

    /// Cost per unit of river weight for fordable rivers
    pub water_penalty: f32,

    /// Heights below this are water
    pub water_level: f32,

    /// Depth below `water_level` where shallow water becomes deep water
    pub deep_water_depth: f32,

    /// Fixed cost for entering shallow water
    pub shallow_water_penalty: f32,

    /// Fixed cost for entering deep water
    pub deep_water_penalty: f32,

    /// Radius of the ring sampled for terrain roughness
    pub roughness_radius: f32,

    /// Number of samples on the roughness ring
    pub roughness_samples: usize,

    /// Max - min ring height above which terrain counts as rough
    pub roughness_threshold: f32,

    /// Fixed cost for entering rough terrain
    pub rough_terrain_penalty: f32,

    /// Grade above which mountain edges are blocked
    pub mountain_max_grade: f32,

    /// Maximum number of nodes expanded before giving up
    pub max_iterations: usize,

    /// Nodes farther than this from the world origin are never expanded
    pub max_search_radius: f32,
}

impl Default for PathfinderParams {
    fn default() -> Self {
        Self {
            cell_size: 8.0,
            base_cost: 1.0,
            slope_multiplier: 400.0,
            river_impassable_weight: 0.6,
            water_penalty: 200.0,
            water_level: 0.0,
            deep_water_depth: 4.0,
            shallow_water_penalty: 1000.0,
            deep_water_penalty: 5000.0,
            roughness_radius: 6.0,
            roughness_samples: 8,
            roughness_threshold: 6.0,
            rough_terrain_penalty: 500.0,
            mountain_max_grade: 0.35,
            max_iterations: 20_000,
            max_search_radius: 10_500.0,
        }
    }
}

/// Densification and height smoothing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Dense sample spacing as a fraction of the road width
    pub spacing_fraction: f32,

    /// Centered moving-average window (samples, odd)
    pub height_window: usize,

    /// Spline evaluations per waypoint segment before arc-length resampling
    pub spline_subdivisions: usize,

    /// Tile size of the biome height blend
    pub blend_tile_size: f32,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            spacing_fraction: 0.25,
            height_window: 41,
            spline_subdivisions: 16,
            blend_tile_size: crate::terrain::BLEND_TILE_SIZE,
        }
    }
}

/// Spatial road index layout and overlap blending
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexParams {
    /// World units per index cell
    pub cell_size: f32,

    /// Fraction of the half-width with full influence
    pub inner_fraction: f32,

    /// Overlap search radius as a multiple of the road width
    pub overlap_search_factor: f32,

    /// Fraction of overlapping points above which a road is merged into
    /// the existing surface rather than just crossing it
    pub overlap_threshold: f32,

    /// Samples over which a merge fades in and out along the new road
    pub merge_feather_samples: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            cell_size: 16.0,
            inner_fraction: 0.6,
            overlap_search_factor: 1.5,
            overlap_threshold: 0.3,
            merge_feather_samples: 8,
        }
    }
}

/// Land/water raster used for island detection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandParams {
    /// World units per raster cell
    pub cell_size: f32,

    /// Components smaller than this are discarded
    pub min_cells: usize,

    /// Radius of the rasterized world
    pub world_radius: f32,

    /// Base heights at or above this are land
    pub water_level: f32,
}

impl Default for IslandParams {
    fn default() -> Self {
        Self {
            cell_size: 64.0,
            min_cells: 10,
            world_radius: 10_000.0,
            water_level: 0.0,
        }
    }
}

/// Destination down-selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyParams {
    /// Destination budget per square kilometre of landmass
    pub destinations_per_sq_km: f32,

    pub min_destinations: usize,

    pub max_destinations: usize,

    /// Candidates at or above this priority survive percentage sampling
    pub always_keep_priority: i32,
}

impl Default for TopologyParams {
    fn default() -> Self {
        Self {
            destinations_per_sq_km: 0.25,
            min_destinations: 2,
            max_destinations: 48,
            always_keep_priority: 80,
        }
    }
}

/// Full configuration for one generation pass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    /// Nominal road width in world units
    pub road_width: f32,

    /// Percentage (0-100) of candidate destinations kept per landmass
    pub destination_percentage: u32,

    /// Extra location names to connect besides the built-in table
    pub custom_locations: Vec<String>,

    /// Location that anchors the network on its landmass
    pub spawn_location: String,

    pub pathfinder: PathfinderParams,
    pub smoothing: SmoothingParams,
    pub index: IndexParams,
    pub islands: IslandParams,
    pub topology: TopologyParams,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            road_width: 4.0,
            destination_percentage: 100,
            custom_locations: Vec::new(),
            spawn_location: "StartTemple".to_string(),
            pathfinder: PathfinderParams::default(),
            smoothing: SmoothingParams::default(),
            index: IndexParams::default(),
            islands: IslandParams::default(),
            topology: TopologyParams::default(),
        }
    }
}

impl RoadConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RoadConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.road_width > 0.0) || !self.road_width.is_finite() {
            return Err(RoadError::InvalidRoadWidth(self.road_width));
        }
        if self.destination_percentage > 100 {
            return Err(RoadError::Config(format!(
                "destination_percentage {} is above 100",
                self.destination_percentage
            )));
        }
        let positive = [
            ("pathfinder.cell_size", self.pathfinder.cell_size),
            ("pathfinder.base_cost", self.pathfinder.base_cost),
            ("smoothing.spacing_fraction", self.smoothing.spacing_fraction),
            ("smoothing.blend_tile_size", self.smoothing.blend_tile_size),
            ("index.cell_size", self.index.cell_size),
            ("index.overlap_search_factor", self.index.overlap_search_factor),
            ("islands.cell_size", self.islands.cell_size),
            ("islands.world_radius", self.islands.world_radius),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(RoadError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !(0.0..1.0).contains(&self.index.inner_fraction) {
            return Err(RoadError::Config(format!(
                "index.inner_fraction must be in [0, 1), got {}",
                self.index.inner_fraction
            )));
        }
        if self.smoothing.height_window == 0 {
            return Err(RoadError::Config("smoothing.height_window must be at least 1".into()));
        }
        if self.topology.min_destinations > self.topology.max_destinations {
            return Err(RoadError::Config(format!(
                "topology.min_destinations {} exceeds max_destinations {}",
                self.topology.min_destinations, self.topology.max_destinations
            )));
        }
        Ok(())
    }
}
