//! Whole-network road generation
//!
//! One pass gathers the registered locations, finds the landmasses, and on
//! each landmass connects an anchor to its selected destinations. Every
//! edge runs pathfinding, trimming, densification and index insertion in
//! order; later edges blend against roads already in the index, so edges
//! are generated sequentially.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RoadConfig;
use crate::error::{Result, RoadError};
use crate::pathfinding::Pathfinder;
use crate::road::index::InsertReport;
use crate::road::{densify, trim_path_to_radii, RoadSpatialIndex, RoadStart};
use crate::seeds::RoadSeeds;
use crate::terrain::TerrainOracle;

use super::islands::{detect_islands, IslandMap, Landmass};
use super::locations::{LocationRegistry, LocationSource, PointOfInterest};
use super::topology::{destination_cap, sample_destinations, select_destinations, Topology};

/// Where the generator is in its pass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationState {
    Idle,
    GatheringLocations,
    DetectingIslands,
    PerLandmassGeneration,
    Finalizing,
    Generated,
}

/// Summary of one landmass in a pass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmassReport {
    pub landmass_id: usize,
    pub area: f32,
    pub anchor: String,
    pub topology: Topology,
    /// Candidates on the landmass before sampling and capping
    pub candidates: usize,
    pub destinations: usize,
    pub edges_attempted: usize,
    pub edges_built: usize,
}

/// Counters for a whole pass
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub seed: u64,
    pub locations: usize,
    pub landmasses: Vec<LandmassReport>,
    pub edges_attempted: usize,
    pub edges_built: usize,
    pub skipped_path_not_found: usize,
    pub skipped_iteration_limit: usize,
    pub skipped_too_short: usize,
    /// Roads dropped because the terrain returned non-finite heights
    pub skipped_invalid_height: usize,
    /// Dense road points inserted into the index
    pub points_inserted: usize,
    /// Inserted points whose height was blended with an existing road
    pub points_blended: usize,
}

impl GenerationReport {
    pub fn edges_skipped(&self) -> usize {
        self.skipped_path_not_found
            + self.skipped_iteration_limit
            + self.skipped_too_short
            + self.skipped_invalid_height
    }

    fn record_skip(&mut self, err: &RoadError) {
        match err {
            RoadError::PathNotFound => self.skipped_path_not_found += 1,
            RoadError::IterationLimitReached { .. } => self.skipped_iteration_limit += 1,
            RoadError::PathTooShortAfterTrim { .. } => self.skipped_too_short += 1,
            RoadError::NonFiniteHeight { .. } => self.skipped_invalid_height += 1,
            _ => {}
        }
    }
}

/// Builds and owns the road network for one world.
pub struct RoadNetworkGenerator<T: TerrainOracle, L: LocationSource> {
    oracle: T,
    locations: L,
    config: RoadConfig,
    registry: LocationRegistry,
    index: Arc<RoadSpatialIndex>,
    road_starts: Vec<RoadStart>,
    state: GenerationState,
    last_report: Option<GenerationReport>,
}

impl<T: TerrainOracle, L: LocationSource> RoadNetworkGenerator<T, L> {
    /// Create an idle generator. The registry starts with the built-in
    /// location names plus the configured custom ones.
    pub fn new(oracle: T, locations: L, config: RoadConfig) -> Result<Self> {
        config.validate()?;
        let registry = LocationRegistry::with_defaults(&config.custom_locations);
        let index = Arc::new(RoadSpatialIndex::new(config.index.clone()));
        Ok(Self {
            oracle,
            locations,
            config,
            registry,
            index,
            road_starts: Vec::new(),
            state: GenerationState::Idle,
            last_report: None,
        })
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn config(&self) -> &RoadConfig {
        &self.config
    }

    pub fn oracle(&self) -> &T {
        &self.oracle
    }

    /// Shared handle for terrain consumers.
    pub fn index(&self) -> Arc<RoadSpatialIndex> {
        Arc::clone(&self.index)
    }

    pub fn road_starts(&self) -> &[RoadStart] {
        &self.road_starts
    }

    pub fn last_report(&self) -> Option<&GenerationReport> {
        self.last_report.as_ref()
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    /// Register a location name for the next pass.
    pub fn add_location(&mut self, name: &str) -> bool {
        self.registry.add(name)
    }

    pub fn remove_location(&mut self, name: &str) -> bool {
        self.registry.remove(name)
    }

    /// Run a pass unless one already completed.
    pub fn generate(&mut self) -> Result<GenerationReport> {
        if self.state == GenerationState::Generated {
            if let Some(report) = &self.last_report {
                return Ok(report.clone());
            }
        }

        match self.run_pass() {
            Ok(report) => {
                self.state = GenerationState::Generated;
                self.last_report = Some(report.clone());
                Ok(report)
            }
            Err(err) => {
                warn!(error = %err, "road generation aborted");
                self.reset();
                Err(err)
            }
        }
    }

    /// Drop the current network and generate again.
    pub fn force_regenerate(&mut self) -> Result<GenerationReport> {
        self.reset();
        self.generate()
    }

    fn reset(&mut self) {
        self.index.clear();
        self.road_starts.clear();
        self.last_report = None;
        self.state = GenerationState::Idle;
    }

    fn run_pass(&mut self) -> Result<GenerationReport> {
        self.index.clear();
        self.road_starts.clear();

        self.state = GenerationState::GatheringLocations;
        if !self.oracle.is_available() {
            return Err(RoadError::TerrainOracleUnavailable);
        }
        if !self.locations.is_ready() {
            return Err(RoadError::LocationsNotReady);
        }
        let pois: Vec<PointOfInterest> = self
            .locations
            .locations()
            .into_iter()
            .filter(|poi| self.registry.contains(&poi.name) && poi.position.is_finite())
            .collect();
        if pois.is_empty() {
            return Err(RoadError::NoLocationsFound);
        }

        let seeds = RoadSeeds::from_master(self.oracle.seed());
        info!(locations = pois.len(), seed = seeds.master, "generating road network");

        self.state = GenerationState::DetectingIslands;
        let islands = detect_islands(&self.oracle, &self.config.islands);
        info!(landmasses = islands.landmasses.len(), "detected landmasses");

        self.state = GenerationState::PerLandmassGeneration;
        let mut report = GenerationReport {
            seed: seeds.master,
            locations: pois.len(),
            ..Default::default()
        };
        for landmass in &islands.landmasses {
            let landmass_report = self.generate_landmass(landmass, &islands, &pois, &seeds, &mut report)?;
            report.landmasses.push(landmass_report);
        }

        self.state = GenerationState::Finalizing;
        info!(
            built = report.edges_built,
            attempted = report.edges_attempted,
            skipped = report.edges_skipped(),
            points = self.index.point_count(),
            cells = self.index.cell_count(),
            "road network generated"
        );
        Ok(report)
    }

    fn generate_landmass(
        &mut self,
        landmass: &Landmass,
        islands: &IslandMap,
        pois: &[PointOfInterest],
        seeds: &RoadSeeds,
        report: &mut GenerationReport,
    ) -> Result<LandmassReport> {
        let on_landmass: Vec<PointOfInterest> = pois
            .iter()
            .filter(|poi| islands.landmass_at(poi.position) == Some(landmass.id))
            .cloned()
            .collect();

        let spawn = on_landmass
            .iter()
            .find(|poi| poi.name == self.config.spawn_location)
            .cloned();
        let anchor = spawn.unwrap_or_else(|| {
            PointOfInterest::new(format!("landmass {} edge", landmass.id), landmass.edge_point, 0.0)
        });
        let candidates: Vec<PointOfInterest> = on_landmass
            .into_iter()
            .filter(|poi| poi.name != self.config.spawn_location)
            .collect();
        let candidate_count = candidates.len();

        let mut rng = seeds.selection_rng(landmass.id);
        let sampled = sample_destinations(
            candidates,
            self.config.destination_percentage,
            self.config.topology.always_keep_priority,
            &mut rng,
        );
        let cap = destination_cap(landmass.area, &self.config.topology);
        let destinations = select_destinations(sampled, cap);

        let topology = Topology::for_landmass(landmass.id);
        let mut nodes = Vec::with_capacity(destinations.len() + 1);
        nodes.push(anchor.clone());
        nodes.extend(destinations);
        let positions: Vec<_> = nodes.iter().map(|poi| poi.position).collect();
        let edges = topology.edges(&positions);

        let mut built = 0;
        for &(from, to) in &edges {
            report.edges_attempted += 1;
            match self.generate_road(&nodes[from], &nodes[to]) {
                Ok(inserted) => {
                    built += 1;
                    report.edges_built += 1;
                    report.points_inserted += inserted.points.len();
                    report.points_blended += inserted.overlapping;
                }
                Err(err) if err.is_edge_failure() => {
                    warn!(from = %nodes[from].name, to = %nodes[to].name, error = %err, "skipping road");
                    report.record_skip(&err);
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            landmass = landmass.id,
            area = landmass.area,
            anchor = %anchor.name,
            topology = topology.display_name(),
            destinations = nodes.len() - 1,
            built,
            "landmass roads"
        );

        Ok(LandmassReport {
            landmass_id: landmass.id,
            area: landmass.area,
            anchor: anchor.name,
            topology,
            candidates: candidate_count,
            destinations: nodes.len() - 1,
            edges_attempted: edges.len(),
            edges_built: built,
        })
    }

    /// Build one road between two locations and add it to the index.
    pub fn generate_road(&mut self, from: &PointOfInterest, to: &PointOfInterest) -> Result<InsertReport> {
        let finder = Pathfinder::new(&self.oracle, &self.config.pathfinder);
        let path = finder.find_path(from.position, to.position)?;
        let trimmed = trim_path_to_radii(
            &path,
            from.position,
            from.exterior_radius,
            to.position,
            to.exterior_radius,
        )?;
        let points = densify(&self.oracle, &trimmed, self.config.road_width, &self.config.smoothing)?;

        let inserted = self.index.insert_path(&points, self.config.road_width)?;
        debug!(
            from = %from.name,
            to = %to.name,
            waypoints = path.len(),
            points = inserted.points.len(),
            overlapping = inserted.overlapping,
            merged = inserted.merged,
            "road inserted"
        );

        self.road_starts.push(RoadStart {
            label: format!("{} -> {}", from.name, to.name),
            position: trimmed[0],
        });
        Ok(inserted)
    }
}
