//! Road network generation library
//!
//! Re-exports modules for use by the demo binary and host integrations.

pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod network;
pub mod pathfinding;
pub mod road;
pub mod seeds;
pub mod terrain;

pub use config::RoadConfig;
pub use error::{Result, RoadError};
pub use geometry::WorldPoint;
pub use network::{GenerationReport, GenerationState, RoadNetworkGenerator};
pub use road::{RoadInfluence, RoadPoint, RoadSpatialIndex};
pub use terrain::TerrainOracle;
