//! World road network: landmasses, destinations, topology and the
//! generation pass that ties them together.

pub mod generator;
pub mod islands;
pub mod locations;
pub mod topology;

pub use generator::{GenerationReport, GenerationState, LandmassReport, RoadNetworkGenerator};
pub use islands::{detect_islands, IslandMap, Landmass};
pub use locations::{LocationRegistry, LocationSource, PointOfInterest, StaticLocations};
pub use topology::{minimum_spanning_tree, nearest_neighbor_chain, priority_of, Topology};
