//! Error taxonomy for road network generation

use thiserror::Error;

/// Errors produced by the road generation pipeline.
///
/// Per-edge failures (see [`RoadError::is_edge_failure`]) are swallowed by the
/// network generator, which skips the edge and carries on. Everything else
/// aborts the whole pass.
#[derive(Error, Debug)]
pub enum RoadError {
    /// The pathfinder exhausted its open set
    #[error("no path found")]
    PathNotFound,

    /// The pathfinder hit its iteration cap
    #[error("pathfinder iteration limit reached after {iterations} iterations")]
    IterationLimitReached { iterations: usize },

    /// Trimming to the endpoints' exterior radii left too few points
    #[error("path too short after trimming to exterior radii ({remaining} points left)")]
    PathTooShortAfterTrim { remaining: usize },

    /// The terrain returned a NaN or infinite height along the road
    #[error("terrain height is not finite at ({x}, {z})")]
    NonFiniteHeight { x: f32, z: f32 },

    /// A road point handed to the index has a non-finite position or height
    #[error("road point {index} is not finite")]
    NonFiniteRoadPoint { index: usize },

    #[error("no points of interest found")]
    NoLocationsFound,

    #[error("locations have not been generated yet")]
    LocationsNotReady,

    #[error("terrain oracle unavailable")]
    TerrainOracleUnavailable,

    #[error("invalid road width {0}")]
    InvalidRoadWidth(f32),

    /// A persisted road index failed a sanity check while decoding
    #[error("malformed persisted road data: {0}")]
    MalformedPersistedData(String),

    #[error("unsupported persisted road data version {0}")]
    UnsupportedVersion(i32),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RoadError {
    /// True for failures that only affect a single road edge.
    pub fn is_edge_failure(&self) -> bool {
        matches!(
            self,
            RoadError::PathNotFound
                | RoadError::IterationLimitReached { .. }
                | RoadError::PathTooShortAfterTrim { .. }
                | RoadError::NonFiniteHeight { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_failure_classification() {
        assert!(RoadError::PathNotFound.is_edge_failure());
        assert!(RoadError::IterationLimitReached { iterations: 10 }.is_edge_failure());
        assert!(RoadError::PathTooShortAfterTrim { remaining: 1 }.is_edge_failure());
        assert!(RoadError::NonFiniteHeight { x: 0.0, z: 0.0 }.is_edge_failure());
        assert!(!RoadError::NonFiniteRoadPoint { index: 3 }.is_edge_failure());
        assert!(!RoadError::NoLocationsFound.is_edge_failure());
        assert!(!RoadError::MalformedPersistedData("x".into()).is_edge_failure());
    }
}
