//! Road surface data: dense road points, their spatial index and its
//! persisted form.

pub mod densify;
pub mod index;
pub mod persistence;

use serde::{Deserialize, Serialize};

use crate::geometry::{WorldPoint, WorldRect};

pub use densify::{densify, smooth_heights, spline_resample, trim_path_to_radii};
pub use index::{RoadInfluence, RoadSpatialIndex};
pub use persistence::{decode_index, encode_index, load_index, save_index};

/// Side length of a terrain zone, the unit external consumers load terrain in
pub const ZONE_SIZE: f32 = 64.0;

/// One dense sample along a road centerline
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadPoint {
    pub position: WorldPoint,
    /// Full road width; the influence radius is half of it
    pub width: f32,
    /// Target surface height
    pub height: f32,
}

impl RoadPoint {
    pub fn new(position: WorldPoint, width: f32, height: f32) -> Self {
        Self { position, width, height }
    }

    pub fn half_width(&self) -> f32 {
        self.width * 0.5
    }

    /// Bitwise identity, used to deduplicate points replicated across cells
    pub fn bit_key(&self) -> [u32; 4] {
        [
            self.position.x.to_bits(),
            self.position.z.to_bits(),
            self.width.to_bits(),
            self.height.to_bits(),
        ]
    }
}

/// Terrain zone coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId {
    pub x: i32,
    pub z: i32,
}

impl ZoneId {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn from_point(p: WorldPoint) -> Self {
        Self {
            x: (p.x / ZONE_SIZE).floor() as i32,
            z: (p.z / ZONE_SIZE).floor() as i32,
        }
    }

    pub fn bounds(&self) -> WorldRect {
        let min = WorldPoint::new(self.x as f32 * ZONE_SIZE, self.z as f32 * ZONE_SIZE);
        WorldRect::new(min, WorldPoint::new(min.x + ZONE_SIZE, min.z + ZONE_SIZE))
    }
}

/// A labeled road origin kept for bookmarking and visualization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadStart {
    pub label: String,
    pub position: WorldPoint,
}
