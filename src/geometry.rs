//! Planar world-space geometry helpers
//!
//! World coordinates are (x, z) on the ground plane; heights are carried
//! separately by whoever needs them.

use serde::{Deserialize, Serialize};

/// A 2D world-space coordinate on the ground plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f32,
    pub z: f32,
}

impl WorldPoint {
    pub const ORIGIN: WorldPoint = WorldPoint { x: 0.0, z: 0.0 };

    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }

    pub fn distance(&self, other: WorldPoint) -> f32 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(&self, other: WorldPoint) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn lerp(&self, other: WorldPoint, t: f32) -> WorldPoint {
        WorldPoint {
            x: self.x + (other.x - self.x) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

/// Axis-aligned rectangle in world space (min inclusive, max exclusive).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldRect {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl WorldRect {
    pub fn new(min: WorldPoint, max: WorldPoint) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: WorldPoint) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.z >= self.min.z && p.z < self.max.z
    }

    /// Distance from `p` to the nearest point of the rectangle (0 inside).
    pub fn distance_to(&self, p: WorldPoint) -> f32 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dz = (self.min.z - p.z).max(0.0).max(p.z - self.max.z);
        (dx * dx + dz * dz).sqrt()
    }

    /// Distance from an interior point to the closest edge of the rectangle.
    pub fn distance_to_boundary(&self, p: WorldPoint) -> f32 {
        (p.x - self.min.x)
            .abs()
            .min((self.max.x - p.x).abs())
            .min((p.z - self.min.z).abs())
            .min((self.max.z - p.z).abs())
    }

    pub fn intersects_circle(&self, center: WorldPoint, radius: f32) -> bool {
        self.distance_to(center) <= radius
    }
}

/// Hermite smooth step between `edge0` and `edge1`.
pub fn smooth_step(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Catmull-Rom spline interpolation between `p1` and `p2`.
pub fn catmull_rom(p0: WorldPoint, p1: WorldPoint, p2: WorldPoint, p3: WorldPoint, t: f32) -> WorldPoint {
    WorldPoint {
        x: catmull_rom_scalar(p0.x, p1.x, p2.x, p3.x, t),
        z: catmull_rom_scalar(p0.z, p1.z, p2.z, p3.z, t),
    }
}

fn catmull_rom_scalar(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Point where the segment `inside -> outside` leaves the circle.
///
/// `inside` is expected to lie within the circle and `outside` on or beyond
/// it. Solved in f64 so the result sits on the circle within f32 precision.
pub fn segment_circle_exit(
    inside: WorldPoint,
    outside: WorldPoint,
    center: WorldPoint,
    radius: f32,
) -> Option<WorldPoint> {
    let (px, pz) = (inside.x as f64 - center.x as f64, inside.z as f64 - center.z as f64);
    let (dx, dz) = (outside.x as f64 - inside.x as f64, outside.z as f64 - inside.z as f64);
    let r = radius as f64;

    let a = dx * dx + dz * dz;
    if a <= f64::EPSILON {
        return None;
    }
    let b = 2.0 * (px * dx + pz * dz);
    let c = px * px + pz * pz - r * r;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }

    let t = ((-b + disc.sqrt()) / (2.0 * a)).clamp(0.0, 1.0);
    Some(WorldPoint {
        x: (center.x as f64 + px + dx * t) as f32,
        z: (center.z as f64 + pz + dz * t) as f32,
    })
}

/// Total length of a polyline.
pub fn polyline_length(points: &[WorldPoint]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_smooth_step_edges() {
        assert_eq!(smooth_step(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smooth_step(0.0, 1.0, 2.0), 1.0);
        assert_abs_diff_eq!(smooth_step(0.0, 1.0, 0.5), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_catmull_rom_hits_control_points() {
        let p = [
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(1.0, 2.0),
            WorldPoint::new(3.0, 1.0),
            WorldPoint::new(4.0, 4.0),
        ];
        assert_eq!(catmull_rom(p[0], p[1], p[2], p[3], 0.0), p[1]);
        let end = catmull_rom(p[0], p[1], p[2], p[3], 1.0);
        assert_abs_diff_eq!(end.x, p[2].x, epsilon = 1e-5);
        assert_abs_diff_eq!(end.z, p[2].z, epsilon = 1e-5);
    }

    #[test]
    fn test_segment_circle_exit_lies_on_circle() {
        let center = WorldPoint::new(10.0, -5.0);
        let exit = segment_circle_exit(
            WorldPoint::new(11.0, -4.0),
            WorldPoint::new(40.0, 7.0),
            center,
            12.5,
        )
        .unwrap();
        assert_abs_diff_eq!(exit.distance(center), 12.5, epsilon = 1e-3);
    }

    #[test]
    fn test_rect_boundary_distance() {
        let rect = WorldRect::new(WorldPoint::new(0.0, 0.0), WorldPoint::new(10.0, 20.0));
        assert_eq!(rect.distance_to_boundary(WorldPoint::new(2.0, 10.0)), 2.0);
        assert_eq!(rect.distance_to(WorldPoint::new(5.0, 5.0)), 0.0);
        assert_eq!(rect.distance_to(WorldPoint::new(13.0, 24.0)), 5.0);
    }
}
