//! Path trimming, densification and height smoothing
//!
//! Turns a coarse waypoint polyline from the pathfinder into dense road
//! points: trim to the endpoints' exterior radii, fit a Catmull-Rom spline,
//! resample it at even arc-length spacing, then smooth the blended terrain
//! height along the road with a centered moving average.

use crate::config::SmoothingParams;
use crate::error::{Result, RoadError};
use crate::geometry::{catmull_rom, segment_circle_exit, WorldPoint};
use crate::terrain::{blended_height, TerrainOracle};

use super::RoadPoint;

/// Points closer than this are treated as the same point
const DUPLICATE_EPSILON: f32 = 1e-4;

/// Cut a path so it starts and ends on its endpoints' exterior circles.
///
/// Points strictly inside either circle are dropped. Where the path leaves
/// the start circle (or enters the end circle) a point on the circle is
/// synthesized. A radius of zero leaves that end untouched.
///
/// When every waypoint sits inside one of the circles, the gap between them
/// can still lie inside a single segment; that segment is cut at both
/// circles instead.
pub fn trim_path_to_radii(
    points: &[WorldPoint],
    start_center: WorldPoint,
    start_radius: f32,
    end_center: WorldPoint,
    end_radius: f32,
) -> Result<Vec<WorldPoint>> {
    let inside_start = |p: &WorldPoint| start_radius > 0.0 && p.distance(start_center) < start_radius;
    let inside_end = |p: &WorldPoint| end_radius > 0.0 && p.distance(end_center) < end_radius;
    let outside_both = |p: &WorldPoint| !inside_start(p) && !inside_end(p);

    let first = points.iter().position(|p| !inside_start(p));
    let last = points.iter().rposition(|p| !inside_end(p));
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) if first <= last => (first, last),
        _ => {
            return points
                .windows(2)
                .find_map(|pair| {
                    bridge_segment(pair[0], pair[1], start_center, start_radius, end_center, end_radius)
                })
                .ok_or(RoadError::PathTooShortAfterTrim { remaining: 0 });
        }
    };

    let mut trimmed = Vec::with_capacity(last - first + 3);

    if first > 0 {
        if let Some(p) = segment_circle_exit(points[first - 1], points[first], start_center, start_radius) {
            if !inside_end(&p) {
                trimmed.push(p);
            }
        }
    }

    trimmed.extend(points[first..=last].iter().copied().filter(|p| outside_both(p)));

    if last + 1 < points.len() {
        if let Some(p) = segment_circle_exit(points[last + 1], points[last], end_center, end_radius) {
            if !inside_start(&p) {
                trimmed.push(p);
            }
        }
    }

    trimmed.dedup_by(|a, b| a.distance(*b) < DUPLICATE_EPSILON);

    if trimmed.len() < 2 {
        return Err(RoadError::PathTooShortAfterTrim { remaining: trimmed.len() });
    }
    Ok(trimmed)
}

/// The stretch of segment `a -> b` between leaving the start circle and
/// entering the end circle, if the circles leave a gap along it.
fn bridge_segment(
    a: WorldPoint,
    b: WorldPoint,
    start_center: WorldPoint,
    start_radius: f32,
    end_center: WorldPoint,
    end_radius: f32,
) -> Option<Vec<WorldPoint>> {
    let exit = if start_radius > 0.0 && a.distance(start_center) < start_radius {
        segment_circle_exit(a, b, start_center, start_radius)?
    } else {
        a
    };
    let entry = if end_radius > 0.0 && b.distance(end_center) < end_radius {
        segment_circle_exit(b, a, end_center, end_radius)?
    } else {
        b
    };

    if a.distance(entry) - a.distance(exit) > DUPLICATE_EPSILON {
        Some(vec![exit, entry])
    } else {
        None
    }
}

/// Fit a Catmull-Rom spline through `waypoints` and resample it every
/// `spacing` world units of arc length.
///
/// The spline is clamped at the ends by repeating the end waypoints. The
/// first and last output points are the first and last waypoints.
pub fn spline_resample(waypoints: &[WorldPoint], spacing: f32, subdivisions: usize) -> Vec<WorldPoint> {
    if waypoints.len() < 2 || !(spacing > 0.0) {
        return waypoints.to_vec();
    }

    let n = waypoints.len();
    let subdivisions = subdivisions.max(1);
    let mut curve = Vec::with_capacity((n - 1) * subdivisions + 1);
    for i in 0..n - 1 {
        let p0 = waypoints[i.saturating_sub(1)];
        let p1 = waypoints[i];
        let p2 = waypoints[i + 1];
        let p3 = waypoints[(i + 2).min(n - 1)];
        for s in 0..subdivisions {
            curve.push(catmull_rom(p0, p1, p2, p3, s as f32 / subdivisions as f32));
        }
    }
    curve.push(waypoints[n - 1]);

    let start = curve[0];
    let end = curve[curve.len() - 1];
    let mut dense = vec![start];
    let mut since_last = 0.0f32;

    for pair in curve.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let seg_len = a.distance(b);
        if seg_len <= f32::EPSILON {
            continue;
        }
        let mut consumed = 0.0f32;
        while since_last + (seg_len - consumed) >= spacing {
            consumed += spacing - since_last;
            dense.push(a.lerp(b, consumed / seg_len));
            since_last = 0.0;
        }
        since_last += seg_len - consumed;
    }

    // Snap the tail onto the true end point
    match dense.last().copied() {
        Some(tail) if dense.len() > 1 && tail.distance(end) < spacing * 0.5 => {
            let idx = dense.len() - 1;
            dense[idx] = end;
        }
        Some(tail) if tail.distance(end) > DUPLICATE_EPSILON => dense.push(end),
        _ => {}
    }

    dense
}

/// Centered moving average over `window` samples.
///
/// Near the ends the window shrinks symmetrically, so the end samples keep
/// their raw value and smoothing tapers in.
pub fn smooth_heights(heights: &[f32], window: usize) -> Vec<f32> {
    let n = heights.len();
    let half = window / 2;

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    for &h in heights {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + h as f64);
    }

    (0..n)
        .map(|i| {
            let k = half.min(i).min(n - 1 - i);
            let sum = prefix[i + k + 1] - prefix[i - k];
            (sum / (2 * k + 1) as f64) as f32
        })
        .collect()
}

/// Turn a trimmed waypoint polyline into dense road points.
pub fn densify<T: TerrainOracle + ?Sized>(
    oracle: &T,
    waypoints: &[WorldPoint],
    width: f32,
    params: &SmoothingParams,
) -> Result<Vec<RoadPoint>> {
    if !(width > 0.0) || !width.is_finite() {
        return Err(RoadError::InvalidRoadWidth(width));
    }
    if waypoints.len() < 2 {
        return Err(RoadError::PathTooShortAfterTrim { remaining: waypoints.len() });
    }

    let spacing = width * params.spacing_fraction;
    let positions = spline_resample(waypoints, spacing, params.spline_subdivisions);

    let raw: Vec<f32> = positions
        .iter()
        .map(|p| blended_height(oracle, p.x, p.z, params.blend_tile_size))
        .collect();
    // One NaN would poison every later sample through the prefix sum
    if let Some((p, _)) = positions.iter().zip(&raw).find(|(_, h)| !h.is_finite()) {
        return Err(RoadError::NonFiniteHeight { x: p.x, z: p.z });
    }
    let smoothed = smooth_heights(&raw, params.height_window);

    Ok(positions
        .into_iter()
        .zip(smoothed)
        .map(|(position, height)| RoadPoint::new(position, width, height))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FnTerrain;
    use approx::assert_abs_diff_eq;

    fn line(from: f32, to: f32, step: f32) -> Vec<WorldPoint> {
        let mut points = Vec::new();
        let mut x = from;
        while x <= to + 1e-3 {
            points.push(WorldPoint::new(x, 0.0));
            x += step;
        }
        points
    }

    #[test]
    fn test_trim_drops_points_inside_radii() {
        let path = line(0.0, 200.0, 8.0);
        let a = WorldPoint::new(0.0, 0.0);
        let b = WorldPoint::new(200.0, 0.0);
        let trimmed = trim_path_to_radii(&path, a, 30.0, b, 45.0).unwrap();

        for p in &trimmed {
            assert!(p.distance(a) >= 30.0 - 1e-3);
            assert!(p.distance(b) >= 45.0 - 1e-3);
        }
        assert_abs_diff_eq!(trimmed[0].distance(a), 30.0, epsilon = 1e-3);
        assert_abs_diff_eq!(trimmed[trimmed.len() - 1].distance(b), 45.0, epsilon = 1e-3);
    }

    #[test]
    fn test_trim_diagonal_intersection_on_circle() {
        let path = vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(8.0, 8.0),
            WorldPoint::new(16.0, 16.0),
            WorldPoint::new(40.0, 24.0),
            WorldPoint::new(80.0, 30.0),
        ];
        let a = WorldPoint::new(0.0, 0.0);
        let b = WorldPoint::new(80.0, 30.0);
        let trimmed = trim_path_to_radii(&path, a, 17.0, b, 10.0).unwrap();
        assert_abs_diff_eq!(trimmed[0].distance(a), 17.0, epsilon = 1e-3);
        assert_abs_diff_eq!(trimmed.last().unwrap().distance(b), 10.0, epsilon = 1e-3);
        assert!(trimmed.iter().all(|p| p.distance(a) >= 17.0 - 1e-3 && p.distance(b) >= 10.0 - 1e-3));
    }

    #[test]
    fn test_trim_gap_inside_one_segment() {
        // Knight moves: every waypoint lies inside one of the two circles
        let path = vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(16.0, 8.0),
            WorldPoint::new(32.0, 16.0),
            WorldPoint::new(48.0, 24.0),
        ];
        let a = path[0];
        let b = path[3];
        let trimmed = trim_path_to_radii(&path, a, 20.0, b, 20.0).unwrap();

        assert_eq!(trimmed.len(), 2);
        assert_abs_diff_eq!(trimmed[0].distance(a), 20.0, epsilon = 1e-3);
        assert_abs_diff_eq!(trimmed[1].distance(b), 20.0, epsilon = 1e-3);
        assert_abs_diff_eq!(trimmed[0].distance(trimmed[1]), a.distance(b) - 40.0, epsilon = 1e-3);
    }

    #[test]
    fn test_trim_zero_radius_keeps_ends() {
        let path = line(0.0, 64.0, 8.0);
        let trimmed = trim_path_to_radii(&path, path[0], 0.0, path[path.len() - 1], 0.0).unwrap();
        assert_eq!(trimmed, path);
    }

    #[test]
    fn test_trim_overlapping_radii_fails() {
        let path = line(0.0, 40.0, 8.0);
        let result = trim_path_to_radii(&path, path[0], 25.0, path[path.len() - 1], 25.0);
        assert!(matches!(result, Err(RoadError::PathTooShortAfterTrim { .. })));
    }

    #[test]
    fn test_smoothing_constant_is_unchanged() {
        let heights = vec![12.5f32; 100];
        assert_eq!(smooth_heights(&heights, 41), heights);
    }

    #[test]
    fn test_smoothing_keeps_endpoints_and_tapers() {
        let heights: Vec<f32> = (0..50).map(|i| if i % 2 == 0 { 0.0 } else { 10.0 }).collect();
        let smoothed = smooth_heights(&heights, 41);
        assert_eq!(smoothed[0], heights[0]);
        assert_eq!(smoothed[49], heights[49]);
        // Window of 3 at index 1: (0 + 10 + 0) / 3
        assert_abs_diff_eq!(smoothed[1], 10.0 / 3.0, epsilon = 1e-5);
        assert!((smoothed[25] - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_smoothing_linear_ramp_is_preserved() {
        let heights: Vec<f32> = (0..60).map(|i| i as f32 * 0.5).collect();
        let smoothed = smooth_heights(&heights, 41);
        for (a, b) in heights.iter().zip(&smoothed) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_resample_spacing_and_ends() {
        let waypoints = vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(16.0, 8.0),
            WorldPoint::new(32.0, 8.0),
            WorldPoint::new(48.0, 24.0),
        ];
        let dense = spline_resample(&waypoints, 1.0, 16);
        assert_eq!(dense[0], waypoints[0]);
        assert_eq!(*dense.last().unwrap(), waypoints[3]);
        for pair in dense.windows(2) {
            let d = pair[0].distance(pair[1]);
            assert!(d <= 1.5 + 1e-3, "gap {}", d);
            assert!(d > 0.0);
        }
    }

    #[test]
    fn test_densify_straight_flat_road() {
        let terrain = FnTerrain::flat(7.0);
        let waypoints = vec![WorldPoint::new(0.0, 0.0), WorldPoint::new(100.0, 0.0)];
        let points = densify(&terrain, &waypoints, 4.0, &SmoothingParams::default()).unwrap();

        // Spacing is width / 4
        assert_eq!(points.len(), 101);
        for p in &points {
            assert_eq!(p.width, 4.0);
            assert_eq!(p.height, 7.0);
            assert_abs_diff_eq!(p.position.z, 0.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_densify_rejects_non_finite_terrain() {
        let terrain = FnTerrain::flat(3.0).with_height(|x, _| if x > 60.0 { f32::NAN } else { 3.0 });
        let waypoints = vec![WorldPoint::new(0.0, 0.0), WorldPoint::new(100.0, 0.0)];
        let result = densify(&terrain, &waypoints, 4.0, &SmoothingParams::default());
        match result {
            Err(RoadError::NonFiniteHeight { x, .. }) => assert!(x > 50.0),
            other => panic!("expected NonFiniteHeight, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn test_densify_rejects_bad_width() {
        let terrain = FnTerrain::flat(7.0);
        let waypoints = vec![WorldPoint::new(0.0, 0.0), WorldPoint::new(100.0, 0.0)];
        assert!(matches!(
            densify(&terrain, &waypoints, 0.0, &SmoothingParams::default()),
            Err(RoadError::InvalidRoadWidth(_))
        ));
    }
}
