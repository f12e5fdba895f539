//! Binary save/load of the road spatial index.
//!
//! Layout, all little-endian:
//!
//! ```text
//! version:i32 cell_count:i32
//! { grid_x:i32 grid_z:i32 point_count:i32 { x:f32 z:f32 width:f32 height:f32 } * point_count } * cell_count
//! ```
//!
//! Cells are written sorted by key and include replicated points, so two
//! indexes holding the same roads encode to the same bytes.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::config::IndexParams;
use crate::error::{Result, RoadError};
use crate::geometry::WorldPoint;

use super::index::{CellKey, RoadSpatialIndex};
use super::RoadPoint;

pub const FORMAT_VERSION: i32 = 1;

/// Upper bound on cells accepted while decoding
pub const MAX_CELLS: i32 = 4_000_000;

/// Upper bound on points per cell accepted while decoding
pub const MAX_POINTS_PER_CELL: i32 = 65_536;

const POINT_BYTES: usize = 16;

/// Serialize every cell of the index.
pub fn encode_index(index: &RoadSpatialIndex) -> Vec<u8> {
    let cells = index.cells_sorted();
    let total_points: usize = cells.iter().map(|(_, points)| points.len()).sum();
    let mut buf = Vec::with_capacity(8 + cells.len() * 12 + total_points * POINT_BYTES);

    // Writes into a Vec cannot fail
    let _ = write_cells(&mut buf, &cells);
    buf
}

fn write_cells(buf: &mut Vec<u8>, cells: &[(CellKey, Vec<RoadPoint>)]) -> io::Result<()> {
    buf.write_i32::<LittleEndian>(FORMAT_VERSION)?;
    buf.write_i32::<LittleEndian>(cells.len() as i32)?;
    for ((gx, gz), points) in cells {
        buf.write_i32::<LittleEndian>(*gx)?;
        buf.write_i32::<LittleEndian>(*gz)?;
        buf.write_i32::<LittleEndian>(points.len() as i32)?;
        for p in points {
            buf.write_f32::<LittleEndian>(p.position.x)?;
            buf.write_f32::<LittleEndian>(p.position.z)?;
            buf.write_f32::<LittleEndian>(p.width)?;
            buf.write_f32::<LittleEndian>(p.height)?;
        }
    }
    Ok(())
}

/// Rebuild an index from bytes produced by [`encode_index`].
///
/// Counts are checked against sanity bounds and the remaining input length
/// before anything is allocated.
pub fn decode_index(bytes: &[u8], params: IndexParams) -> Result<RoadSpatialIndex> {
    let mut reader = Cursor::new(bytes);

    let version = read_i32(&mut reader, "version")?;
    if version != FORMAT_VERSION {
        return Err(RoadError::UnsupportedVersion(version));
    }

    let cell_count = read_i32(&mut reader, "cell count")?;
    if !(0..=MAX_CELLS).contains(&cell_count) {
        return Err(malformed(format!("cell count {} out of range", cell_count)));
    }

    let mut cells = Vec::with_capacity((cell_count as usize).min(remaining(&reader) / 12));
    for cell in 0..cell_count {
        let gx = read_i32(&mut reader, "cell x")?;
        let gz = read_i32(&mut reader, "cell z")?;
        let point_count = read_i32(&mut reader, "point count")?;
        if !(0..=MAX_POINTS_PER_CELL).contains(&point_count) {
            return Err(malformed(format!(
                "cell {} ({}, {}) has point count {}",
                cell, gx, gz, point_count
            )));
        }
        if remaining(&reader) < point_count as usize * POINT_BYTES {
            return Err(malformed(format!("cell {} ({}, {}) is truncated", cell, gx, gz)));
        }

        let mut points = Vec::with_capacity(point_count as usize);
        for _ in 0..point_count {
            let x = read_f32(&mut reader, "x")?;
            let z = read_f32(&mut reader, "z")?;
            let width = read_f32(&mut reader, "width")?;
            let height = read_f32(&mut reader, "height")?;
            if !x.is_finite() || !z.is_finite() || !height.is_finite() {
                return Err(malformed(format!("non-finite road point in cell ({}, {})", gx, gz)));
            }
            if !(width > 0.0) || !width.is_finite() {
                return Err(malformed(format!("road width {} in cell ({}, {})", width, gx, gz)));
            }
            points.push(RoadPoint::new(WorldPoint::new(x, z), width, height));
        }
        cells.push(((gx, gz), points));
    }

    if remaining(&reader) != 0 {
        return Err(malformed(format!("{} trailing bytes", remaining(&reader))));
    }

    Ok(RoadSpatialIndex::from_cells(params, cells))
}

/// Write the encoded index to a file.
pub fn save_index(index: &RoadSpatialIndex, path: &Path) -> Result<()> {
    fs::write(path, encode_index(index))?;
    Ok(())
}

/// Read an index written by [`save_index`].
pub fn load_index(path: &Path, params: IndexParams) -> Result<RoadSpatialIndex> {
    let mut bytes = Vec::new();
    fs::File::open(path)?.read_to_end(&mut bytes)?;
    decode_index(&bytes, params)
}

fn malformed(msg: String) -> RoadError {
    RoadError::MalformedPersistedData(msg)
}

fn remaining(reader: &Cursor<&[u8]>) -> usize {
    reader.get_ref().len().saturating_sub(reader.position() as usize)
}

fn read_i32(reader: &mut Cursor<&[u8]>, field: &str) -> Result<i32> {
    reader
        .read_i32::<LittleEndian>()
        .map_err(|_| malformed(format!("unexpected end of data reading {}", field)))
}

fn read_f32(reader: &mut Cursor<&[u8]>, field: &str) -> Result<f32> {
    reader
        .read_f32::<LittleEndian>()
        .map_err(|_| malformed(format!("unexpected end of data reading {}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_index() -> RoadSpatialIndex {
        let index = RoadSpatialIndex::new(IndexParams::default());
        let a: Vec<RoadPoint> = (0..=120)
            .map(|i| RoadPoint::new(WorldPoint::new(-40.0 + i as f32, 3.0), 4.0, 2.0 + i as f32 * 0.05))
            .collect();
        let b: Vec<RoadPoint> = (0..=80)
            .map(|i| RoadPoint::new(WorldPoint::new(10.0, -30.0 + i as f32), 6.0, 9.0))
            .collect();
        index.insert_path(&a, 4.0).unwrap();
        index.insert_path(&b, 6.0).unwrap();
        index
    }

    #[test]
    fn test_roundtrip_answers_same_queries() {
        let index = sample_index();
        let bytes = encode_index(&index);
        let restored = decode_index(&bytes, IndexParams::default()).unwrap();

        assert_eq!(restored.point_count(), index.point_count());
        assert_eq!(restored.cell_count(), index.cell_count());

        for (_, points) in index.cells_sorted() {
            for p in points {
                for sample in [p.position, WorldPoint::new(p.position.x + 1.3, p.position.z - 0.7)] {
                    let a = index.query_influence(sample);
                    let b = restored.query_influence(sample);
                    assert_abs_diff_eq!(a.weight, b.weight, epsilon = 1e-6);
                    assert_abs_diff_eq!(a.height, b.height, epsilon = 1e-4);
                    assert_eq!(a.width, b.width);
                }
            }
        }
        assert_eq!(encode_index(&restored), bytes);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        assert_eq!(encode_index(&sample_index()), encode_index(&sample_index()));
    }

    #[test]
    fn test_empty_index() {
        let bytes = encode_index(&RoadSpatialIndex::new(IndexParams::default()));
        assert_eq!(bytes, vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert!(decode_index(&bytes, IndexParams::default()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_points_never_reach_encoding() {
        let index = sample_index();
        let bad = [
            RoadPoint::new(WorldPoint::new(-5.0, -5.0), 4.0, f32::NAN),
            RoadPoint::new(WorldPoint::new(-6.0, -6.0), 0.0, 1.0),
        ];
        assert!(index.insert_path(&bad[..1], 4.0).is_err());
        assert!(index.insert_path(&bad[1..], 4.0).is_err());

        let restored = decode_index(&encode_index(&index), IndexParams::default()).unwrap();
        assert_eq!(restored.point_count(), index.point_count());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = encode_index(&sample_index());
        bytes[0] = 7;
        assert!(matches!(
            decode_index(&bytes, IndexParams::default()),
            Err(RoadError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_rejects_bad_counts() {
        let mut negative = Vec::new();
        negative.write_i32::<LittleEndian>(1).unwrap();
        negative.write_i32::<LittleEndian>(-3).unwrap();
        assert!(matches!(
            decode_index(&negative, IndexParams::default()),
            Err(RoadError::MalformedPersistedData(_))
        ));

        let mut huge_cell = Vec::new();
        huge_cell.write_i32::<LittleEndian>(1).unwrap();
        huge_cell.write_i32::<LittleEndian>(1).unwrap();
        huge_cell.write_i32::<LittleEndian>(0).unwrap();
        huge_cell.write_i32::<LittleEndian>(0).unwrap();
        huge_cell.write_i32::<LittleEndian>(i32::MAX).unwrap();
        assert!(matches!(
            decode_index(&huge_cell, IndexParams::default()),
            Err(RoadError::MalformedPersistedData(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_and_invalid_points() {
        let bytes = encode_index(&sample_index());
        assert!(matches!(
            decode_index(&bytes[..bytes.len() - 5], IndexParams::default()),
            Err(RoadError::MalformedPersistedData(_))
        ));
        assert!(matches!(
            decode_index(&bytes[..3], IndexParams::default()),
            Err(RoadError::MalformedPersistedData(_))
        ));

        let mut zero_width = Vec::new();
        write_cells(
            &mut zero_width,
            &[((0, 0), vec![RoadPoint::new(WorldPoint::new(1.0, 1.0), 0.0, 1.0)])],
        )
        .unwrap();
        assert!(matches!(
            decode_index(&zero_width, IndexParams::default()),
            Err(RoadError::MalformedPersistedData(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let index = sample_index();
        let path = std::env::temp_dir().join(format!("road_index_test_{}.bin", std::process::id()));
        save_index(&index, &path).unwrap();
        let loaded = load_index(&path, IndexParams::default()).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(encode_index(&loaded), encode_index(&index));
    }
}
