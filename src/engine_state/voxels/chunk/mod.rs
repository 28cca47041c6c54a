//! # Chunk Module
//!
//! This module provides the `Chunk` struct and the coordinate helpers used to map
//! world positions onto 8x8x8 chunk cells.
//!
//! ## Chunk Alignment
//!
//! Chunk centers are offset by [`CHUNK_SHIFT`] from the lattice so that no integer
//! voxel coordinate ever sits exactly on a chunk boundary. Chunk `k` along an axis
//! covers the voxels `8k..=8k+7` and is centered at `8k + 3.5`.
//!
//! Three coordinate spaces are used throughout the engine:
//! - **World**: integer voxel positions, or float positions for chunk centers
//! - **Chunk key**: the integer index `k` of a chunk cell per axis
//! - **Local**: a voxel position relative to the chunk corner (`0..CHUNK_EXTENT`)

use cgmath::{Point3, Vector3};

use super::{octree::OCTREE_DEPTH, octree::VoxelOctree};
use crate::engine_state::rendering::GeneratedMesh;

/// The number of voxels along each edge of a chunk.
pub const CHUNK_EXTENT: i32 = 1 << OCTREE_DEPTH;
/// The number of voxels in a single 2D plane of a chunk (CHUNK_EXTENT²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_EXTENT * CHUNK_EXTENT;
/// The total number of voxels in a chunk (CHUNK_EXTENT³).
pub const CHUNK_VOLUME: usize = (CHUNK_PLANE_SIZE * CHUNK_EXTENT) as usize;
/// Offset between a chunk's key-scaled position and its center.
pub const CHUNK_SHIFT: f32 = (CHUNK_EXTENT as f32 - 1.0) / 2.0;
/// Smallest chunk key whose voxels are all representable as `i32`.
pub const CHUNK_KEY_MIN: i32 = i32::MIN / CHUNK_EXTENT;
/// Largest chunk key whose voxels are all representable as `i32`.
pub const CHUNK_KEY_MAX: i32 = i32::MAX / CHUNK_EXTENT;

/// Chunk key of a float coordinate before rounding, in `f64` so large centers stay exact.
fn scaled_key(coordinate: f32) -> f64 {
    (coordinate as f64 - CHUNK_SHIFT as f64) / CHUNK_EXTENT as f64
}

fn key_in_range(scaled: f64) -> bool {
    (CHUNK_KEY_MIN as f64..=CHUNK_KEY_MAX as f64).contains(&scaled)
}

fn align_axis(coordinate: f32) -> f32 {
    (scaled_key(coordinate).round() * CHUNK_EXTENT as f64 + CHUNK_SHIFT as f64) as f32
}

/// Rounds a world position to the center of the chunk cell containing it.
///
/// Idempotent: aligning an already aligned center returns it unchanged.
pub fn align_to_chunk_center(position: Point3<f32>) -> Point3<f32> {
    Point3::new(
        align_axis(position.x),
        align_axis(position.y),
        align_axis(position.z),
    )
}

/// Whether `position` is exactly the center of a chunk cell with a valid key.
pub fn is_chunk_aligned(position: Point3<f32>) -> bool {
    let integral = |c: f32| {
        let scaled = scaled_key(c);
        scaled.fract() == 0.0 && key_in_range(scaled)
    };
    integral(position.x) && integral(position.y) && integral(position.z)
}

/// Converts a chunk center into its chunk key.
///
/// `None` for non-finite positions and for cells outside
/// [`CHUNK_KEY_MIN`]`..=`[`CHUNK_KEY_MAX`].
pub fn center_to_key(center: Point3<f32>) -> Option<Point3<i32>> {
    let key = |c: f32| {
        let scaled = scaled_key(c).round();
        key_in_range(scaled).then_some(scaled as i32)
    };
    Some(Point3::new(key(center.x)?, key(center.y)?, key(center.z)?))
}

/// Converts a chunk key into the chunk's center.
pub fn key_to_center(key: Point3<i32>) -> Point3<f32> {
    let center = |k: i32| (k as f64 * CHUNK_EXTENT as f64 + CHUNK_SHIFT as f64) as f32;
    Point3::new(center(key.x), center(key.y), center(key.z))
}

/// Key of the chunk owning the voxel at `position`.
pub fn chunk_key_of(position: Point3<i32>) -> Point3<i32> {
    Point3::new(
        position.x.div_euclid(CHUNK_EXTENT),
        position.y.div_euclid(CHUNK_EXTENT),
        position.z.div_euclid(CHUNK_EXTENT),
    )
}

/// World position of the lowest corner voxel of the chunk with `key`.
///
/// `key` must lie within [`CHUNK_KEY_MIN`]`..=`[`CHUNK_KEY_MAX`].
pub fn chunk_corner(key: Point3<i32>) -> Point3<i32> {
    Point3::new(
        key.x * CHUNK_EXTENT,
        key.y * CHUNK_EXTENT,
        key.z * CHUNK_EXTENT,
    )
}

/// A fixed-size cubic region of the world with its own octree and mesh.
///
/// Chunks are created by the [`ChunkStore`](super::chunk_store::ChunkStore) on first
/// insertion and live until the store is dropped.
#[derive(Debug)]
pub struct Chunk {
    /// Unique, monotonically assigned identifier. Used as the key into the vertex pool.
    pub id: u32,
    /// Chunk key (cell index per axis).
    pub key: Point3<i32>,
    /// Voxel storage, rooted at the chunk center.
    pub octree: VoxelOctree,
    /// Last mesh generated for this chunk, kept after upload.
    pub mesh: GeneratedMesh,
    /// Set whenever a contained or bordering voxel changes; cleared after remeshing.
    pub dirty: bool,
}

impl Chunk {
    /// Creates an empty chunk with the given id and key.
    pub fn new(id: u32, key: Point3<i32>) -> Self {
        Chunk {
            id,
            key,
            octree: VoxelOctree::new(chunk_corner(key)),
            mesh: GeneratedMesh::new(chunk_corner(key)),
            dirty: false,
        }
    }

    /// World center of the chunk.
    pub fn center(&self) -> Point3<f32> {
        key_to_center(self.key)
    }

    /// World position of the chunk's lowest corner voxel.
    pub fn corner(&self) -> Point3<i32> {
        self.octree.corner()
    }

    /// Number of voxels stored in the chunk.
    pub fn voxel_count(&self) -> usize {
        self.octree.len()
    }

    /// Converts a world position to chunk-local coordinates.
    pub fn to_local(&self, position: Point3<i32>) -> Point3<i32> {
        let corner = self.corner();
        Point3::new(
            position.x - corner.x,
            position.y - corner.y,
            position.z - corner.z,
        )
    }

    /// Keys of the face-adjacent chunks that border the voxel at `position`.
    ///
    /// Empty for voxels in the chunk interior.
    pub fn bordering_keys(&self, position: Point3<i32>) -> Vec<Point3<i32>> {
        let local = self.to_local(position);
        let local = [local.x, local.y, local.z];
        let mut keys = Vec::new();

        for axis in 0..3 {
            let mut step = [0; 3];
            if local[axis] == 0 {
                step[axis] = -1;
            } else if local[axis] == CHUNK_EXTENT - 1 {
                step[axis] = 1;
            } else {
                continue;
            }
            keys.push(self.key + Vector3::new(step[0], step[1], step[2]));
        }

        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_voxels_align_to_their_chunk() {
        for x in -20i32..20 {
            let center = align_axis(x as f32);
            assert_eq!(center, (x.div_euclid(CHUNK_EXTENT) * CHUNK_EXTENT) as f32 + CHUNK_SHIFT);
        }
    }

    #[test]
    fn keys_stay_exact_past_float_precision() {
        assert_eq!(chunk_key_of(Point3::new(8_388_615, 0, 0)).x, 1_048_576);
        assert_eq!(chunk_key_of(Point3::new(16_777_217, 0, 0)).x, 2_097_152);
        assert_eq!(
            chunk_key_of(Point3::new(i32::MIN, i32::MAX, -16_777_217)),
            Point3::new(CHUNK_KEY_MIN, CHUNK_KEY_MAX, -2_097_153)
        );
    }

    #[test]
    fn centers_outside_the_key_range_have_no_key() {
        let far = Point3::new(1.0e30, 3.5, 3.5);
        assert!(!is_chunk_aligned(far));
        assert_eq!(center_to_key(far), None);
        assert_eq!(center_to_key(Point3::new(f32::INFINITY, 3.5, 3.5)), None);
        assert_eq!(center_to_key(Point3::new(f32::NAN, 3.5, 3.5)), None);

        let key = Point3::new(1_000_000, -1_000_000, 0);
        assert_eq!(center_to_key(key_to_center(key)), Some(key));
    }

    #[test]
    fn alignment_matches_key_round_trip() {
        let center = Point3::new(3.5, -4.5, 11.5);
        assert!(is_chunk_aligned(center));
        assert_eq!(center_to_key(center), Some(Point3::new(0, -1, 1)));
        assert_eq!(key_to_center(Point3::new(0, -1, 1)), center);
        assert!(!is_chunk_aligned(Point3::new(4.0, 3.5, 3.5)));
    }

    #[test]
    fn chunk_key_of_negative_voxels() {
        assert_eq!(chunk_key_of(Point3::new(-1, 0, 7)), Point3::new(-1, 0, 0));
        assert_eq!(chunk_key_of(Point3::new(8, -8, -9)), Point3::new(1, -1, -2));
    }

    #[test]
    fn border_voxels_report_neighbors() {
        let chunk = Chunk::new(0, Point3::new(0, 0, 0));
        assert!(chunk.bordering_keys(Point3::new(3, 4, 5)).is_empty());
        assert_eq!(
            chunk.bordering_keys(Point3::new(0, 7, 3)),
            vec![Point3::new(-1, 0, 0), Point3::new(0, 1, 0)]
        );
    }
}
