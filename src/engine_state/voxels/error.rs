use cgmath::Point3;
use thiserror::Error;

/// Failures surfaced by the chunk store and the per-chunk octrees.
///
/// None of these are retried; bulk operations such as
/// [`ChunkStore::fill_chunk`](super::chunk_store::ChunkStore::fill_chunk) are
/// left partially applied when one is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum VoxelError {
    /// The position is not the center of a chunk cell.
    #[error("{position:?} is not a chunk-aligned center")]
    InvalidLocation {
        /// The rejected world position
        position: Point3<f32>,
    },

    /// A chunk already occupies the cell.
    #[error("a chunk already exists at {position:?}")]
    AlreadyExists {
        /// Center of the occupied cell
        position: Point3<f32>,
    },

    /// The owning chunk or the voxel itself is absent.
    #[error("no voxel at {position:?}")]
    NotFound {
        /// The queried world position
        position: Point3<i32>,
    },

    /// The octree descent ended without producing a leaf.
    #[error("octree descent for {position:?} did not reach a leaf")]
    InsertionFailed {
        /// The voxel position being inserted
        position: Point3<i32>,
    },
}
