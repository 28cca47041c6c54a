//! Mesh generation for voxel chunks.
//!
//! This module converts the voxels of a chunk into GPU-friendly vertex and index
//! arrays. Two meshers share the same output format:
//!
//! # Architecture
//! - [`GeneratedMesh`]: vertices and indices of one chunk, grouped by side
//! - [`Quad`]: an axis-aligned rectangle of merged voxel faces
//! - [`greedy`]: binary greedy meshing over bit-packed columns
//! - [`naive`]: one quad per exposed face
//!
//! # Usage
//! ```
//! use cgmath::Point3;
//! use voxel_engine::{ChunkStore, VoxelColor};
//! use voxel_engine::engine_state::rendering::meshing::mesh::greedy;
//!
//! let mut store = ChunkStore::new();
//! store.add_voxel(Point3::new(1, 1, 1), VoxelColor::new(255, 0, 0, 255)).unwrap();
//! let chunk = store.chunk_at(Point3::new(3.5, 3.5, 3.5)).unwrap();
//! assert_eq!(greedy(&store, chunk).quad_count(), 6);
//! ```

mod face;
mod greedy;
mod mesh;
mod naive;

pub use face::{plane_axes, Quad};
pub use greedy::greedy;
pub use mesh::GeneratedMesh;
pub use naive::naive;
