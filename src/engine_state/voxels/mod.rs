//! # Voxel Engine Core
//!
//! This module contains the voxel data layer: how voxels are addressed, stored
//! and edited.
//!
//! ## Architecture
//!
//! * **Voxel**: A lattice position plus an RGBA color
//! * **Octree**: Fixed-depth sparse tree holding the voxels of one chunk
//! * **Chunk**: An 8x8x8 cell of the world with its octree, mesh and dirty flag
//! * **ChunkStore**: Owns every chunk and routes edits to the right octree
//! * **Terrain**: Height-field generation on top of the store
//!
//! ## Data Flow
//!
//! 1. The store receives a voxel edit
//! 2. The edit is routed to the owning chunk (created if necessary)
//! 3. The chunk and any bordering neighbors are flagged dirty
//! 4. The mesher picks dirty chunks up on the next frame

pub mod block_side;
pub mod chunk;
pub mod chunk_store;
pub mod error;
pub mod octree;
pub mod terrain;
pub mod voxel;
