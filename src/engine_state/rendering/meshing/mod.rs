//! Mesh generation and management for voxel rendering.
//!
//! This module turns dirty chunks into geometry and hands that geometry to the
//! vertex pool. The key goals are:
//! 1. Only remesh what changed since the last frame
//! 2. Keep one contiguous range per chunk in each pool buffer
//! 3. Reuse a chunk's ranges in place whenever the new mesh still fits
//!
//! # Architecture
//! - [`ChunkMesher`]: selects the meshing algorithm
//! - [`vertex_pool::VertexPool`]: bucket-based range allocation of mesh data
//! - `mesh/`: the meshing algorithms and the mesh data structures

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine_state::voxels::{chunk::Chunk, chunk_store::ChunkStore};

/// Core mesh generation algorithms and data structures.
pub mod mesh;
pub mod vertex_pool;

pub use mesh::{GeneratedMesh, Quad};

use vertex_pool::{PoolError, VertexPool};

/// Which algorithm turns voxels into quads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshingMode {
    /// One quad per exposed face
    Naive,
    /// Binary greedy meshing
    #[default]
    Greedy,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkMesher {
    pub mode: MeshingMode,
}

impl ChunkMesher {
    pub fn new(mode: MeshingMode) -> Self {
        ChunkMesher { mode }
    }

    /// Meshes a chunk of `store`, culling against neighboring chunks.
    pub fn mesh(&self, store: &ChunkStore, chunk: &Chunk) -> GeneratedMesh {
        let mesh = match self.mode {
            MeshingMode::Naive => mesh::naive(store, chunk),
            MeshingMode::Greedy => mesh::greedy(store, chunk),
        };
        debug!(
            "Meshed chunk {} ({} voxels) into {} quads with {:?}",
            chunk.id,
            chunk.voxel_count(),
            mesh.quad_count(),
            self.mode
        );
        mesh
    }
}

/// What a remesh pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemeshStats {
    pub chunks_meshed: usize,
    /// Chunks whose mesh came out empty and whose pool ranges were released
    pub chunks_emptied: usize,
    pub quads: usize,
    pub vertices: usize,
    pub indices: usize,
}

/// Remeshes every dirty chunk in id order and stores the result in the pool.
///
/// A chunk stays dirty if storing its mesh fails, so the next pass retries it.
pub fn remesh_dirty_chunks(
    store: &mut ChunkStore,
    mesher: &ChunkMesher,
    pool: &mut VertexPool,
) -> Result<RemeshStats, PoolError> {
    let mut stats = RemeshStats::default();

    for key in store.dirty_chunk_keys() {
        let Some(chunk) = store.chunk(key) else {
            continue;
        };
        let mesh = mesher.mesh(store, chunk);
        let chunk_id = chunk.id;

        pool.store_mesh(chunk_id, &mesh)?;

        stats.chunks_meshed += 1;
        if mesh.is_empty() {
            stats.chunks_emptied += 1;
        }
        stats.quads += mesh.quad_count();
        stats.vertices += mesh.vertices.len();
        stats.indices += mesh.indices.len();

        if let Some(chunk) = store.chunk_mut(key) {
            chunk.mesh = mesh;
            chunk.dirty = false;
        }
    }

    Ok(stats)
}
