//! Per-voxel face meshing.
//!
//! Every exposed voxel face becomes its own quad. This is the slow reference
//! the greedy mesher is checked against, and it is still selectable at runtime.

use crate::engine_state::voxels::{
    block_side::BlockSide,
    chunk::Chunk,
    chunk_store::ChunkStore,
    voxel::offset_position,
};

use super::{face::Quad, mesh::GeneratedMesh};

/// Meshes `chunk` with one quad per exposed face.
///
/// Neighbors are looked up through the store, so faces against voxels of
/// adjacent chunks are culled too.
///
/// # Performance
/// O(voxels × 6 × lookup) and no merging at all.
pub fn naive(store: &ChunkStore, chunk: &Chunk) -> GeneratedMesh {
    let mut quads_per_side: [Vec<Quad>; 6] = Default::default();

    for voxel in chunk.octree.voxels() {
        let local = chunk.to_local(voxel.position);
        for side in BlockSide::all() {
            let neighbor = offset_position(voxel.position, side.normal());
            if !neighbor.is_some_and(|neighbor| store.has_voxel(neighbor)) {
                quads_per_side[side as usize].push(Quad::unit(side, local, voxel.color));
            }
        }
    }

    GeneratedMesh::from_quads(chunk.corner(), &quads_per_side)
}
