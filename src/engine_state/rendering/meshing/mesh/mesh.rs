//! Mesh data structures and operations for voxel rendering.
//!
//! This module turns lists of quads into the GPU-friendly vertex and index
//! arrays that the vertex pool stores.

use cgmath::Point3;

use crate::engine_state::{
    rendering::ChunkVertex,
    voxels::block_side::BlockSide,
};

use super::face::Quad;

/// The geometry of one chunk.
///
/// Quads are grouped by [`BlockSide`] in side order, so the indices of each side
/// form one contiguous run. `side_index_counts` records the length of each run,
/// which lets the renderer issue one draw per visible side.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMesh {
    /// Four chunk-relative vertices per quad
    pub vertices: Vec<ChunkVertex>,
    /// Six indices per quad, relative to the first vertex of this mesh
    pub indices: Vec<u32>,
    /// Number of indices emitted for each side
    pub side_index_counts: [u32; 6],
    /// World position of the chunk corner the vertices are relative to
    pub corner: Point3<i32>,
}

impl Default for GeneratedMesh {
    fn default() -> Self {
        GeneratedMesh::new(Point3::new(0, 0, 0))
    }
}

impl GeneratedMesh {
    /// Creates an empty mesh for the chunk whose corner is at `corner`.
    pub fn new(corner: Point3<i32>) -> Self {
        GeneratedMesh {
            vertices: Vec::new(),
            indices: Vec::new(),
            side_index_counts: [0; 6],
            corner,
        }
    }

    /// Builds a mesh from quads already grouped per side (indexed by `BlockSide`).
    pub fn from_quads(corner: Point3<i32>, quads_per_side: &[Vec<Quad>; 6]) -> Self {
        let quad_count: usize = quads_per_side.iter().map(Vec::len).sum();
        let mut mesh = GeneratedMesh {
            vertices: Vec::with_capacity(quad_count * 4),
            indices: Vec::with_capacity(quad_count * 6),
            side_index_counts: [0; 6],
            corner,
        };

        for (side_index, quads) in quads_per_side.iter().enumerate() {
            for quad in quads {
                debug_assert_eq!(quad.side as usize, side_index);
                mesh.push_quad(quad);
            }
        }

        mesh
    }

    /// Appends one quad: four vertices and two counter-clockwise triangles.
    pub fn push_quad(&mut self, quad: &Quad) {
        let color = quad.color.packed_rgb();
        let num_faces_generated = (self.vertices.len() / 4) as u32;

        self.vertices.extend(
            quad.corners()
                .into_iter()
                .map(|corner| ChunkVertex::new(corner, color)),
        );
        self.indices
            .extend(Self::generate_face_indices(num_faces_generated, quad.side));
        self.side_index_counts[quad.side as usize] += 6;
    }

    /// Generates index data for a face, adjusted by the number of previously generated faces.
    ///
    /// Quad corners run counter-clockwise around the positive axis, so faces
    /// pointing the negative way use the reversed triangle order.
    pub fn generate_face_indices(num_faces_generated: u32, side: BlockSide) -> [u32; 6] {
        let base = num_faces_generated * 4;
        if side.is_positive() {
            [base, base + 1, base + 2, base, base + 2, base + 3]
        } else {
            [base, base + 2, base + 1, base, base + 3, base + 2]
        }
    }

    /// Whether the mesh has no geometry.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of quads in the mesh.
    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Number of indices emitted for the side with index `side`.
    ///
    /// # Panics
    /// Panics if `side` is not in `0..6`. That is a caller bug, not a runtime condition.
    pub fn index_count(&self, side: usize) -> u32 {
        assert!(side < 6, "side index {} out of range 0..6", side);
        self.side_index_counts[side]
    }

    /// Offset of each side's first index within [`indices`](Self::indices).
    pub fn face_offsets(&self) -> [u32; 6] {
        let mut offsets = [0; 6];
        let mut running = 0;
        for (offset, count) in offsets.iter_mut().zip(self.side_index_counts) {
            *offset = running;
            running += count;
        }
        offsets
    }
}
