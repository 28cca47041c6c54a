//! Binary greedy meshing implementation for voxel rendering.
//!
//! The chunk is first captured into a padded solid array (one voxel of border
//! read from the neighboring chunks). From it, every column along each axis is
//! packed into a `u64`, which turns face culling into two shifts and a mask per
//! column. The exposed faces of each layer are then merged into maximal
//! same-color rectangles.

use bitvec::prelude::*;
use cgmath::Vector3;

use crate::engine_state::voxels::{
    block_side::BlockSide,
    chunk::{Chunk, CHUNK_EXTENT, CHUNK_VOLUME},
    chunk_store::ChunkStore,
    voxel::{offset_position, VoxelColor},
};

use super::{
    face::{plane_axes, Quad},
    mesh::GeneratedMesh,
};

const EXTENT: usize = CHUNK_EXTENT as usize;
/// The extent of a chunk including one voxel of padding on each side.
const PADDED_EXTENT: usize = EXTENT + 2;
const PADDED_PLANE: usize = PADDED_EXTENT * PADDED_EXTENT;
const PADDED_VOLUME: usize = PADDED_PLANE * PADDED_EXTENT;
/// Bits of a column that belong to the chunk itself, after the padding bit is shifted out.
const INTERIOR_MASK: u64 = (1 << EXTENT) - 1;
const LAYER_CELLS: usize = EXTENT * EXTENT;

/// Occupancy and colors of a chunk, plus the occupancy of its face neighbors.
struct ChunkSnapshot {
    /// One bit per padded cell, `x + PADDED_EXTENT * y + PADDED_PLANE * z`.
    solid_array: BitVec,
    /// Colors of the chunk's own voxels, `x + EXTENT * y + EXTENT² * z`.
    colors: Vec<Option<VoxelColor>>,
}

fn padded_index(p: [usize; 3]) -> usize {
    p[0] + PADDED_EXTENT * p[1] + PADDED_PLANE * p[2]
}

fn local_index(p: [usize; 3]) -> usize {
    p[0] + EXTENT * p[1] + LAYER_CELLS * p[2]
}

impl ChunkSnapshot {
    fn capture(store: &ChunkStore, chunk: &Chunk) -> Self {
        let mut solid_array = bitvec![0; PADDED_VOLUME];
        let mut colors = vec![None; CHUNK_VOLUME];

        for voxel in chunk.octree.voxels() {
            let local = chunk.to_local(voxel.position);
            let local = [local.x as usize, local.y as usize, local.z as usize];
            solid_array.set(padded_index([local[0] + 1, local[1] + 1, local[2] + 1]), true);
            colors[local_index(local)] = Some(voxel.color);
        }

        // Only the six face slabs of the padding matter; edges and corners never
        // sit next to an interior voxel along an axis.
        let corner = chunk.corner();
        let is_border = |c: usize| c == 0 || c == PADDED_EXTENT - 1;
        for z in 0..PADDED_EXTENT {
            for y in 0..PADDED_EXTENT {
                for x in 0..PADDED_EXTENT {
                    let borders = [x, y, z].into_iter().filter(|&c| is_border(c)).count();
                    if borders != 1 {
                        continue;
                    }
                    let offset = Vector3::new(x as i32 - 1, y as i32 - 1, z as i32 - 1);
                    let neighbor = offset_position(corner, offset);
                    if neighbor.is_some_and(|neighbor| store.has_voxel(neighbor)) {
                        solid_array.set(padded_index([x, y, z]), true);
                    }
                }
            }
        }

        ChunkSnapshot {
            solid_array,
            colors,
        }
    }

    /// Packs the solid array into columns along `axis`.
    ///
    /// Column `(pu, pv)` lives at `pu * PADDED_EXTENT + pv` and has bit `c` set when
    /// the padded cell at coordinate `c` along `axis` is solid.
    fn columns(&self, axis: usize) -> [u64; PADDED_PLANE] {
        let (u_axis, v_axis) = plane_axes(axis);
        let mut columns = [0u64; PADDED_PLANE];

        for index in self.solid_array.iter_ones() {
            let p = [
                index % PADDED_EXTENT,
                (index / PADDED_EXTENT) % PADDED_EXTENT,
                index / PADDED_PLANE,
            ];
            columns[p[u_axis] * PADDED_EXTENT + p[v_axis]] |= 1 << p[axis];
        }

        columns
    }

    fn color(&self, local: [usize; 3]) -> Option<VoxelColor> {
        self.colors[local_index(local)]
    }
}

/// Exposed-face bits of the chunk's own columns for one side.
///
/// Entry `lu * EXTENT + lv` has bit `c` set when the voxel at layer `c` is solid
/// and its neighbor in the side's direction is not.
fn exposed_faces(columns: &[u64; PADDED_PLANE], side: BlockSide) -> [u64; LAYER_CELLS] {
    let mut faces = [0u64; LAYER_CELLS];

    for lu in 0..EXTENT {
        for lv in 0..EXTENT {
            let column = columns[(lu + 1) * PADDED_EXTENT + lv + 1];
            let culled = if side.is_positive() {
                column & !(column >> 1)
            } else {
                column & !(column << 1)
            };
            faces[lu * EXTENT + lv] = (culled >> 1) & INTERIOR_MASK;
        }
    }

    faces
}

/// Merges the quad keys of one layer into maximal rectangles.
///
/// `grid` is indexed `v * EXTENT + u`. Consumed cells are cleared so each face
/// ends up in exactly one quad.
fn merge_layer(
    grid: &mut [Option<VoxelColor>; LAYER_CELLS],
    side: BlockSide,
    layer: usize,
    quads: &mut Vec<Quad>,
) {
    for v in 0..EXTENT {
        let mut u = 0;
        while u < EXTENT {
            let Some(color) = grid[v * EXTENT + u] else {
                u += 1;
                continue;
            };

            let mut width = 1;
            while u + width < EXTENT && grid[v * EXTENT + u + width] == Some(color) {
                width += 1;
            }

            let mut height = 1;
            'grow: while v + height < EXTENT {
                for du in 0..width {
                    if grid[(v + height) * EXTENT + u + du] != Some(color) {
                        break 'grow;
                    }
                }
                height += 1;
            }

            for dv in 0..height {
                for du in 0..width {
                    grid[(v + dv) * EXTENT + u + du] = None;
                }
            }

            quads.push(Quad {
                side,
                layer: layer as i32,
                u: u as i32,
                v: v as i32,
                width: width as i32,
                height: height as i32,
                color,
            });
            u += width;
        }
    }
}

/// Generates a greedy-merged mesh for `chunk`.
///
/// # Performance
/// Culling costs a handful of bit operations per column; merging is linear in the
/// number of exposed faces per layer. Quad count drops from one per exposed face
/// to one per maximal same-color rectangle.
pub fn greedy(store: &ChunkStore, chunk: &Chunk) -> GeneratedMesh {
    let snapshot = ChunkSnapshot::capture(store, chunk);
    let mut quads_per_side: [Vec<Quad>; 6] = Default::default();

    for axis in 0..3 {
        let columns = snapshot.columns(axis);
        let (u_axis, v_axis) = plane_axes(axis);

        for side in BlockSide::all().into_iter().filter(|s| s.axis() == axis) {
            let faces = exposed_faces(&columns, side);

            for layer in 0..EXTENT {
                let mut grid = [None; LAYER_CELLS];
                let mut any = false;

                for lu in 0..EXTENT {
                    for lv in 0..EXTENT {
                        if faces[lu * EXTENT + lv] >> layer & 1 == 0 {
                            continue;
                        }
                        let mut local = [0; 3];
                        local[axis] = layer;
                        local[u_axis] = lu;
                        local[v_axis] = lv;
                        grid[lv * EXTENT + lu] = snapshot.color(local);
                        any = true;
                    }
                }

                if any {
                    merge_layer(&mut grid, side, layer, &mut quads_per_side[side as usize]);
                }
            }
        }
    }

    GeneratedMesh::from_quads(chunk.corner(), &quads_per_side)
}
