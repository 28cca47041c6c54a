use cgmath::Point3;

use crate::engine_state::voxels::{block_side::BlockSide, voxel::VoxelColor};

/// An axis-aligned rectangle of merged voxel faces.
///
/// A quad lives on one side of the voxels in `layer` (the chunk-local coordinate
/// along the side's axis). Its extent is given in the two remaining axes: `u` is
/// axis `(axis + 1) % 3` and `v` is axis `(axis + 2) % 3`. That choice makes
/// `u × v` point along the positive axis, which fixes the winding of every quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad {
    /// Which side of the voxels this quad covers
    pub side: BlockSide,
    /// Chunk-local coordinate of the covered voxels along the side's axis
    pub layer: i32,
    /// Chunk-local origin along the u axis
    pub u: i32,
    /// Chunk-local origin along the v axis
    pub v: i32,
    /// Number of merged voxels along u
    pub width: i32,
    /// Number of merged voxels along v
    pub height: i32,
    /// Color shared by every merged face
    pub color: VoxelColor,
}

/// The (u, v) axes of the plane perpendicular to `axis`.
pub fn plane_axes(axis: usize) -> (usize, usize) {
    ((axis + 1) % 3, (axis + 2) % 3)
}

impl Quad {
    /// A single voxel face at the chunk-local position `local`.
    pub fn unit(side: BlockSide, local: Point3<i32>, color: VoxelColor) -> Self {
        let local = [local.x, local.y, local.z];
        let (u_axis, v_axis) = plane_axes(side.axis());
        Quad {
            side,
            layer: local[side.axis()],
            u: local[u_axis],
            v: local[v_axis],
            width: 1,
            height: 1,
            color,
        }
    }

    /// Number of voxel faces covered.
    pub fn area(&self) -> i32 {
        self.width * self.height
    }

    /// The four chunk-local corners, counter-clockwise around the positive axis:
    /// origin, origin + u, origin + u + v, origin + v.
    pub fn corners(&self) -> [Point3<i32>; 4] {
        let axis = self.side.axis();
        let (u_axis, v_axis) = plane_axes(axis);

        let mut origin = [0; 3];
        origin[axis] = self.layer + i32::from(self.side.is_positive());
        origin[u_axis] = self.u;
        origin[v_axis] = self.v;

        let offset = |du: i32, dv: i32| {
            let mut corner = origin;
            corner[u_axis] += du;
            corner[v_axis] += dv;
            Point3::new(corner[0], corner[1], corner[2])
        };

        [
            offset(0, 0),
            offset(self.width, 0),
            offset(self.width, self.height),
            offset(0, self.height),
        ]
    }
}
