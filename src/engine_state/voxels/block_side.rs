//! # Block Side Module
//!
//! This module defines the six axis-aligned faces of a voxel. Face culling,
//! greedy merging and per-side draw ranges are all indexed by `BlockSide`.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel.
///
/// Sides are ordered in pairs per axis (negative first), so `side as usize / 2`
/// is the axis the face is perpendicular to and `side as usize % 2` tells whether
/// it faces the positive direction.
///
/// The order is: [LEFT, RIGHT, BOTTOM, TOP, BACK, FRONT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The left face (facing negative X)
    LEFT = 0,

    /// The right face (facing positive X)
    RIGHT = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The back face (facing negative Z)
    BACK = 4,

    /// The front face (facing positive Z)
    FRONT = 5,
}

impl BlockSide {
    /// Returns an array containing all six faces in index order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::LEFT,
            BlockSide::RIGHT,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::BACK,
            BlockSide::FRONT,
        ]
    }

    /// Looks up a side from its index, `None` outside `0..6`.
    pub fn from_index(index: usize) -> Option<BlockSide> {
        Self::all().get(index).copied()
    }

    /// The axis (0 = X, 1 = Y, 2 = Z) this face is perpendicular to.
    pub fn axis(self) -> usize {
        self as usize / 2
    }

    /// Whether the face normal points along the positive axis.
    pub fn is_positive(self) -> bool {
        self as usize % 2 == 1
    }

    /// Unit normal of the face.
    pub fn normal(self) -> Vector3<i32> {
        let mut normal = [0; 3];
        normal[self.axis()] = if self.is_positive() { 1 } else { -1 };
        Vector3::new(normal[0], normal[1], normal[2])
    }
}
