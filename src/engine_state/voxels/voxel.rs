//! # Voxel Module
//!
//! The smallest unit of world data: a lattice position and an RGBA color.
//! There is no "air" voxel; an empty cell is simply one the octree holds no leaf for.

use cgmath::{Point3, Vector3};

/// RGBA color of a single voxel.
///
/// # Memory Layout
/// `#[repr(C)]` keeps the four channels contiguous so colors can be handed to
/// the GPU as raw bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VoxelColor {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl VoxelColor {
    /// Creates a color from its four channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        VoxelColor { r, g, b, a }
    }

    /// Packs the color channels into `0x00RRGGBB`, the format stored in
    /// [`ChunkVertex`](crate::engine_state::rendering::ChunkVertex). Alpha is dropped.
    pub fn packed_rgb(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl From<[u8; 4]> for VoxelColor {
    fn from(channels: [u8; 4]) -> Self {
        VoxelColor::new(channels[0], channels[1], channels[2], channels[3])
    }
}

/// A single occupied lattice cell of the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Voxel {
    /// Integer world position of the voxel.
    pub position: Point3<i32>,
    /// Color written into the owning octree leaf.
    pub color: VoxelColor,
}

impl Voxel {
    /// Creates a voxel at `position` with the given color.
    pub fn new(position: Point3<i32>, color: VoxelColor) -> Self {
        Voxel { position, color }
    }
}

/// `position + offset`, or `None` past the edge of the `i32` lattice.
pub fn offset_position(position: Point3<i32>, offset: Vector3<i32>) -> Option<Point3<i32>> {
    Some(Point3::new(
        position.x.checked_add(offset.x)?,
        position.y.checked_add(offset.y)?,
        position.z.checked_add(offset.z)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_rgb_without_alpha() {
        let color = VoxelColor::new(0x12, 0x34, 0x56, 0x78);
        assert_eq!(color.packed_rgb(), 0x0012_3456);
    }

    #[test]
    fn offsets_stop_at_the_lattice_edge() {
        let edge = Point3::new(i32::MAX, 0, i32::MIN);
        assert_eq!(
            offset_position(edge, Vector3::new(-1, 1, 0)),
            Some(Point3::new(i32::MAX - 1, 1, i32::MIN))
        );
        assert_eq!(offset_position(edge, Vector3::new(1, 0, 0)), None);
        assert_eq!(offset_position(edge, Vector3::new(0, 0, -1)), None);
    }

    #[test]
    fn converts_from_channel_array() {
        assert_eq!(VoxelColor::from([0, 150, 0, 255]), VoxelColor::new(0, 150, 0, 255));
    }
}
