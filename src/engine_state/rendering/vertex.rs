//! Vertex data structures and layouts for voxel rendering.
//!
//! This module defines the vertex format stored in the vertex pool and the
//! matching layout description for the render pipeline.

use cgmath::Point3;

/// A vertex of a chunk mesh.
///
/// Positions are relative to the chunk corner. The shader adds the chunk origin,
/// looked up through the draw's `first_instance`.
///
/// # Memory Layout
/// - Position: 3x i32 (12 bytes)
/// - Color: u32, packed `0x00RRGGBB` (4 bytes)
///
/// Total size: 16 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkVertex {
    /// X coordinate relative to the chunk corner
    pub x: i32,
    /// Y coordinate relative to the chunk corner
    pub y: i32,
    /// Z coordinate relative to the chunk corner
    pub z: i32,
    /// Packed RGB color
    pub color: u32,
}

impl ChunkVertex {
    /// Creates a new vertex at a chunk-relative position.
    pub fn new(pos: Point3<i32>, color: u32) -> Self {
        ChunkVertex {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            color,
        }
    }

    /// Chunk-relative position of the vertex.
    pub fn position(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }

    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Sint32x3,
        },
        wgpu::VertexAttribute {
            offset: std::mem::size_of::<[i32; 3]>() as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Uint32,
        },
    ];

    /// Returns the vertex buffer layout description for the shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<i32>)
    /// - `location = 1`: color (u32)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ChunkVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
