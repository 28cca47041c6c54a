//! Rendering side of the voxel engine.
//!
//! This module contains everything between voxel data and GPU buffers: the
//! chunk meshers, the vertex pool that packs all chunk meshes into two buffers,
//! and the render bridge that turns the pool into draw and upload commands.
//! Shaders and pipelines live with the application that owns the surface.

pub mod meshing;
pub mod render_bridge;
mod vertex;

// Re-export commonly used types
pub use meshing::{ChunkMesher, GeneratedMesh, MeshingMode};
pub use render_bridge::RenderBridge;
pub use vertex::ChunkVertex;
