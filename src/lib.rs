#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Engine
//!
//! Sparse voxel storage, chunk meshing and GPU vertex pooling for a real-time
//! voxel game, built with Rust and WGPU.
//!
//! ## Key Modules
//!
//! * `core` - Configuration and profiling utilities used throughout the engine
//! * `engine_state` - The engine components: voxels, meshing, the vertex pool and GPU buffers
//!
//! ## Architecture
//!
//! The engine follows a modular architecture with clear separation between:
//! * Voxel data management (octrees inside fixed-size chunks)
//! * Meshing (binary greedy or per-face)
//! * Host-side memory management of mesh data (the vertex pool)
//! * GPU resource management (based on WGPU)
//!
//! ## Usage
//!
//! ```rust
//! use cgmath::Point3;
//! use voxel_engine::{core::config::EngineConfig, EngineState, VoxelColor};
//!
//! let mut engine_state = EngineState::new(&EngineConfig::default());
//! engine_state
//!     .chunk_store
//!     .add_voxel(Point3::new(3, 3, 3), VoxelColor::new(200, 50, 50, 255))
//!     .unwrap();
//!
//! let frame = engine_state.update(None).unwrap();
//! assert_eq!(frame.remesh.quads, 6);
//! ```
//!
//! ## Performance Considerations
//!
//! * Chunk-based voxel storage keeps edits local
//! * Binary greedy meshing culls whole columns with a few bit operations
//! * Only dirty chunks are remeshed and only dirty pool ranges are uploaded

use log::info;

pub mod core;
pub mod engine_state;
pub mod error;

pub use engine_state::{
    buffer_state::BufferState,
    rendering::{
        meshing::vertex_pool::{PoolError, VertexPool},
        ChunkMesher, ChunkVertex, GeneratedMesh, MeshingMode, RenderBridge,
    },
    voxels::{
        block_side::BlockSide,
        chunk::Chunk,
        chunk_store::ChunkStore,
        error::VoxelError,
        octree::VoxelOctree,
        voxel::{Voxel, VoxelColor},
    },
    EngineState,
};
pub use error::Error;

use crate::{core::config::EngineConfig, engine_state::buffer_state::request_headless_device};

pub const APPLICATION_INITIALIZATION_STOPWATCH: &str = "Application Initialization";

/// Runs the demo: generates terrain, meshes it and uploads it to a headless
/// device when one is available.
pub fn run() -> Result<(), Error> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = EngineConfig::from_env()?;
    let mut engine_state = EngineState::new(&config);
    engine_state
        .stopwatches
        .start_timer(APPLICATION_INITIALIZATION_STOPWATCH);

    engine_state.generate_terrain(&config)?;

    let mut buffer_state = pollster::block_on(request_headless_device())
        .map(|(device, queue)| BufferState::new(device, queue));
    if buffer_state.is_none() {
        info!("No GPU device available, running headless");
    }

    let frame = engine_state.update(buffer_state.as_mut())?;

    if let Some(elapsed) = engine_state
        .stopwatches
        .finish_timer(APPLICATION_INITIALIZATION_STOPWATCH)
    {
        info!("Initialization took {:?}", elapsed);
    }
    info!(
        "Frame {}: {} chunks, {} quads, {} draws, {} buffer writes (submitted: {})",
        frame.frame,
        frame.remesh.chunks_meshed,
        frame.remesh.quads,
        frame.draws.len(),
        frame.write_commands,
        frame.submitted
    );

    if let Some(buffer_state) = &buffer_state {
        info!(
            "GPU memory: {} bytes allocated, {} bytes used",
            buffer_state.get_total_allocated_memory(),
            buffer_state.get_total_used_memory()
        );
    }

    Ok(())
}
