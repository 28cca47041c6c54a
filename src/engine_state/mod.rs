//! # Engine State Module
//!
//! The core engine module that owns the state of the voxel engine.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `buffer_state` - Manages GPU buffers and executes write commands
//! * `rendering` - Meshing, the vertex pool and the render bridge
//! * `voxels` - Voxel data, chunks, octrees and terrain generation
//!
//! ## Architecture
//!
//! `EngineState` is the single owner of the chunk store, the vertex pool and the
//! mesher. Subsystems never reach each other through globals; everything flows
//! through [`EngineState::update`], once per frame:
//!
//! 1. remesh every dirty chunk and store the meshes in the vertex pool
//! 2. size the GPU buffers for the pool, if a device is attached
//! 3. turn not-yet-uploaded ranges into buffer write commands and execute them

use log::{debug, info, warn};
use web_time::Duration;
use wgpu::util::DrawIndexedIndirectArgs;

use crate::{
    core::{config::EngineConfig, stopwatch::Stopwatches},
    error::Error,
};

use buffer_state::{BufferError, BufferState, BufferWriteCommand};
use rendering::{
    meshing::{remesh_dirty_chunks, vertex_pool::VertexPool, RemeshStats},
    ChunkMesher, RenderBridge,
};
use voxels::{
    chunk_store::ChunkStore,
    error::VoxelError,
    terrain::{generate_terrain, PerlinTerrain},
};

pub mod buffer_state;
pub mod rendering;
pub mod voxels;

/// Stopwatch covering the remesh pass of a frame
pub const REMESH_STOPWATCH: &str = "Remesh Dirty Chunks";
/// Stopwatch covering upload preparation and submission
pub const UPLOAD_STOPWATCH: &str = "Upload Dirty Ranges";

/// What one call to [`EngineState::update`] produced.
#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    /// Frame counter, starting at 1
    pub frame: u64,
    pub remesh: RemeshStats,
    /// Indirect draws for the current pool layout
    pub draws: Vec<DrawIndexedIndirectArgs>,
    /// Number of buffer write commands generated
    pub write_commands: usize,
    /// Whether the commands were executed against a device
    pub submitted: bool,
    pub remesh_time: Option<Duration>,
    pub upload_time: Option<Duration>,
}

/// The main state container for the voxel engine
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_engine::{core::config::EngineConfig, EngineState, VoxelColor};
///
/// let mut engine_state = EngineState::new(&EngineConfig::default());
/// engine_state
///     .chunk_store
///     .add_voxel(Point3::new(0, 0, 0), VoxelColor::new(255, 255, 255, 255))
///     .unwrap();
///
/// let frame = engine_state.update(None).unwrap();
/// assert_eq!(frame.remesh.quads, 6);
/// ```
pub struct EngineState {
    /// All chunks and their voxels
    pub chunk_store: ChunkStore,
    /// Host mirror of the GPU vertex and index pools
    pub vertex_pool: VertexPool,
    pub mesher: ChunkMesher,
    pub render_bridge: RenderBridge,
    pub stopwatches: Stopwatches,
    frame: u64,
}

impl EngineState {
    /// Creates an empty world with pools and meshing set up from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        info!(
            "Creating engine state: {:?} meshing, pools of {} vertices and {} indices",
            config.meshing_mode, config.vertex_pool_capacity, config.index_pool_capacity
        );

        Self {
            chunk_store: ChunkStore::new(),
            vertex_pool: VertexPool::new(
                config.vertex_pool_capacity,
                config.index_pool_capacity,
                config.pool_growth_increment,
            ),
            mesher: ChunkMesher::new(config.meshing_mode),
            render_bridge: RenderBridge::new(config.per_face_draws),
            stopwatches: Stopwatches::new(),
            frame: 0,
        }
    }

    /// Fills the world with Perlin terrain as described by the `terrain` section.
    pub fn generate_terrain(&mut self, config: &EngineConfig) -> Result<usize, VoxelError> {
        let terrain = PerlinTerrain::from_config(&config.terrain);
        generate_terrain(
            &mut self.chunk_store,
            &terrain,
            config.terrain.radius_chunks,
            config.terrain.seed,
        )
    }

    /// Remeshes dirty chunks, timed under [`REMESH_STOPWATCH`].
    pub fn remesh_dirty_chunks(&mut self) -> Result<RemeshStats, Error> {
        self.stopwatches.start_timer(REMESH_STOPWATCH);
        let stats = remesh_dirty_chunks(&mut self.chunk_store, &self.mesher, &mut self.vertex_pool);
        self.stopwatches.finish_timer(REMESH_STOPWATCH);
        Ok(stats?)
    }

    /// Runs one frame.
    ///
    /// Without a `buffer_state` the upload commands are still generated (and the
    /// ranges marked uploaded) but not executed.
    pub fn update(&mut self, buffer_state: Option<&mut BufferState>) -> Result<FrameOutput, Error> {
        self.frame += 1;
        let remesh = self.remesh_dirty_chunks()?;
        let remesh_time = self.stopwatches.last_duration(REMESH_STOPWATCH);

        self.stopwatches.start_timer(UPLOAD_STOPWATCH);
        let draws = self.render_bridge.indirect_commands(&self.vertex_pool);

        let submitted = buffer_state.is_some();
        let uploaded = match buffer_state {
            Some(buffer_state) => {
                buffer_state.ensure_pool_buffers(&self.chunk_store, &mut self.vertex_pool, draws.len());
                self.upload_dirty_ranges(|commands| buffer_state.submit(commands))
            }
            None => self.upload_dirty_ranges(|commands| Ok(commands.len())),
        };
        let upload_time = self.stopwatches.finish_timer(UPLOAD_STOPWATCH);
        let write_commands = uploaded?;

        debug!(
            "Frame {}: {} chunks remeshed, {} draws, {} writes",
            self.frame,
            remesh.chunks_meshed,
            draws.len(),
            write_commands
        );

        Ok(FrameOutput {
            frame: self.frame,
            remesh,
            draws,
            write_commands,
            submitted,
            remesh_time,
            upload_time,
        })
    }

    /// Hands the dirty-range write commands to `submit`.
    ///
    /// Ranges are marked uploaded while the commands are built; if `submit`
    /// fails the whole pool is marked dirty again so the next frame retries.
    fn upload_dirty_ranges<F>(&mut self, submit: F) -> Result<usize, Error>
    where
        F: FnOnce(Vec<BufferWriteCommand>) -> Result<usize, BufferError>,
    {
        let commands = self
            .render_bridge
            .dirty_upload_commands(&self.chunk_store, &mut self.vertex_pool);

        submit(commands).map_err(|err| {
            warn!("Upload failed, scheduling a full re-upload: {}", err);
            self.vertex_pool.mark_all_dirty();
            Error::from(err)
        })
    }

    /// Number of frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
