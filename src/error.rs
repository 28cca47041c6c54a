//! Crate-level error type.

use thiserror::Error;

use crate::{
    core::config::ConfigError,
    engine_state::{
        buffer_state::BufferError, rendering::meshing::vertex_pool::PoolError,
        voxels::error::VoxelError,
    },
};

/// Any error the engine can surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Voxel(#[from] VoxelError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}
