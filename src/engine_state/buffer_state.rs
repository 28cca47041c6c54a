//! # Buffer State Module
//!
//! This module provides a centralized system for managing GPU buffers in the voxel engine.
//! It handles buffer creation, resizing and writing, and keeps analytics on memory usage.
//!
//! ## Key Features
//!
//! * Centralized buffer management with named references
//! * Buffer usage analytics and memory tracking
//! * Bounds-checked buffer writes that report errors instead of panicking
//! * Recreation of the pool buffers when the host-side pools outgrow them
//!
//! ## Architecture
//!
//! The `BufferState` struct serves as a registry for all GPU buffers used by the engine.
//! Buffers are referenced by name (static string). Writes arrive as
//! [`BufferWriteCommand`]s produced by the render bridge.

use std::collections::HashMap;
use std::fmt::Debug;

use bytemuck::NoUninit;
use log::{debug, info, warn};
use thiserror::Error;
use wgpu::{util::DrawIndexedIndirectArgs, Buffer, BufferUsages, Device, Queue};

use crate::engine_state::{
    rendering::{
        meshing::vertex_pool::VertexPool,
        render_bridge::{
            CHUNK_ORIGIN_BUFFER, CHUNK_ORIGIN_STRIDE, INDEX_POOL_BUFFER, INDIRECT_ARGS_SIZE,
            INDIRECT_BUFFER, VERTEX_POOL_BUFFER,
        },
    },
    voxels::chunk_store::ChunkStore,
};

/// Smallest size a registered buffer is created with.
const MIN_BUFFER_SIZE: u64 = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("no buffer named '{buffer_name}'")]
    UnknownBuffer { buffer_name: &'static str },
    #[error("write of {size} bytes at offset {offset} exceeds buffer '{buffer_name}' of {capacity} bytes")]
    OutOfBounds {
        buffer_name: &'static str,
        offset: u64,
        size: u64,
        capacity: u64,
    },
}

/// Analytics data for a GPU buffer
///
/// Tracks memory allocation, usage, and write operations for a buffer
/// to help identify optimization opportunities.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    pub allocated_memory: u64,
    /// Actual memory used in the buffer in bytes (based on writes)
    pub used_memory: u64,
    /// Number of times the buffer has been written to
    pub times_written: u64,
}

/// Central manager for GPU buffers in the voxel engine
///
/// Provides a registry for creating, accessing, and writing to GPU buffers.
/// Buffers are referenced by name (static string) and their usage is tracked
/// for optimization purposes.
///
/// # Examples
///
/// ```no_run
/// use voxel_engine::engine_state::buffer_state::{request_headless_device, BufferState};
///
/// let (device, queue) = pollster::block_on(request_headless_device()).unwrap();
/// let mut buffer_state = BufferState::new(device, queue);
/// buffer_state.ensure_capacity(
///     "storage_buffer",
///     1024,
///     wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
/// );
/// buffer_state
///     .write_buffer("storage_buffer", 0, bytemuck::cast_slice(&[1u32, 2, 3, 4]))
///     .unwrap();
/// ```
pub struct BufferState {
    /// The GPU device
    pub device: Device,
    /// The GPU command queue
    pub queue: Queue,
    /// Map of buffer names to buffer objects
    buffers: HashMap<&'static str, Buffer>,
    /// Analytics data for each buffer
    buffer_analytics: HashMap<&'static str, BufferAnalytics>,
}

impl BufferState {
    /// Creates a new buffer state manager with empty buffer collections
    pub fn new(device: Device, queue: Queue) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            buffer_analytics: HashMap::new(),
        }
    }

    /// Creates an empty buffer with the specified descriptor, replacing any
    /// buffer registered under the same name.
    pub fn create_buffer(
        &mut self,
        buffer_name: &'static str,
        buffer_descriptor: wgpu::BufferDescriptor,
    ) {
        let buffer_analytics = BufferAnalytics {
            allocated_memory: buffer_descriptor.size,
            used_memory: 0,
            times_written: 0,
        };
        let buffer = self.device.create_buffer(&buffer_descriptor);

        if let Some(old) = self.buffers.insert(buffer_name, buffer) {
            old.destroy();
        }
        self.buffer_analytics.insert(buffer_name, buffer_analytics);
    }

    /// Makes sure `buffer_name` exists with at least `size` bytes.
    ///
    /// A buffer that is too small is recreated empty at the next power of two.
    /// Returns `true` when a buffer was (re)created, in which case its previous
    /// contents are gone.
    pub fn ensure_capacity(
        &mut self,
        buffer_name: &'static str,
        size: u64,
        usage: BufferUsages,
    ) -> bool {
        let current = self
            .buffer_analytics
            .get(buffer_name)
            .map(|analytics| analytics.allocated_memory);
        if current.is_some_and(|allocated| allocated >= size) {
            return false;
        }

        let new_size = size.max(MIN_BUFFER_SIZE).next_power_of_two();
        info!(
            "Creating buffer '{}' with {} bytes (was {:?})",
            buffer_name, new_size, current
        );
        self.create_buffer(
            buffer_name,
            wgpu::BufferDescriptor {
                label: Some(buffer_name),
                size: new_size,
                usage: usage | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            },
        );
        true
    }

    /// Sizes the pool, origin and indirect buffers for the current frame.
    ///
    /// If any of them had to be recreated, every pool range is scheduled for
    /// upload again.
    pub fn ensure_pool_buffers(
        &mut self,
        store: &ChunkStore,
        pool: &mut VertexPool,
        draw_count: usize,
    ) -> bool {
        let origin_count = store.chunks().map(|chunk| chunk.id as u64 + 1).max().unwrap_or(1);

        let recreated = [
            self.ensure_capacity(
                VERTEX_POOL_BUFFER,
                pool.vertices.byte_size(),
                BufferUsages::VERTEX,
            ),
            self.ensure_capacity(
                INDEX_POOL_BUFFER,
                pool.indices.byte_size(),
                BufferUsages::INDEX,
            ),
            self.ensure_capacity(
                CHUNK_ORIGIN_BUFFER,
                origin_count * CHUNK_ORIGIN_STRIDE,
                BufferUsages::STORAGE,
            ),
            self.ensure_capacity(
                INDIRECT_BUFFER,
                draw_count.max(1) as u64 * INDIRECT_ARGS_SIZE,
                BufferUsages::INDIRECT,
            ),
        ]
        .contains(&true);

        if recreated {
            pool.mark_all_dirty();
        }
        recreated
    }

    /// Writes data to a buffer using a command structure
    pub fn write(&mut self, buffer_command: BufferWriteCommand) -> Result<(), BufferError> {
        debug!("Executing {:?}", buffer_command);
        self.write_buffer(
            buffer_command.buffer_name,
            buffer_command.offset,
            buffer_command.data.as_bytes(),
        )
    }

    /// Executes every command in order, stopping at the first failure.
    pub fn submit(&mut self, commands: Vec<BufferWriteCommand>) -> Result<usize, BufferError> {
        let count = commands.len();
        for command in commands {
            self.write(command)?;
        }
        self.queue.submit([]);
        Ok(count)
    }

    /// Writes raw byte data to a buffer
    ///
    /// # Errors
    ///
    /// Fails if the buffer does not exist or if the write would exceed buffer bounds
    pub fn write_buffer(
        &mut self,
        buffer_name: &'static str,
        offset: wgpu::BufferAddress,
        data: &[u8],
    ) -> Result<(), BufferError> {
        let (Some(buffer), Some(buffer_analytics)) = (
            self.buffers.get(buffer_name),
            self.buffer_analytics.get_mut(buffer_name),
        ) else {
            return Err(BufferError::UnknownBuffer { buffer_name });
        };

        let buffer_size = buffer_analytics.allocated_memory;
        let data_size = data.len() as u64;

        if offset + data_size > buffer_size {
            return Err(BufferError::OutOfBounds {
                buffer_name,
                offset,
                size: data_size,
                capacity: buffer_size,
            });
        }

        self.queue.write_buffer(buffer, offset, data);
        buffer_analytics.used_memory = buffer_analytics.used_memory.max(offset + data_size);
        buffer_analytics.times_written += 1;
        Ok(())
    }

    /// Gets a reference to a buffer by name
    pub fn get_buffer(&self, buffer_name: &'static str) -> Option<&Buffer> {
        self.buffers.get(buffer_name)
    }

    /// Analytics of a single buffer
    pub fn analytics(&self, buffer_name: &'static str) -> Option<BufferAnalytics> {
        self.buffer_analytics.get(buffer_name).copied()
    }

    /// Gets the total allocated memory across all buffers in bytes
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.buffer_analytics
            .values()
            .fold(0, |acc, buffer_analytics| acc + buffer_analytics.allocated_memory)
    }

    /// Gets the total used memory across all buffers in bytes
    pub fn get_total_used_memory(&self) -> u64 {
        self.buffer_analytics
            .values()
            .fold(0, |acc, buffer_analytics| acc + buffer_analytics.used_memory)
    }
}

/// Requests a device without a surface.
///
/// Returns `None` when no adapter or device is available, e.g. on CI machines.
pub async fn request_headless_device() -> Option<(Device, Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        flags: wgpu::InstanceFlags::empty(),
        backend_options: wgpu::BackendOptions::from_env_or_default(),
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|err| warn!("No GPU adapter available: {}", err))
        .ok()?;

    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Voxel Engine Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|err| warn!("GPU device request failed: {}", err))
        .ok()
}

/// Command for writing data to a buffer
///
/// This structure encapsulates all information needed to write data to a buffer,
/// including the buffer name, offset, and the data itself.
pub struct BufferWriteCommand {
    /// Descriptive name for the command (for debugging)
    pub name: String,
    /// Name of the target buffer
    pub buffer_name: &'static str,
    /// Byte offset in the buffer to start writing
    pub offset: u64,
    /// Data to write to the buffer
    pub data: Box<dyn AsBytes + Send + Sync>,
}

impl Debug for BufferWriteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferWriteCommand")
            .field("name", &self.name)
            .field("buffer_name", &self.buffer_name)
            .field("offset", &self.offset)
            .field("len", &self.data.as_bytes().len())
            .finish()
    }
}

/// Trait for types that can be converted to bytes for buffer writing
///
/// This trait is implemented for common types that can be safely converted to
/// raw bytes for GPU buffer operations.
pub trait AsBytes {
    /// Converts the value to a byte slice
    fn as_bytes(&self) -> &[u8];
}

impl<T> AsBytes for Vec<T>
where
    T: NoUninit + Send + Sync,
{
    fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self)
    }
}

impl<T, const N: usize> AsBytes for [T; N]
where
    T: NoUninit + Send + Sync,
{
    fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self)
    }
}

impl AsBytes for DrawIndexedIndirectArgs {
    fn as_bytes(&self) -> &[u8] {
        DrawIndexedIndirectArgs::as_bytes(self)
    }
}
