//! Translation of the vertex pool into GPU work.
//!
//! Every frame the bridge reads the pool's occupied ranges and produces two
//! things: indirect draw arguments (one per chunk, or one per visible side of a
//! chunk) and [`BufferWriteCommand`]s for the spans that changed since the last
//! upload. Nothing here touches the device; [`BufferState`](crate::engine_state::buffer_state::BufferState)
//! executes the commands.

use std::collections::HashSet;

use log::debug;
use wgpu::util::DrawIndexedIndirectArgs;

use crate::engine_state::{
    buffer_state::BufferWriteCommand,
    rendering::{
        meshing::vertex_pool::{ChunkMemoryRange, VertexPool},
        ChunkVertex,
    },
    voxels::chunk_store::ChunkStore,
};

/// Name of the GPU buffer mirroring the vertex pool
pub const VERTEX_POOL_BUFFER: &str = "Vertex Pool Buffer";
/// Name of the GPU buffer mirroring the index pool
pub const INDEX_POOL_BUFFER: &str = "Index Pool Buffer";
/// Name of the buffer holding the indirect draw arguments
pub const INDIRECT_BUFFER: &str = "Indirect Buffer";
/// Name of the buffer holding one chunk corner per chunk id, read through `first_instance`
pub const CHUNK_ORIGIN_BUFFER: &str = "Chunk Origin Buffer";

/// Size of one entry of the chunk origin buffer (`vec4<i32>`).
pub const CHUNK_ORIGIN_STRIDE: u64 = std::mem::size_of::<[i32; 4]>() as u64;

/// Size of one indirect draw in bytes.
pub const INDIRECT_ARGS_SIZE: u64 = std::mem::size_of::<DrawIndexedIndirectArgs>() as u64;

/// Builds draw and upload commands from the vertex pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderBridge {
    /// Issue one draw per non-empty side instead of one per chunk
    pub per_face_draws: bool,
}

impl RenderBridge {
    pub fn new(per_face_draws: bool) -> Self {
        RenderBridge { per_face_draws }
    }

    /// One draw per occupied index range, or per non-empty side of it.
    ///
    /// `first_instance` carries the chunk id so the shader can fetch the chunk
    /// origin. Draws are ordered by chunk id.
    pub fn indirect_commands(&self, pool: &VertexPool) -> Vec<DrawIndexedIndirectArgs> {
        let mut index_ranges = pool.indices.occupied_ranges();
        index_ranges.sort_by_key(|range| range.chunk_id);

        let mut commands = Vec::with_capacity(index_ranges.len());
        for index_range in index_ranges {
            let Some(vertex_range) = pool.vertices.range(index_range.chunk_id) else {
                continue;
            };
            let draw = |first: u32, count: u32| DrawIndexedIndirectArgs {
                index_count: count,
                instance_count: 1,
                first_index: index_range.start + first,
                base_vertex: vertex_range.start as i32,
                first_instance: index_range.chunk_id,
            };

            match index_range.face_spans() {
                Some(spans) if self.per_face_draws => commands.extend(
                    spans
                        .into_iter()
                        .filter(|&(_, count)| count > 0)
                        .map(|(first, count)| draw(first, count)),
                ),
                _ => commands.push(draw(0, index_range.object_count)),
            }
        }

        commands
    }

    /// Write commands for every span that is not on the GPU yet.
    ///
    /// Covers pool ranges, the origins of their chunks and, when the range table
    /// changed, the indirect buffer. Marks the ranges uploaded and clears the
    /// pool's update flag.
    pub fn dirty_upload_commands(
        &self,
        store: &ChunkStore,
        pool: &mut VertexPool,
    ) -> Vec<BufferWriteCommand> {
        let mut commands = Vec::new();
        let mut uploaded_chunks = HashSet::new();

        for range in pool.vertices.dirty_ranges() {
            commands.push(range_write(
                VERTEX_POOL_BUFFER,
                &range,
                std::mem::size_of::<ChunkVertex>() as u64,
                pool.vertices.slice(&range).to_vec(),
            ));
            pool.vertices.mark_uploaded(range.chunk_id);
            uploaded_chunks.insert(range.chunk_id);
        }

        for range in pool.indices.dirty_ranges() {
            commands.push(range_write(
                INDEX_POOL_BUFFER,
                &range,
                std::mem::size_of::<u32>() as u64,
                pool.indices.slice(&range).to_vec(),
            ));
            pool.indices.mark_uploaded(range.chunk_id);
        }

        let mut chunks: Vec<_> = store
            .chunks()
            .filter(|chunk| uploaded_chunks.contains(&chunk.id))
            .collect();
        chunks.sort_by_key(|chunk| chunk.id);
        for chunk in chunks {
            let corner = chunk.corner();
            commands.push(BufferWriteCommand {
                name: format!("Chunk Origin Write - Chunk {}", chunk.id),
                buffer_name: CHUNK_ORIGIN_BUFFER,
                offset: chunk.id as u64 * CHUNK_ORIGIN_STRIDE,
                data: Box::new([corner.x, corner.y, corner.z, 0]),
            });
        }

        if pool.has_new_update() {
            let indirect = self.indirect_commands(pool);
            if !indirect.is_empty() {
                let bytes: Vec<u8> = indirect
                    .iter()
                    .flat_map(|args| args.as_bytes().iter().copied())
                    .collect();
                commands.push(BufferWriteCommand {
                    name: format!("Indirect Write - {} draws", indirect.len()),
                    buffer_name: INDIRECT_BUFFER,
                    offset: 0,
                    data: Box::new(bytes),
                });
            }
            pool.clear_new_update();
        }

        debug!("Prepared {} buffer write commands", commands.len());
        commands
    }
}

fn range_write<T>(
    buffer_name: &'static str,
    range: &ChunkMemoryRange,
    stride: u64,
    data: Vec<T>,
) -> BufferWriteCommand
where
    T: bytemuck::NoUninit + Send + Sync,
{
    BufferWriteCommand {
        name: format!(
            "{} Write - Chunk {} - Range [{}, {})",
            buffer_name, range.chunk_id, range.start, range.end
        ),
        buffer_name,
        offset: range.start as u64 * stride,
        data: Box::new(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        buffer_state::AsBytes,
        rendering::meshing::mesh::{naive, GeneratedMesh},
        voxels::voxel::VoxelColor,
    };
    use cgmath::Point3;

    fn single_voxel_pool() -> (ChunkStore, VertexPool, u32) {
        let mut store = ChunkStore::new();
        store
            .add_voxel(Point3::new(3, 3, 3), VoxelColor::new(10, 20, 30, 255))
            .unwrap();
        let chunk = store.chunk_at(Point3::new(3.5, 3.5, 3.5)).unwrap();
        let mesh = naive(&store, chunk);
        let chunk_id = chunk.id;

        let mut pool = VertexPool::new(512, 512, 512);
        pool.store_mesh(chunk_id, &mesh).unwrap();
        (store, pool, chunk_id)
    }

    #[test]
    fn per_chunk_and_per_face_draws() {
        let (_, pool, chunk_id) = single_voxel_pool();

        let per_chunk = RenderBridge::new(false).indirect_commands(&pool);
        assert_eq!(per_chunk.len(), 1);
        assert_eq!(per_chunk[0].index_count, 36);
        assert_eq!(per_chunk[0].first_instance, chunk_id);

        let per_face = RenderBridge::new(true).indirect_commands(&pool);
        assert_eq!(per_face.len(), 6);
        for (side, args) in per_face.iter().enumerate() {
            assert_eq!(args.index_count, 6);
            assert_eq!(args.first_index, side as u32 * 6);
            assert_eq!(args.base_vertex, 0);
        }
    }

    #[test]
    fn uploads_only_dirty_ranges() {
        let (store, mut pool, _) = single_voxel_pool();
        let bridge = RenderBridge::new(true);

        let commands = bridge.dirty_upload_commands(&store, &mut pool);
        let names: Vec<_> = commands.iter().map(|c| c.buffer_name).collect();
        assert_eq!(
            names,
            vec![VERTEX_POOL_BUFFER, INDEX_POOL_BUFFER, CHUNK_ORIGIN_BUFFER, INDIRECT_BUFFER]
        );
        assert_eq!(commands[0].data.as_bytes().len(), 24 * 16);
        assert_eq!(commands[1].data.as_bytes().len(), 36 * 4);
        assert_eq!(commands[3].data.as_bytes().len() as u64, 6 * INDIRECT_ARGS_SIZE);
        assert!(!pool.has_new_update());

        assert!(bridge.dirty_upload_commands(&store, &mut pool).is_empty());
    }

    #[test]
    fn released_chunks_disappear_from_draws() {
        let (_, mut pool, chunk_id) = single_voxel_pool();
        pool.store_mesh(chunk_id, &GeneratedMesh::default()).unwrap();
        assert!(RenderBridge::default().indirect_commands(&pool).is_empty());
    }
}
