//! Memory management for mesh data using a bucket-based range allocator.
//!
//! Two linear host buffers (vertices and indices) mirror the GPU pool buffers.
//! Each chunk owns at most one range in each of them. Range sizes are rounded up
//! to a power-of-two bucket table, which keeps fragmentation bounded and lets a
//! remeshed chunk reuse its range in place most of the time.
//!
//! # Bucket Organization
//! - Buckets hold 64, 128, ... up to 32768 entries
//! - The initial capacity is tiled into the largest buckets that fit
//! - A best-fit range is split into the requested bucket plus a cascade of
//!   remainders of size R, 2R, 4R, ... S/2
//! - Released ranges are never merged implicitly; see
//!   [`VertexPool::coalesce_free_ranges`]
//! - When nothing fits, the buffer grows at its end and existing data never moves

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use log::{debug, info};
use thiserror::Error;

use crate::engine_state::rendering::{meshing::mesh::GeneratedMesh, ChunkVertex};

/// Range sizes handed out by the pool, in entries.
pub const BUCKET_SIZES: [u32; 10] = [
    64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768,
];

/// Smallest bucket. Capacities and growth are multiples of it.
pub const MIN_BUCKET_SIZE: u32 = BUCKET_SIZES[0];

/// Largest bucket. Requests above it cannot be served.
pub const MAX_BUCKET_SIZE: u32 = BUCKET_SIZES[BUCKET_SIZES.len() - 1];

/// Which of the two pool buffers an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    Vertex,
    Index,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("request for {requested} {kind:?} entries exceeds the largest bucket ({max})", max = MAX_BUCKET_SIZE)]
    RequestTooLarge { kind: PoolKind, requested: u32 },
    #[error("failed to grow the {kind:?} pool from {capacity} by {additional} entries")]
    PoolExhausted {
        kind: PoolKind,
        capacity: u32,
        additional: u32,
    },
    #[error("{len} {kind:?} entries do not fit the range of chunk {chunk_id}")]
    RangeTooSmall {
        kind: PoolKind,
        chunk_id: u32,
        len: usize,
    },
}

/// Rounds `count` up to the bucket table.
pub fn bucket_size_for(count: u32) -> Option<u32> {
    BUCKET_SIZES.iter().copied().find(|&size| size >= count)
}

fn round_up_to_min_bucket(count: u32) -> Option<u32> {
    count
        .checked_add(MIN_BUCKET_SIZE - 1)
        .map(|c| c / MIN_BUCKET_SIZE * MIN_BUCKET_SIZE)
}

/// A `[start, end)` span of a pool buffer that no chunk owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRange {
    pub start: u32,
    pub end: u32,
}

impl FreeRange {
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A `[start, end)` span of a pool buffer owned by one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkMemoryRange {
    pub chunk_id: u32,
    pub start: u32,
    pub end: u32,
    /// Entries actually used, at most `end - start`.
    pub object_count: u32,
    /// Offset of each side's first index, for index ranges that hold a mesh.
    pub face_offsets: Option<[u32; 6]>,
    /// Cleared on every (re)allocation, set once the span is on the GPU.
    pub uploaded: bool,
}

impl ChunkMemoryRange {
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `(first, count)` of every side's indices, relative to `start`.
    pub fn face_spans(&self) -> Option<[(u32, u32); 6]> {
        let offsets = self.face_offsets?;
        let mut spans = [(0, 0); 6];
        for (side, span) in spans.iter_mut().enumerate() {
            let next = offsets.get(side + 1).copied().unwrap_or(self.object_count);
            *span = (offsets[side], next - offsets[side]);
        }
        Some(spans)
    }
}

/// Tiles `[start, end)` into the largest buckets that fit.
fn tile(start: u32, end: u32) -> Vec<FreeRange> {
    let mut ranges = Vec::new();
    let mut position = start;

    while position < end {
        let remaining = end - position;
        let Some(size) = BUCKET_SIZES.iter().rev().copied().find(|&size| size <= remaining) else {
            break;
        };
        ranges.push(FreeRange {
            start: position,
            end: position + size,
        });
        position += size;
    }

    ranges
}

/// One growable pool buffer and the ranges carved out of it.
///
/// The host array always has exactly `capacity` entries, so any range can be
/// written without further checks.
#[derive(Debug, Clone)]
pub struct PoolBuffer<T: Pod> {
    kind: PoolKind,
    growth_increment: u32,
    occupied: HashMap<u32, ChunkMemoryRange>,
    free: Vec<FreeRange>,
    data: Vec<T>,
}

impl<T: Pod> PoolBuffer<T> {
    /// Creates a buffer of `capacity` entries rounded up to a multiple of the smallest bucket.
    pub fn new(kind: PoolKind, capacity: u32, growth_increment: u32) -> Self {
        let capacity =
            round_up_to_min_bucket(capacity).unwrap_or(u32::MAX / MIN_BUCKET_SIZE * MIN_BUCKET_SIZE);

        PoolBuffer {
            kind,
            growth_increment,
            occupied: HashMap::new(),
            free: tile(0, capacity),
            data: vec![T::zeroed(); capacity as usize],
        }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    /// Number of entries the buffer can hold.
    pub fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    /// Size of the buffer in bytes.
    pub fn byte_size(&self) -> u64 {
        self.data.len() as u64 * std::mem::size_of::<T>() as u64
    }

    /// The whole host array, including unused entries.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The used part of `range`.
    pub fn slice(&self, range: &ChunkMemoryRange) -> &[T] {
        &self.data[range.start as usize..(range.start + range.object_count) as usize]
    }

    pub fn range(&self, chunk_id: u32) -> Option<&ChunkMemoryRange> {
        self.occupied.get(&chunk_id)
    }

    /// Occupied ranges ordered by start.
    pub fn occupied_ranges(&self) -> Vec<ChunkMemoryRange> {
        let mut ranges: Vec<_> = self.occupied.values().copied().collect();
        ranges.sort_by_key(|range| range.start);
        ranges
    }

    pub fn free_ranges(&self) -> &[FreeRange] {
        &self.free
    }

    /// Reserves room for `object_count` entries for `chunk_id`.
    ///
    /// The chunk's previous range is reused in place when it is large enough and
    /// released otherwise. The returned range is marked as not uploaded.
    pub fn allocate(&mut self, chunk_id: u32, object_count: u32) -> Result<ChunkMemoryRange, PoolError> {
        let size = bucket_size_for(object_count).ok_or(PoolError::RequestTooLarge {
            kind: self.kind,
            requested: object_count,
        })?;

        if let Some(existing) = self.occupied.get_mut(&chunk_id) {
            if existing.len() >= size {
                existing.object_count = object_count;
                existing.face_offsets = None;
                existing.uploaded = false;
                return Ok(*existing);
            }
        }
        self.release(chunk_id);

        let free_range = match self.take_free_range(size) {
            Some(range) => range,
            None => {
                self.grow(size)?;
                self.take_free_range(size).ok_or(PoolError::PoolExhausted {
                    kind: self.kind,
                    capacity: self.capacity(),
                    additional: size,
                })?
            }
        };

        let range = ChunkMemoryRange {
            chunk_id,
            start: free_range.start,
            end: free_range.end,
            object_count,
            face_offsets: None,
            uploaded: false,
        };
        debug!(
            "Allocated {:?} range [{}, {}) for chunk {} ({} entries)",
            self.kind, range.start, range.end, chunk_id, object_count
        );
        self.occupied.insert(chunk_id, range);

        Ok(range)
    }

    /// Returns the chunk's range to the free list.
    pub fn release(&mut self, chunk_id: u32) -> Option<ChunkMemoryRange> {
        let range = self.occupied.remove(&chunk_id)?;
        self.free.push(FreeRange {
            start: range.start,
            end: range.end,
        });
        debug!(
            "Released {:?} range [{}, {}) of chunk {}",
            self.kind, range.start, range.end, chunk_id
        );
        Some(range)
    }

    /// Copies `items` to the start of the chunk's range.
    ///
    /// # Errors
    /// [`PoolError::RangeTooSmall`] when the chunk has no range or the range is too small.
    fn write(&mut self, chunk_id: u32, items: &[T]) -> Result<(), PoolError> {
        let too_small = PoolError::RangeTooSmall {
            kind: self.kind,
            chunk_id,
            len: items.len(),
        };
        let range = self.occupied.get(&chunk_id).ok_or(too_small)?;
        if items.len() > range.len() as usize {
            return Err(too_small);
        }
        let start = range.start as usize;
        self.data[start..start + items.len()].copy_from_slice(items);
        Ok(())
    }

    /// Exact-size match first, otherwise the smallest larger range split down.
    fn take_free_range(&mut self, size: u32) -> Option<FreeRange> {
        let exact = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, range)| range.len() == size)
            .min_by_key(|(_, range)| range.start)
            .map(|(index, _)| index);

        if let Some(index) = exact {
            return Some(self.free.swap_remove(index));
        }

        let best_fit = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, range)| range.len() > size)
            .min_by_key(|(_, range)| (range.len(), range.start))
            .map(|(index, _)| index)?;

        let range = self.free.swap_remove(best_fit);
        let taken = FreeRange {
            start: range.start,
            end: range.start + size,
        };

        let mut position = taken.end;
        let mut remainder = size;
        while position < range.end {
            let end = (position + remainder).min(range.end);
            self.free.push(FreeRange {
                start: position,
                end,
            });
            position = end;
            remainder *= 2;
        }

        Some(taken)
    }

    /// Appends `max(growth_increment, required)` entries, tiled into buckets.
    fn grow(&mut self, required: u32) -> Result<(), PoolError> {
        let capacity = self.capacity();
        let exhausted = PoolError::PoolExhausted {
            kind: self.kind,
            capacity,
            additional: required,
        };

        let additional = round_up_to_min_bucket(self.growth_increment.max(required)).ok_or(exhausted)?;
        let new_capacity = capacity.checked_add(additional).ok_or(exhausted)?;

        self.data
            .try_reserve_exact(additional as usize)
            .map_err(|_| exhausted)?;
        self.data.resize(new_capacity as usize, T::zeroed());
        self.free.extend(tile(capacity, new_capacity));

        info!(
            "Grew {:?} pool from {} to {} entries",
            self.kind, capacity, new_capacity
        );
        Ok(())
    }

    /// Merges free buddy pairs until none is left.
    ///
    /// Two free ranges are buddies when they are adjacent, equally sized and the
    /// lower one starts at a multiple of twice their size.
    pub fn coalesce_free_ranges(&mut self) -> usize {
        let mut merges = 0;

        loop {
            self.free.sort_by_key(|range| range.start);
            let mut merged = Vec::with_capacity(self.free.len());
            let mut changed = false;
            let mut index = 0;

            while index < self.free.len() {
                let current = self.free[index];
                if let Some(next) = self.free.get(index + 1) {
                    if current.end == next.start
                        && current.len() == next.len()
                        && current.start % (current.len() * 2) == 0
                        && current.len() * 2 <= MAX_BUCKET_SIZE
                    {
                        merged.push(FreeRange {
                            start: current.start,
                            end: next.end,
                        });
                        merges += 1;
                        changed = true;
                        index += 2;
                        continue;
                    }
                }
                merged.push(current);
                index += 1;
            }

            self.free = merged;
            if !changed {
                return merges;
            }
        }
    }

    /// Marks every occupied range for upload.
    pub fn mark_all_dirty(&mut self) {
        for range in self.occupied.values_mut() {
            range.uploaded = false;
        }
    }

    /// Occupied ranges not yet uploaded, ordered by start.
    pub fn dirty_ranges(&self) -> Vec<ChunkMemoryRange> {
        let mut ranges: Vec<_> = self
            .occupied
            .values()
            .filter(|range| !range.uploaded)
            .copied()
            .collect();
        ranges.sort_by_key(|range| range.start);
        ranges
    }

    pub fn mark_uploaded(&mut self, chunk_id: u32) {
        if let Some(range) = self.occupied.get_mut(&chunk_id) {
            range.uploaded = true;
        }
    }

    /// Verifies that occupied and free ranges tile `[0, capacity)` exactly with
    /// bucket-sized ranges.
    pub fn check_layout(&self) -> Result<(), String> {
        let mut spans: Vec<(u32, u32, Option<u32>)> = self
            .free
            .iter()
            .map(|range| (range.start, range.end, None))
            .chain(
                self.occupied
                    .values()
                    .map(|range| (range.start, range.end, Some(range.chunk_id))),
            )
            .collect();
        spans.sort_by_key(|span| span.0);

        let mut expected_start = 0;
        for (start, end, owner) in spans {
            if start != expected_start {
                return Err(format!(
                    "{:?} range [{}, {}) of {:?} starts at {}, expected {}",
                    self.kind, start, end, owner, start, expected_start
                ));
            }
            if !BUCKET_SIZES.contains(&(end - start)) {
                return Err(format!(
                    "{:?} range [{}, {}) of {:?} is not a bucket size",
                    self.kind, start, end, owner
                ));
            }
            expected_start = end;
        }

        if expected_start != self.capacity() {
            return Err(format!(
                "{:?} ranges end at {}, capacity is {}",
                self.kind,
                expected_start,
                self.capacity()
            ));
        }

        for range in self.occupied.values() {
            if range.object_count > range.len() {
                return Err(format!(
                    "{:?} range of chunk {} holds {} entries in {}",
                    self.kind,
                    range.chunk_id,
                    range.object_count,
                    range.len()
                ));
            }
        }

        Ok(())
    }
}

/// Host-side mirror of the GPU vertex and index pools.
#[derive(Debug, Clone)]
pub struct VertexPool {
    pub vertices: PoolBuffer<ChunkVertex>,
    pub indices: PoolBuffer<u32>,
    new_update: bool,
}

impl VertexPool {
    pub fn new(vertex_capacity: u32, index_capacity: u32, growth_increment: u32) -> Self {
        VertexPool {
            vertices: PoolBuffer::new(PoolKind::Vertex, vertex_capacity, growth_increment),
            indices: PoolBuffer::new(PoolKind::Index, index_capacity, growth_increment),
            new_update: false,
        }
    }

    /// Reserves `object_count` entries of `kind` for `chunk_id`.
    pub fn allocate(
        &mut self,
        chunk_id: u32,
        object_count: u32,
        kind: PoolKind,
    ) -> Result<ChunkMemoryRange, PoolError> {
        let range = match kind {
            PoolKind::Vertex => self.vertices.allocate(chunk_id, object_count)?,
            PoolKind::Index => self.indices.allocate(chunk_id, object_count)?,
        };
        self.new_update = true;
        Ok(range)
    }

    /// Allocates both ranges for a chunk and copies its mesh into them.
    ///
    /// An empty mesh releases whatever the chunk held.
    pub fn store_mesh(&mut self, chunk_id: u32, mesh: &GeneratedMesh) -> Result<(), PoolError> {
        if mesh.is_empty() {
            self.release(chunk_id);
            return Ok(());
        }

        let vertex_count = u32::try_from(mesh.vertices.len()).unwrap_or(u32::MAX);
        let index_count = u32::try_from(mesh.indices.len()).unwrap_or(u32::MAX);

        self.allocate(chunk_id, vertex_count, PoolKind::Vertex)?;
        if let Err(err) = self.allocate(chunk_id, index_count, PoolKind::Index) {
            self.vertices.release(chunk_id);
            return Err(err);
        }

        let written = self
            .vertices
            .write(chunk_id, &mesh.vertices)
            .and_then(|()| self.indices.write(chunk_id, &mesh.indices));
        if let Err(err) = written {
            self.release(chunk_id);
            return Err(err);
        }
        if let Some(range) = self.indices.occupied.get_mut(&chunk_id) {
            range.face_offsets = Some(mesh.face_offsets());
        }

        Ok(())
    }

    /// Returns both of the chunk's ranges to the free lists.
    pub fn release(&mut self, chunk_id: u32) {
        let vertex = self.vertices.release(chunk_id);
        let index = self.indices.release(chunk_id);
        if vertex.is_some() || index.is_some() {
            self.new_update = true;
        }
    }

    /// Explicit buddy merge over both buffers, see [`PoolBuffer::coalesce_free_ranges`]. Returns the number of merges.
    pub fn coalesce_free_ranges(&mut self) -> usize {
        self.vertices.coalesce_free_ranges() + self.indices.coalesce_free_ranges()
    }

    pub fn check_layout(&self) -> Result<(), String> {
        self.vertices.check_layout()?;
        self.indices.check_layout()
    }

    /// Schedules every occupied range for upload, e.g. after the GPU buffers were recreated.
    pub fn mark_all_dirty(&mut self) {
        self.vertices.mark_all_dirty();
        self.indices.mark_all_dirty();
        self.new_update = true;
    }

    /// Whether anything changed since the last upload.
    pub fn has_new_update(&self) -> bool {
        self.new_update
    }

    pub fn clear_new_update(&mut self) {
        self.new_update = false;
    }

    /// Chunk ids with a vertex range, ordered by range start.
    pub fn chunk_ids(&self) -> Vec<u32> {
        self.vertices
            .occupied_ranges()
            .iter()
            .map(|range| range.chunk_id)
            .collect()
    }
}
