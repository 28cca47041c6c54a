//! # Chunk Store Module
//!
//! This module provides the `ChunkStore` struct, the single owner of every chunk
//! in the world and the entry point for all voxel edits.
//!
//! ## Architecture
//!
//! The store is a sparse map from chunk keys to chunks. Chunks are created on
//! first insertion and never unloaded. Every edit marks the owning chunk dirty,
//! plus any existing neighbor whose mesh culls against the edited voxel, so the
//! next remesh pass picks the change up.
//!
//! ## Performance Considerations
//!
//! - Chunk lookup is O(1) using a hash map
//! - Voxel lookup is O(OCTREE_DEPTH) inside the chunk
//! - Removal does not touch geometry; the whole chunk is remeshed from scratch later

use std::collections::HashMap;

use cgmath::Point3;
use log::debug;

use super::{
    chunk::{
        align_to_chunk_center, center_to_key, chunk_corner, chunk_key_of, is_chunk_aligned,
        Chunk, CHUNK_EXTENT,
    },
    error::VoxelError,
    voxel::{Voxel, VoxelColor},
};

/// Owns all chunks of the world.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_engine::{ChunkStore, VoxelColor};
///
/// let mut store = ChunkStore::new();
/// let green = VoxelColor::new(0, 150, 0, 255);
/// store.add_voxel(Point3::new(3, 3, 3), green).unwrap();
///
/// assert!(store.has_voxel(Point3::new(3, 3, 3)));
/// assert_eq!(store.get_voxel(Point3::new(3, 3, 3)).unwrap().color, green);
/// ```
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: HashMap<Point3<i32>, Chunk>,
    next_chunk_id: u32,
}

impl ChunkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        ChunkStore {
            chunks: HashMap::new(),
            next_chunk_id: 0,
        }
    }

    /// Creates an empty chunk centered at `position` and returns its id.
    ///
    /// # Errors
    /// - [`VoxelError::InvalidLocation`] if `position` is not a chunk center, or
    ///   the center of a cell whose voxels fall outside the `i32` lattice
    /// - [`VoxelError::AlreadyExists`] if the cell already holds a chunk
    pub fn create_chunk(&mut self, position: Point3<f32>) -> Result<u32, VoxelError> {
        let key = center_to_key(position)
            .filter(|_| is_chunk_aligned(position))
            .ok_or(VoxelError::InvalidLocation { position })?;
        if self.chunks.contains_key(&key) {
            return Err(VoxelError::AlreadyExists { position });
        }

        Ok(self.insert_chunk(key))
    }

    fn insert_chunk(&mut self, key: Point3<i32>) -> u32 {
        let id = self.next_chunk_id;
        self.next_chunk_id += 1;
        self.chunks.insert(key, Chunk::new(id, key));
        debug!("Created chunk {} at key {:?}", id, key);
        id
    }

    /// Writes a voxel, creating the owning chunk if needed.
    ///
    /// # Errors
    /// [`VoxelError::InsertionFailed`] if the octree descent does not produce a leaf.
    pub fn add_voxel(&mut self, position: Point3<i32>, color: VoxelColor) -> Result<(), VoxelError> {
        let key = chunk_key_of(position);
        if !self.chunks.contains_key(&key) {
            self.insert_chunk(key);
        }

        let chunk = self
            .chunks
            .get_mut(&key)
            .ok_or(VoxelError::InsertionFailed { position })?;
        chunk.octree.insert(Voxel::new(position, color))?;
        chunk.dirty = true;

        let neighbors = chunk.bordering_keys(position);
        self.mark_dirty(&neighbors);
        Ok(())
    }

    /// Returns the voxel at `position`.
    ///
    /// # Errors
    /// [`VoxelError::NotFound`] if the chunk or the voxel is absent.
    pub fn get_voxel(&self, position: Point3<i32>) -> Result<&Voxel, VoxelError> {
        self.chunks
            .get(&chunk_key_of(position))
            .and_then(|chunk| chunk.octree.find(position))
            .ok_or(VoxelError::NotFound { position })
    }

    /// Whether a voxel is stored at `position`.
    pub fn has_voxel(&self, position: Point3<i32>) -> bool {
        self.get_voxel(position).is_ok()
    }

    /// Removes and returns the voxel at `position`.
    ///
    /// The chunk geometry is only updated on the next remesh pass.
    ///
    /// # Errors
    /// [`VoxelError::NotFound`] if the chunk or the voxel is absent.
    pub fn remove_voxel(&mut self, position: Point3<i32>) -> Result<Voxel, VoxelError> {
        let chunk = self
            .chunks
            .get_mut(&chunk_key_of(position))
            .ok_or(VoxelError::NotFound { position })?;
        let removed = chunk
            .octree
            .remove(position)
            .ok_or(VoxelError::NotFound { position })?;
        chunk.dirty = true;

        let neighbors = chunk.bordering_keys(position);
        self.mark_dirty(&neighbors);
        Ok(removed)
    }

    /// Fills every cell of the chunk containing `position` with `color`.
    ///
    /// Not atomic: a failure leaves the cells written so far in place.
    ///
    /// # Errors
    /// [`VoxelError::InvalidLocation`] if `position` lies outside every chunk cell.
    pub fn fill_chunk(&mut self, position: Point3<f32>, color: VoxelColor) -> Result<(), VoxelError> {
        let key = center_to_key(align_to_chunk_center(position))
            .ok_or(VoxelError::InvalidLocation { position })?;
        let corner = chunk_corner(key);

        for z in 0..CHUNK_EXTENT {
            for y in 0..CHUNK_EXTENT {
                for x in 0..CHUNK_EXTENT {
                    self.add_voxel(
                        Point3::new(corner.x + x, corner.y + y, corner.z + z),
                        color,
                    )?;
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self, keys: &[Point3<i32>]) {
        for key in keys {
            if let Some(chunk) = self.chunks.get_mut(key) {
                chunk.dirty = true;
            }
        }
    }

    /// Returns the chunk with `key`, if loaded.
    pub fn chunk(&self, key: Point3<i32>) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    /// Returns the chunk with `key` mutably, if loaded.
    pub fn chunk_mut(&mut self, key: Point3<i32>) -> Option<&mut Chunk> {
        self.chunks.get_mut(&key)
    }

    /// Returns the chunk whose cell contains the world position.
    pub fn chunk_at(&self, position: Point3<f32>) -> Option<&Chunk> {
        center_to_key(align_to_chunk_center(position)).and_then(|key| self.chunks.get(&key))
    }

    /// Iterates all chunks in unspecified order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Number of chunks in the store.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Keys of all dirty chunks, ordered by chunk id.
    pub fn dirty_chunk_keys(&self) -> Vec<Point3<i32>> {
        let mut dirty: Vec<&Chunk> = self.chunks.values().filter(|chunk| chunk.dirty).collect();
        dirty.sort_by_key(|chunk| chunk.id);
        dirty.into_iter().map(|chunk| chunk.key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: VoxelColor = VoxelColor::new(0, 150, 0, 255);

    #[test]
    fn create_chunk_rejects_misaligned_positions() {
        let mut store = ChunkStore::new();
        assert_eq!(
            store.create_chunk(Point3::new(4.0, 3.5, 3.5)),
            Err(VoxelError::InvalidLocation {
                position: Point3::new(4.0, 3.5, 3.5)
            })
        );
        assert_eq!(store.chunk_count(), 0);
    }

    #[test]
    fn create_chunk_rejects_duplicates() {
        let mut store = ChunkStore::new();
        assert_eq!(store.create_chunk(Point3::new(3.5, 3.5, 3.5)), Ok(0));
        assert_eq!(store.create_chunk(Point3::new(11.5, 3.5, 3.5)), Ok(1));
        assert!(matches!(
            store.create_chunk(Point3::new(3.5, 3.5, 3.5)),
            Err(VoxelError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn add_voxel_creates_chunk_and_marks_dirty() {
        let mut store = ChunkStore::new();
        store.add_voxel(Point3::new(-3, 9, 0), GREEN).unwrap();

        let chunk = store.chunk(Point3::new(-1, 1, 0)).unwrap();
        assert!(chunk.dirty);
        assert_eq!(chunk.octree.len(), 1);
        assert_eq!(store.get_voxel(Point3::new(-3, 9, 0)).unwrap().color, GREEN);
    }

    #[test]
    fn remove_voxel_reports_missing() {
        let mut store = ChunkStore::new();
        assert_eq!(
            store.remove_voxel(Point3::new(1, 1, 1)),
            Err(VoxelError::NotFound {
                position: Point3::new(1, 1, 1)
            })
        );

        store.add_voxel(Point3::new(1, 1, 1), GREEN).unwrap();
        store.chunk_mut(Point3::new(0, 0, 0)).unwrap().dirty = false;
        assert!(store.remove_voxel(Point3::new(1, 1, 1)).is_ok());
        assert!(!store.has_voxel(Point3::new(1, 1, 1)));
        assert!(store.chunk(Point3::new(0, 0, 0)).unwrap().dirty);
        assert!(store.remove_voxel(Point3::new(1, 1, 1)).is_err());
    }

    #[test]
    fn border_edits_dirty_existing_neighbors() {
        let mut store = ChunkStore::new();
        store.add_voxel(Point3::new(8, 0, 0), GREEN).unwrap();
        store.chunk_mut(Point3::new(1, 0, 0)).unwrap().dirty = false;

        store.add_voxel(Point3::new(4, 4, 4), GREEN).unwrap();
        assert!(!store.chunk(Point3::new(1, 0, 0)).unwrap().dirty);

        store.add_voxel(Point3::new(7, 4, 4), GREEN).unwrap();
        assert!(store.chunk(Point3::new(1, 0, 0)).unwrap().dirty);
    }

    #[test]
    fn fill_chunk_covers_whole_extent() {
        let mut store = ChunkStore::new();
        store.fill_chunk(Point3::new(11.5, 3.5, 3.5), GREEN).unwrap();

        let chunk = store.chunk_at(Point3::new(11.5, 3.5, 3.5)).unwrap();
        assert_eq!(chunk.octree.len(), 512);
        assert!(store.has_voxel(Point3::new(8, 0, 0)));
        assert!(store.has_voxel(Point3::new(15, 7, 7)));
        assert!(!store.has_voxel(Point3::new(16, 7, 7)));
    }

    #[test]
    fn centers_beyond_the_lattice_are_invalid() {
        let mut store = ChunkStore::new();
        let far = Point3::new(1.0e30, 3.5, 3.5);
        assert_eq!(
            store.create_chunk(far),
            Err(VoxelError::InvalidLocation { position: far })
        );
        assert_eq!(
            store.fill_chunk(far, GREEN),
            Err(VoxelError::InvalidLocation { position: far })
        );
        assert!(matches!(
            store.fill_chunk(Point3::new(3.5, f32::INFINITY, 3.5), GREEN),
            Err(VoxelError::InvalidLocation { .. })
        ));
        assert!(store.chunk_at(far).is_none());
        assert_eq!(store.chunk_count(), 0);
    }

    #[test]
    fn distant_voxels_keep_their_own_cells() {
        let mut store = ChunkStore::new();
        let first = Point3::new(1 << 24, 0, 0);
        let second = Point3::new((1 << 24) + 1, 0, 0);
        store.add_voxel(first, GREEN).unwrap();
        store.add_voxel(second, GREEN).unwrap();

        assert!(store.has_voxel(first));
        assert!(store.has_voxel(second));
        assert_eq!(store.chunk(Point3::new(1 << 21, 0, 0)).unwrap().voxel_count(), 2);

        for position in [
            Point3::new(8_388_615, -8_388_615, 0),
            Point3::new(i32::MAX, i32::MIN, i32::MAX),
            Point3::new(i32::MIN, i32::MAX, -(1 << 24) - 1),
        ] {
            store.add_voxel(position, GREEN).unwrap();
            assert!(store.has_voxel(position));
            assert_eq!(store.remove_voxel(position).map(|voxel| voxel.position), Ok(position));
        }
        assert_eq!(store.chunk_count(), 4);
    }

    #[test]
    fn dirty_keys_follow_creation_order() {
        let mut store = ChunkStore::new();
        store.add_voxel(Point3::new(20, 0, 0), GREEN).unwrap();
        store.add_voxel(Point3::new(-20, 0, 0), GREEN).unwrap();
        store.add_voxel(Point3::new(0, 0, 0), GREEN).unwrap();

        assert_eq!(
            store.dirty_chunk_keys(),
            vec![Point3::new(2, 0, 0), Point3::new(-3, 0, 0), Point3::new(0, 0, 0)]
        );
    }
}
