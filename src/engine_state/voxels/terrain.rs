//! # Terrain Module
//!
//! Height-field terrain generation. The store only ever sees `add_voxel` calls;
//! where the surface lies is decided by a [`TerrainHeight`] source, by default
//! 2D Perlin noise.

use cgmath::Point3;
use log::info;
use noise::{NoiseFn, Perlin};

use super::{chunk::CHUNK_EXTENT, chunk_store::ChunkStore, error::VoxelError, voxel::VoxelColor};
use crate::core::config::TerrainConfig;

/// Color of the topmost voxel of each column.
pub const GRASS_COLOR: VoxelColor = VoxelColor::new(0, 150, 0, 255);
/// Color of the voxels directly under the surface.
pub const DIRT_COLOR: VoxelColor = VoxelColor::new(134, 96, 67, 255);
/// Color of everything deeper than [`DIRT_DEPTH`].
pub const STONE_COLOR: VoxelColor = VoxelColor::new(120, 120, 120, 255);
/// Number of dirt voxels between the grass and the stone.
pub const DIRT_DEPTH: i32 = 3;

/// A source of terrain surface heights.
pub trait TerrainHeight {
    /// World Y of the topmost voxel of the column at `(x, z)`.
    fn height_at(&self, x: i32, z: i32) -> i32;
}

impl<F> TerrainHeight for F
where
    F: Fn(i32, i32) -> i32,
{
    fn height_at(&self, x: i32, z: i32) -> i32 {
        self(x, z)
    }
}

/// Terrain heights sampled from 2D Perlin noise.
pub struct PerlinTerrain {
    perlin: Perlin,
    scale: f64,
    amplitude: f64,
    base_height: i32,
}

impl PerlinTerrain {
    /// Creates a Perlin height field.
    ///
    /// # Arguments
    /// * `seed` - Noise seed
    /// * `scale` - Factor applied to world coordinates before sampling
    /// * `amplitude` - Height range above and below `base_height`
    /// * `base_height` - Height of the zero crossing of the noise
    pub fn new(seed: u32, scale: f64, amplitude: f64, base_height: i32) -> Self {
        PerlinTerrain {
            perlin: Perlin::new(seed),
            scale,
            amplitude,
            base_height,
        }
    }

    /// Builds the height field described by the `terrain` config section.
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.seed, config.scale, config.amplitude, config.base_height)
    }
}

impl TerrainHeight for PerlinTerrain {
    fn height_at(&self, x: i32, z: i32) -> i32 {
        let sample = self
            .perlin
            .get([x as f64 * self.scale, z as f64 * self.scale]);
        self.base_height + (sample * self.amplitude).round() as i32
    }
}

/// Fills the square of `radius_chunks` chunks around the origin with terrain columns.
///
/// Columns run from `y = 0` up to the sampled height. Columns with a negative
/// height are left empty. The top voxel gets a slightly varied grass tint,
/// picked with a generator seeded from `seed` so the output is reproducible.
///
/// # Returns
/// The number of voxels written.
pub fn generate_terrain(
    store: &mut ChunkStore,
    height: &impl TerrainHeight,
    radius_chunks: i32,
    seed: u32,
) -> Result<usize, VoxelError> {
    let mut rng = fastrand::Rng::with_seed(seed as u64);
    let min = -radius_chunks * CHUNK_EXTENT;
    let max = radius_chunks * CHUNK_EXTENT;
    let mut written = 0;

    for x in min..max {
        for z in min..max {
            let top = height.height_at(x, z);
            for y in 0..=top {
                let color = if y == top {
                    let tint = rng.u8(0..24);
                    VoxelColor::new(GRASS_COLOR.r, GRASS_COLOR.g - tint, GRASS_COLOR.b, 255)
                } else if top - y <= DIRT_DEPTH {
                    DIRT_COLOR
                } else {
                    STONE_COLOR
                };
                store.add_voxel(Point3::new(x, y, z), color)?;
                written += 1;
            }
        }
    }

    info!(
        "Generated {} voxels across {} chunks",
        written,
        store.chunk_count()
    );
    Ok(written)
}
