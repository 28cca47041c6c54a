//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it changes.
//! The file is JSON and is located through the `VOXEL_ENGINE_CONFIG` environment
//! variable.

use std::{fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine_state::rendering::meshing::{vertex_pool::MIN_BUCKET_SIZE, MeshingMode};

/// Environment variable holding the path of the config file.
pub const CONFIG_ENV_VAR: &str = "VOXEL_ENGINE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Parameters of the Perlin terrain used by the demo driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub seed: u32,
    /// Factor applied to world coordinates before sampling the noise
    pub scale: f64,
    /// Height range above and below `base_height`
    pub amplitude: f64,
    pub base_height: i32,
    /// Half-width of the generated square, in chunks
    pub radius_chunks: i32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig {
            seed: 1,
            scale: 0.05,
            amplitude: 6.0,
            base_height: 8,
            radius_chunks: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub meshing_mode: MeshingMode,
    /// One indirect draw per visible side instead of one per chunk
    pub per_face_draws: bool,
    /// Initial vertex pool size in vertices
    pub vertex_pool_capacity: u32,
    /// Initial index pool size in indices
    pub index_pool_capacity: u32,
    /// Minimum number of entries a pool grows by
    pub pool_growth_increment: u32,
    pub terrain: TerrainConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            meshing_mode: MeshingMode::default(),
            per_face_draws: true,
            vertex_pool_capacity: 1 << 16,
            index_pool_capacity: 3 << 15,
            pool_growth_increment: 1 << 15,
            terrain: TerrainConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path.as_ref())?;
        info!("Loaded config from {}", path.as_ref().display());
        Self::from_json(&json)
    }

    /// Loads the file named by `VOXEL_ENGINE_CONFIG`, or the defaults when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_path(path),
            None => {
                info!("{} not set, using default config", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    /// Rejects pool sizes that are zero or not a multiple of the smallest bucket.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("vertex_pool_capacity", self.vertex_pool_capacity),
            ("index_pool_capacity", self.index_pool_capacity),
            ("pool_growth_increment", self.pool_growth_increment),
        ];
        for (name, value) in sizes {
            if value == 0 || value % MIN_BUCKET_SIZE != 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-zero multiple of {}, got {}",
                    name, MIN_BUCKET_SIZE, value
                )));
            }
        }

        if self.terrain.radius_chunks < 0 {
            return Err(ConfigError::Invalid(format!(
                "terrain.radius_chunks must not be negative, got {}",
                self.terrain.radius_chunks
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json(r#"{ "meshing_mode": "naive", "terrain": { "seed": 9 } }"#)
                .unwrap();
        assert_eq!(config.meshing_mode, MeshingMode::Naive);
        assert_eq!(config.terrain.seed, 9);
        assert_eq!(config.terrain.radius_chunks, TerrainConfig::default().radius_chunks);
        assert_eq!(config.vertex_pool_capacity, EngineConfig::default().vertex_pool_capacity);
    }

    #[test]
    fn rejects_unaligned_capacities() {
        let err = EngineConfig::from_json(r#"{ "index_pool_capacity": 100 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json(r#"{ "vertex_pool_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json("{ meshing_mode").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
