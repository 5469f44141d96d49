//! Terrain configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::voxel::map::{MAX_BLOCK_SIZE_POW2, MIN_BLOCK_SIZE_POW2};
use crate::voxel::{Material, MAX_MATERIALS};

/// Runtime settings of a [`VoxelTerrain`](super::VoxelTerrain).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Radius of the resident area in voxels, rounded down to whole blocks
    pub view_distance: i32,
    /// Host path of the node whose position drives streaming
    pub viewer_path: String,
    /// Stored for hosts that build collision shapes; not used by streaming
    pub generate_collisions: bool,
    /// Keep streaming while the host is in editor mode
    pub run_in_editor: bool,
    /// Material bound to each model surface slot
    pub materials: [Option<Material>; MAX_MATERIALS],
    /// log2 of the block edge in voxels
    pub block_size_pow2: u32,
    /// Dirty diagonal neighbors too, for meshers that sample across block corners
    pub ambient_occlusion: bool,
    /// Main-thread mesh commit budget per tick (ms)
    pub commit_budget_ms: u64,
    /// Provider calls allowed in flight at once
    pub loader_threads: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            view_distance: 128,
            viewer_path: String::new(),
            generate_collisions: true,
            run_in_editor: false,
            materials: Default::default(),
            block_size_pow2: 4,
            ambient_occlusion: true,
            commit_budget_ms: 10,
            loader_threads: 2,
        }
    }
}

impl TerrainConfig {
    /// Voxels per block edge
    pub fn block_size(&self) -> u32 {
        1 << self.block_size_pow2
    }

    /// View distance converted to whole blocks
    pub fn view_distance_blocks(&self) -> i32 {
        self.view_distance.max(0) >> self.block_size_pow2
    }

    /// Check every field, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.view_distance < 0 {
            return Err(Error::InvalidViewDistance(self.view_distance));
        }
        if !(MIN_BLOCK_SIZE_POW2..=MAX_BLOCK_SIZE_POW2).contains(&self.block_size_pow2) {
            return Err(Error::InvalidBlockSize(self.block_size_pow2));
        }
        if self.commit_budget_ms == 0 {
            return Err(Error::InvalidConfig("commit_budget_ms must be > 0".into()));
        }
        if self.loader_threads == 0 {
            return Err(Error::InvalidConfig("loader_threads must be > 0".into()));
        }
        Ok(())
    }

    /// Load and validate a JSON config file
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
