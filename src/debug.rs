//! Debug server bridge: answers debug commands from a shared terrain

use std::sync::{Arc, Mutex, PoisonError};

use glam::IVec3;
use terrastream_debug::{DebugCommand, DebugHandler, DebugResponse, ResponseData};

use crate::terrain::VoxelTerrain;

/// Handles debug commands against a terrain shared with the tick loop
pub struct TerrainDebugHandler {
    terrain: Arc<Mutex<VoxelTerrain>>,
}

impl TerrainDebugHandler {
    pub fn new(terrain: Arc<Mutex<VoxelTerrain>>) -> Self {
        Self { terrain }
    }
}

impl DebugHandler for TerrainDebugHandler {
    fn handle_command(&mut self, cmd: DebugCommand) -> DebugResponse {
        let mut terrain = self.terrain.lock().unwrap_or_else(PoisonError::into_inner);

        match cmd {
            DebugCommand::Ping => DebugResponse::pong(),

            DebugCommand::GetStats => match serde_json::to_value(terrain.stats()) {
                Ok(stats) => DebugResponse::ok(ResponseData::Stats { stats }),
                Err(e) => DebugResponse::error(format!("Failed to serialize stats: {e}")),
            },

            DebugCommand::GetBlockState { x, y, z } => {
                let state = terrain.get_block_state(IVec3::new(x, y, z));
                DebugResponse::ok(ResponseData::BlockState {
                    x,
                    y,
                    z,
                    state: state.name().to_string(),
                })
            }

            DebugCommand::GetConfig => match serde_json::to_value(terrain.config()) {
                Ok(config) => DebugResponse::ok(ResponseData::Config { config }),
                Err(e) => DebugResponse::error(format!("Failed to serialize config: {e}")),
            },

            DebugCommand::SetViewDistance { voxels } => match terrain.set_view_distance(voxels) {
                Ok(()) => DebugResponse::updated(format!("view_distance = {voxels}")),
                Err(e) => DebugResponse::error(e.to_string()),
            },

            DebugCommand::MakeAreaDirty { min, size } => {
                terrain.make_area_dirty(IVec3::from_array(min), IVec3::from_array(size));
                DebugResponse::updated(format!("area {min:?} + {size:?} marked dirty"))
            }
        }
    }
}
