//! Debug protocol - JSON command/response definitions

use serde::{Deserialize, Serialize};

/// Commands sent by a debug client, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum DebugCommand {
    /// Ping (health check)
    Ping,
    /// Get the statistics of the last tick
    GetStats,
    /// Get the lifecycle state of one block
    GetBlockState { x: i32, y: i32, z: i32 },
    /// Get the current terrain configuration
    GetConfig,
    /// Set the view distance in voxels
    SetViewDistance { voxels: i32 },
    /// Mark a voxel box dirty
    MakeAreaDirty { min: [i32; 3], size: [i32; 3] },
}

/// Responses from debug server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum DebugResponse {
    #[serde(rename = "ok")]
    Ok { data: ResponseData },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Response data variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    None,
    Pong { message: String },
    BlockState {
        x: i32,
        y: i32,
        z: i32,
        state: String,
    },
    Stats { stats: serde_json::Value },
    Config { config: serde_json::Value },
    ParamsUpdated { description: String },
}

impl DebugResponse {
    pub fn ok(data: ResponseData) -> Self {
        Self::Ok { data }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error {
            message: msg.into(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(ResponseData::Pong {
            message: "pong".into(),
        })
    }

    pub fn none() -> Self {
        Self::ok(ResponseData::None)
    }

    pub fn updated(description: impl Into<String>) -> Self {
        Self::ok(ResponseData::ParamsUpdated {
            description: description.into(),
        })
    }
}
