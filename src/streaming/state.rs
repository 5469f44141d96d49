//! Per-block lifecycle state

use serde::{Deserialize, Serialize};

/// Lifecycle state of a block coordinate as reported to hosts and debug tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockState {
    /// Not resident and not requested
    None,
    /// Load requested, not yet resident
    Load,
    /// Resident, content changed, remesh not dispatched
    UpdateNotSent,
    /// Remesh dispatched, result pending
    UpdateSent,
    /// Resident with no pending work
    Idle,
}

impl BlockState {
    pub fn name(self) -> &'static str {
        match self {
            BlockState::None => "NONE",
            BlockState::Load => "LOAD",
            BlockState::UpdateNotSent => "UPDATE_NOT_SENT",
            BlockState::UpdateSent => "UPDATE_SENT",
            BlockState::Idle => "IDLE",
        }
    }
}

impl std::fmt::Display for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Dirty-map entry. Only coordinates with pending work have one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirtyState {
    Load,
    UpdateNotSent,
    /// Carries the revision the in-flight mesh job was dispatched with
    UpdateSent { revision: u64 },
}

impl From<DirtyState> for BlockState {
    fn from(state: DirtyState) -> Self {
        match state {
            DirtyState::Load => BlockState::Load,
            DirtyState::UpdateNotSent => BlockState::UpdateNotSent,
            DirtyState::UpdateSent { .. } => BlockState::UpdateSent,
        }
    }
}
