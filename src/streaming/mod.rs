//! Block streaming: lifecycle states, neighbor invalidation and background workers

pub mod immediate;
pub mod loader;
pub mod neighbors;
pub mod priority;
pub mod state;
pub mod stats;
pub mod updater;

pub use immediate::{ImmediateLoader, ImmediateUpdater};
pub use loader::{BlockLoader, EmergedBlock, LoadInput, LoadOutput, LoaderThread};
pub use neighbors::{boundary_neighbors, expand_dirty_region, NeighborSet};
pub use priority::{BlockPriority, PriorityHint};
pub use state::{BlockState, DirtyState};
pub use stats::{ProviderStats, TerrainStats, UpdaterStats, WorkerStats};
pub use updater::{MeshInput, MeshOutput, MeshRequest, MeshUpdater, MeshUpdaterThread, MeshedBlock};
