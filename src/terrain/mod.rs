//! Terrain node: configuration, host seam and the block lifecycle manager

pub mod config;
pub mod host;
pub mod voxel_terrain;

pub use config::TerrainConfig;
pub use host::{Notification, StaticViewers, TerrainHost};
pub use voxel_terrain::VoxelTerrain;
