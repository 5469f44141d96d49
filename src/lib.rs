//! Terrastream - block streaming and remeshing for infinite voxel terrain

pub mod core;
pub mod math;
pub mod voxel;
pub mod provider;
pub mod mesher;
pub mod streaming;
pub mod terrain;
pub mod debug;

pub use terrain::{TerrainConfig, TerrainHost, VoxelTerrain};
