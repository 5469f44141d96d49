//! Voxel data structures: buffers, blocks, the block map and mesh output

pub mod block;
pub mod buffer;
pub mod library;
pub mod map;
pub mod mesh;

pub use block::{BlockInstance, VoxelBlock, WorldId};
pub use buffer::{channel, VoxelBuffer, AIR, MAX_CHANNELS};
pub use library::{VoxelLibrary, VoxelType};
pub use map::VoxelMap;
pub use mesh::{Material, Mesh, Surface, SurfaceArrays, MAX_MATERIALS};
