//! Voxel data sources feeding the loader

pub mod heightmap;

pub use heightmap::{HeightmapParams, NoiseProvider};

use glam::IVec3;

use crate::voxel::{channel, VoxelBuffer};

/// Produces voxel content for blocks.
///
/// Implementations are called from loader worker threads and must fill the
/// whole buffer; its size is the block size the terrain was configured with.
pub trait VoxelProvider: Send + Sync {
    /// Fill `out` with the voxels of the block whose first voxel is `origin_in_voxels`
    fn emerge_block(&self, out: &mut VoxelBuffer, origin_in_voxels: IVec3);
}

/// Horizontal slab: every voxel with world `y < height` gets `voxel_type`.
#[derive(Clone, Copy, Debug)]
pub struct FlatProvider {
    pub height: i32,
    pub voxel_type: u8,
}

impl FlatProvider {
    pub fn new(height: i32, voxel_type: u8) -> Self {
        Self { height, voxel_type }
    }
}

impl VoxelProvider for FlatProvider {
    fn emerge_block(&self, out: &mut VoxelBuffer, origin_in_voxels: IVec3) {
        let size = out.size().as_ivec3();
        let top = origin_in_voxels.y + size.y;
        if self.height <= origin_in_voxels.y {
            out.fill(0, channel::TYPE);
        } else if self.height >= top {
            out.fill(self.voxel_type, channel::TYPE);
        } else {
            out.fill(0, channel::TYPE);
            let local_top = self.height - origin_in_voxels.y;
            out.fill_area(
                self.voxel_type,
                IVec3::ZERO,
                IVec3::new(size.x, local_top, size.z),
                channel::TYPE,
            );
        }
    }
}
