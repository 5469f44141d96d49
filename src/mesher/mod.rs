//! Surface extraction from padded voxel buffers

pub mod cubic;

pub use cubic::CubicMesher;

use crate::voxel::{SurfaceArrays, VoxelBuffer};

/// Voxels of margin before the block's first voxel in a padded buffer
pub const PADDING_MIN: u32 = 1;
/// Voxels of margin after the block's last voxel in a padded buffer
pub const PADDING_MAX: u32 = 2;

/// Edge length of the padded buffer handed to meshers for a block edge of `block_size`
pub const fn padded_size(block_size: u32) -> u32 {
    block_size + PADDING_MIN + PADDING_MAX
}

/// Surfaces produced for one block
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MesherOutput {
    /// Indexed by material slot
    pub model_surfaces: Vec<SurfaceArrays>,
    /// Material-less transition surfaces
    pub smooth_surfaces: Vec<SurfaceArrays>,
}

impl MesherOutput {
    /// Whether no surface carries geometry
    pub fn is_empty(&self) -> bool {
        self.model_surfaces.iter().chain(&self.smooth_surfaces).all(SurfaceArrays::is_empty)
    }
}

/// Turns a padded voxel buffer into surfaces.
///
/// The buffer covers the block plus [`PADDING_MIN`] voxels before and
/// [`PADDING_MAX`] voxels after it on every axis. Output positions are
/// relative to the block's first voxel.
pub trait Mesher: Send + Sync {
    fn build(&self, padded: &VoxelBuffer) -> MesherOutput;
}

/// Mesher that never produces geometry
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyMesher;

impl Mesher for EmptyMesher {
    fn build(&self, _padded: &VoxelBuffer) -> MesherOutput {
        MesherOutput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_size() {
        assert_eq!(padded_size(16), 19);
        assert_eq!(padded_size(2), 5);
    }

    #[test]
    fn test_empty_mesher() {
        let out = EmptyMesher.build(&VoxelBuffer::cube(padded_size(4)));
        assert!(out.is_empty());
        assert!(out.model_surfaces.is_empty());
    }
}
