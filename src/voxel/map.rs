//! VoxelMap - spatial index of resident blocks

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use glam::{IVec3, UVec3, Vec3};

use crate::core::{BlockPos, Error, Result};
use crate::math::Aabb3i;

use super::block::VoxelBlock;
use super::buffer::{VoxelBuffer, MAX_CHANNELS, channel};

/// Smallest and largest supported `log2(block size)`
pub const MIN_BLOCK_SIZE_POW2: u32 = 1;
pub const MAX_BLOCK_SIZE_POW2: u32 = 8;

/// Hash map from block coordinate to resident block.
///
/// All blocks share one cubic size of `1 << block_size_pow2` voxels per axis.
#[derive(Debug)]
pub struct VoxelMap {
    block_size_pow2: u32,
    blocks: HashMap<BlockPos, VoxelBlock>,
}

impl VoxelMap {
    /// Create an empty map. Fails when the block size power is outside 1..=8.
    pub fn new(block_size_pow2: u32) -> Result<Self> {
        if !(MIN_BLOCK_SIZE_POW2..=MAX_BLOCK_SIZE_POW2).contains(&block_size_pow2) {
            return Err(Error::InvalidBlockSize(block_size_pow2));
        }
        Ok(Self {
            block_size_pow2,
            blocks: HashMap::new(),
        })
    }

    pub fn block_size_pow2(&self) -> u32 {
        self.block_size_pow2
    }

    /// Voxels per block edge
    pub fn block_size(&self) -> u32 {
        1 << self.block_size_pow2
    }

    fn block_size_mask(&self) -> i32 {
        (1 << self.block_size_pow2) - 1
    }

    /// Block containing a voxel (floor division)
    pub fn voxel_to_block(&self, voxel: IVec3) -> BlockPos {
        let s = self.block_size_pow2 as i32;
        IVec3::new(voxel.x >> s, voxel.y >> s, voxel.z >> s)
    }

    /// Block containing a world-space point (one voxel per unit)
    pub fn voxel_to_block_f(&self, pos: Vec3) -> BlockPos {
        (pos / self.block_size() as f32).floor().as_ivec3()
    }

    /// Position of a voxel relative to the origin of its block
    pub fn to_local(&self, voxel: IVec3) -> IVec3 {
        let m = self.block_size_mask();
        IVec3::new(voxel.x & m, voxel.y & m, voxel.z & m)
    }

    /// Voxel-space origin of a block
    pub fn block_to_voxel(&self, block: BlockPos) -> IVec3 {
        let s = self.block_size_pow2 as i32;
        IVec3::new(block.x << s, block.y << s, block.z << s)
    }

    /// Block range touched by an inclusive voxel box
    pub fn voxel_box_to_blocks(&self, voxels: Aabb3i) -> Aabb3i {
        Aabb3i::new(self.voxel_to_block(voxels.min), self.voxel_to_block(voxels.max))
    }

    pub fn has_block(&self, pos: BlockPos) -> bool {
        self.blocks.contains_key(&pos)
    }

    pub fn get_block(&self, pos: BlockPos) -> Option<&VoxelBlock> {
        self.blocks.get(&pos)
    }

    pub fn get_block_mut(&mut self, pos: BlockPos) -> Option<&mut VoxelBlock> {
        self.blocks.get_mut(&pos)
    }

    /// Install voxel data for a block, creating it if absent.
    ///
    /// Returns the block. An existing block keeps its rendering handle.
    pub fn set_block_buffer(&mut self, pos: BlockPos, voxels: VoxelBuffer) -> &mut VoxelBlock {
        debug_assert_eq!(voxels.size(), UVec3::splat(self.block_size()));
        match self.blocks.entry(pos) {
            Entry::Occupied(entry) => {
                let block = entry.into_mut();
                block.voxels = voxels;
                block
            }
            Entry::Vacant(entry) => entry.insert(VoxelBlock::new(pos, voxels)),
        }
    }

    pub fn remove_block(&mut self, pos: BlockPos) -> Option<VoxelBlock> {
        self.blocks.remove(&pos)
    }

    /// Remove every block, returning how many were resident
    pub fn clear(&mut self) -> usize {
        let count = self.blocks.len();
        self.blocks.clear();
        count
    }

    /// Whether all 26 face/edge/corner neighbors are resident
    pub fn is_block_surrounded(&self, pos: BlockPos) -> bool {
        for z in -1..=1 {
            for y in -1..=1 {
                for x in -1..=1 {
                    let offset = IVec3::new(x, y, z);
                    if offset != IVec3::ZERO && !self.has_block(pos + offset) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Copy the voxels starting at `min_voxel` into `dst` (its size sets the extent)
    /// for the channels in `channel_mask`. Cells over missing blocks read as zero.
    pub fn get_buffer_copy(&self, min_voxel: IVec3, dst: &mut VoxelBuffer, channel_mask: u8) {
        for ch in 0..MAX_CHANNELS {
            if channel_mask & channel::mask(ch) != 0 {
                dst.clear_channel(ch, 0);
            }
        }
        let Some(area) = Aabb3i::from_min_size(min_voxel, dst.size().as_ivec3()) else {
            return;
        };

        let block_size = IVec3::splat(self.block_size() as i32);
        for bpos in self.voxel_box_to_blocks(area).iter() {
            let Some(block) = self.blocks.get(&bpos) else {
                continue;
            };
            let origin = self.block_to_voxel(bpos);
            // Intersection in voxel space, half-open
            let lo = area.min.max(origin);
            let hi = (area.max + IVec3::ONE).min(origin + block_size);
            dst.copy_from(&block.voxels, lo - origin, hi - origin, lo - min_voxel, channel_mask);
        }
    }

    /// Read a voxel in world voxel coordinates. Missing blocks read as zero.
    pub fn get_voxel(&self, voxel: IVec3, channel: usize) -> u8 {
        self.blocks
            .get(&self.voxel_to_block(voxel))
            .map_or(0, |b| b.voxels.get_voxel(self.to_local(voxel), channel))
    }

    /// Write a voxel of a resident block. Returns `false` if the block is absent.
    pub fn set_voxel(&mut self, voxel: IVec3, value: u8, channel: usize) -> bool {
        let local = self.to_local(voxel);
        let bpos = self.voxel_to_block(voxel);
        self.blocks
            .get_mut(&bpos)
            .is_some_and(|b| b.voxels.set_voxel(local, channel, value))
    }

    /// Apply `f` to every resident block
    pub fn for_all_blocks(&mut self, mut f: impl FnMut(&mut VoxelBlock)) {
        for block in self.blocks.values_mut() {
            f(block);
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Coordinates of every resident block, in no particular order
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.blocks.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(map: &VoxelMap, value: u8) -> VoxelBuffer {
        let mut buf = VoxelBuffer::cube(map.block_size());
        buf.fill(value, channel::TYPE);
        buf
    }

    #[test]
    fn test_invalid_block_size() {
        assert!(matches!(VoxelMap::new(0), Err(Error::InvalidBlockSize(0))));
        assert!(matches!(VoxelMap::new(9), Err(Error::InvalidBlockSize(9))));
        assert_eq!(VoxelMap::new(4).unwrap().block_size(), 16);
    }

    #[test]
    fn test_coordinate_conversions() {
        let map = VoxelMap::new(4).unwrap();
        assert_eq!(map.voxel_to_block(IVec3::new(0, 15, 16)), IVec3::new(0, 0, 1));
        assert_eq!(map.voxel_to_block(IVec3::new(-1, -16, -17)), IVec3::new(-1, -1, -2));
        assert_eq!(map.to_local(IVec3::new(-1, 17, 32)), IVec3::new(15, 1, 0));
        assert_eq!(map.block_to_voxel(IVec3::new(-2, 0, 3)), IVec3::new(-32, 0, 48));
        assert_eq!(map.voxel_to_block_f(Vec3::new(-0.5, 15.9, 16.0)), IVec3::new(-1, 0, 1));
    }

    #[test]
    fn test_set_and_remove_block() {
        let mut map = VoxelMap::new(3).unwrap();
        let pos = IVec3::new(1, 2, 3);
        assert!(!map.has_block(pos));
        map.set_block_buffer(pos, solid(&map, 1));
        assert!(map.has_block(pos));
        assert_eq!(map.block_count(), 1);

        // Re-supply keeps the instance
        map.get_block_mut(pos).unwrap().instance.set_visible(false);
        map.set_block_buffer(pos, solid(&map, 2));
        let block = map.get_block(pos).unwrap();
        assert!(!block.instance.is_visible());
        assert_eq!(block.voxels.uniform_value(channel::TYPE), Some(2));

        assert!(map.remove_block(pos).is_some());
        assert!(map.remove_block(pos).is_none());
        assert_eq!(map.block_count(), 0);
    }

    #[test]
    fn test_is_block_surrounded() {
        let mut map = VoxelMap::new(2).unwrap();
        let center = IVec3::new(5, 5, 5);
        for p in Aabb3i::from_center_extents(center, IVec3::ONE).iter() {
            if p != center {
                map.set_block_buffer(p, solid(&map, 1));
            }
        }
        // The block itself does not need to be resident
        assert!(map.is_block_surrounded(center));
        map.remove_block(center + IVec3::new(1, -1, 1));
        assert!(!map.is_block_surrounded(center));
    }

    #[test]
    fn test_voxel_access() {
        let mut map = VoxelMap::new(2).unwrap();
        assert!(!map.set_voxel(IVec3::new(-1, 0, 0), 3, channel::TYPE));
        map.set_block_buffer(IVec3::new(-1, 0, 0), solid(&map, 0));
        assert!(map.set_voxel(IVec3::new(-1, 0, 0), 3, channel::TYPE));
        assert_eq!(map.get_voxel(IVec3::new(-1, 0, 0), channel::TYPE), 3);
        let block = map.get_block(IVec3::new(-1, 0, 0)).unwrap();
        assert_eq!(block.voxels.get_voxel(IVec3::new(3, 0, 0), channel::TYPE), 3);
        assert_eq!(map.get_voxel(IVec3::new(50, 0, 0), channel::TYPE), 0);
    }

    #[test]
    fn test_get_buffer_copy_padded() {
        let mut map = VoxelMap::new(2).unwrap();
        let bs = map.block_size() as i32;
        map.set_block_buffer(IVec3::ZERO, solid(&map, 1));
        map.set_block_buffer(IVec3::new(-1, 0, 0), solid(&map, 2));
        map.set_block_buffer(IVec3::new(1, 0, 0), solid(&map, 3));

        // Padded copy of block 0: origin -1, edge B + 3
        let mut dst = VoxelBuffer::cube(map.block_size() + 3);
        dst.fill(9, channel::TYPE);
        map.get_buffer_copy(IVec3::splat(-1), &mut dst, channel::MESHING_MASK);

        // Inside the block
        assert_eq!(dst.get_voxel(IVec3::new(1, 1, 1), channel::TYPE), 1);
        assert_eq!(dst.get_voxel(IVec3::new(bs, bs, bs), channel::TYPE), 1);
        // Left skirt comes from block -X, right skirt from block +X
        assert_eq!(dst.get_voxel(IVec3::new(0, 1, 1), channel::TYPE), 2);
        assert_eq!(dst.get_voxel(IVec3::new(bs + 1, 1, 1), channel::TYPE), 3);
        assert_eq!(dst.get_voxel(IVec3::new(bs + 2, 1, 1), channel::TYPE), 3);
        // Missing neighbors read as zero, previous contents are cleared
        assert_eq!(dst.get_voxel(IVec3::new(1, 0, 1), channel::TYPE), 0);
        assert_eq!(dst.get_voxel(IVec3::new(1, 1, bs + 2), channel::TYPE), 0);
    }

    #[test]
    fn test_for_all_blocks() {
        let mut map = VoxelMap::new(2).unwrap();
        for x in 0..4 {
            map.set_block_buffer(IVec3::new(x, 0, 0), solid(&map, 1));
        }
        let mut visited = 0;
        map.for_all_blocks(|b| {
            b.instance.set_visible(false);
            visited += 1;
        });
        assert_eq!(visited, 4);
        assert!(map.positions().all(|p| !map.get_block(p).unwrap().instance.is_visible()));
    }
}
