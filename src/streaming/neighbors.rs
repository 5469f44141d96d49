//! Which neighbor blocks a voxel edit invalidates
//!
//! Each local axis coordinate is classified as on the minimum boundary, in the
//! interior, or on the maximum boundary. The 27 combinations index a fixed
//! table of block offsets whose meshes sample that voxel.

use glam::IVec3;

use crate::math::Aabb3i;

/// Offsets of the blocks sharing one boundary class (up to 7 for a corner)
#[derive(Clone, Copy, Debug)]
pub struct NeighborSet {
    offsets: [IVec3; 7],
    len: usize,
}

impl NeighborSet {
    /// Face, edge and corner neighbors
    pub fn all(&self) -> &[IVec3] {
        &self.offsets[..self.len]
    }

    /// Only neighbors sharing a face with the owning block
    pub fn faces(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.all().iter().copied().filter(|o| o.abs().element_sum() == 1)
    }
}

const fn axis_step(class: usize) -> i32 {
    match class {
        0 => -1,
        2 => 1,
        _ => 0,
    }
}

const fn build_table() -> [NeighborSet; 27] {
    let mut table = [NeighborSet { offsets: [IVec3::ZERO; 7], len: 0 }; 27];
    let mut index = 0;
    while index < 27 {
        let step = IVec3::new(
            axis_step(index % 3),
            axis_step((index / 3) % 3),
            axis_step(index / 9),
        );
        let mut set = NeighborSet { offsets: [IVec3::ZERO; 7], len: 0 };
        // Every non-zero sub-combination of the per-axis steps
        let mut mask = 1;
        while mask < 8 {
            let x = if mask & 1 != 0 { step.x } else { 0 };
            let y = if mask & 2 != 0 { step.y } else { 0 };
            let z = if mask & 4 != 0 { step.z } else { 0 };
            let selects_interior_axis = (mask & 1 != 0 && step.x == 0)
                || (mask & 2 != 0 && step.y == 0)
                || (mask & 4 != 0 && step.z == 0);
            if !selects_interior_axis {
                set.offsets[set.len] = IVec3::new(x, y, z);
                set.len += 1;
            }
            mask += 1;
        }
        table[index] = set;
        index += 1;
    }
    table
}

/// Neighbor sets indexed by [`boundary_class`]
pub const NEIGHBOR_TABLE: [NeighborSet; 27] = build_table();

/// Classify one axis: 0 at the minimum, 2 at `max`, 1 otherwise
pub fn border_index(x: i32, max: i32) -> usize {
    if x == 0 {
        0
    } else if x != max {
        1
    } else {
        2
    }
}

/// Table index for a block-local voxel position
pub fn boundary_class(local: IVec3, block_size: i32) -> usize {
    let max = block_size - 1;
    border_index(local.x, max) + 3 * border_index(local.y, max) + 9 * border_index(local.z, max)
}

/// Neighbor blocks (as offsets from the owner) whose meshes read `local`
pub fn boundary_neighbors(local: IVec3, block_size: i32) -> &'static NeighborSet {
    &NEIGHBOR_TABLE[boundary_class(local, block_size)]
}

/// Grow a voxel region so that every block sampling it is covered.
///
/// With `check_corners` the region grows by one voxel on every face. Otherwise
/// it only grows on faces lying on a block boundary, which reaches face
/// neighbors and nothing diagonal.
pub fn expand_dirty_region(region: Aabb3i, block_size: i32, check_corners: bool) -> Aabb3i {
    if check_corners {
        return region.padded(1);
    }
    let mask = block_size - 1;
    let mut min = region.min;
    let mut max = region.max;
    for axis in 0..3 {
        if min[axis] & mask == 0 {
            min[axis] -= 1;
        }
        if max[axis] & mask == mask {
            max[axis] += 1;
        }
    }
    Aabb3i::new(min, max)
}
