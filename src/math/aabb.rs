//! Integer axis-aligned box

use crate::core::types::IVec3;

/// Axis-aligned box of integer cells, both corners inclusive.
///
/// Always contains at least one cell; empty regions are represented by `None`
/// at call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Aabb3i {
    pub min: IVec3,
    pub max: IVec3,
}

impl Aabb3i {
    /// Create box from inclusive min and max corners
    pub fn new(min: IVec3, max: IVec3) -> Self {
        debug_assert!(min.cmple(max).all(), "min {min} must not exceed max {max}");
        Self { min, max }
    }

    /// Box spanning `center - extents ..= center + extents`, i.e. `2 * extents + 1` cells per axis
    pub fn from_center_extents(center: IVec3, extents: IVec3) -> Self {
        Self::new(center - extents, center + extents)
    }

    /// Box starting at `min` with `size` cells per axis.
    ///
    /// Returns `None` when any size component is not positive.
    pub fn from_min_size(min: IVec3, size: IVec3) -> Option<Self> {
        if size.cmple(IVec3::ZERO).any() {
            return None;
        }
        Some(Self::new(min, min + size - IVec3::ONE))
    }

    /// Number of cells per axis
    pub fn size(&self) -> IVec3 {
        self.max - self.min + IVec3::ONE
    }

    /// Total number of cells
    pub fn volume(&self) -> usize {
        let s = self.size();
        s.x as usize * s.y as usize * s.z as usize
    }

    /// Check if a cell is inside the box
    pub fn contains(&self, p: IVec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Grow the box by `amount` cells on every face
    pub fn padded(&self, amount: i32) -> Aabb3i {
        Aabb3i::new(self.min - IVec3::splat(amount), self.max + IVec3::splat(amount))
    }

    /// Iterate every cell, x fastest, then y, then z
    pub fn iter(&self) -> impl Iterator<Item = IVec3> + use<> {
        let (min, max) = (self.min, self.max);
        (min.z..=max.z).flat_map(move |z| {
            (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| IVec3::new(x, y, z)))
        })
    }
}
