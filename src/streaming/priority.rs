//! Nearest-first ordering of block load requests

use std::cmp::Ordering;
use std::sync::atomic::{AtomicI32, Ordering as AtomicOrdering};

use crate::core::BlockPos;

/// Viewer block position shared with the loader worker.
///
/// Components are stored independently, so a reader racing a writer may see a
/// mix of old and new components. That only affects ordering.
#[derive(Debug, Default)]
pub struct PriorityHint {
    x: AtomicI32,
    y: AtomicI32,
    z: AtomicI32,
}

impl PriorityHint {
    pub fn new(position: BlockPos) -> Self {
        let hint = Self::default();
        hint.store(position);
        hint
    }

    pub fn store(&self, position: BlockPos) {
        self.x.store(position.x, AtomicOrdering::Relaxed);
        self.y.store(position.y, AtomicOrdering::Relaxed);
        self.z.store(position.z, AtomicOrdering::Relaxed);
    }

    pub fn load(&self) -> BlockPos {
        BlockPos::new(
            self.x.load(AtomicOrdering::Relaxed),
            self.y.load(AtomicOrdering::Relaxed),
            self.z.load(AtomicOrdering::Relaxed),
        )
    }
}

/// Squared block distance, saturating for far-apart coordinates
pub fn distance_sq(a: BlockPos, b: BlockPos) -> i64 {
    let d = (a.as_i64vec3() - b.as_i64vec3()).abs();
    d.x.saturating_mul(d.x)
        .saturating_add(d.y.saturating_mul(d.y))
        .saturating_add(d.z.saturating_mul(d.z))
}

/// Priority of one block relative to the viewer
#[derive(Clone, Copy, Debug)]
pub struct BlockPriority {
    pub position: BlockPos,
    pub distance_sq: i64,
}

impl BlockPriority {
    pub fn calculate(position: BlockPos, viewer: BlockPos) -> Self {
        Self {
            position,
            distance_sq: distance_sq(position, viewer),
        }
    }
}

impl Eq for BlockPriority {}

impl PartialEq for BlockPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for BlockPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        // Closer is greater, so a max-heap pops the nearest block first
        other
            .distance_sq
            .cmp(&self.distance_sq)
            .then_with(|| other.position.to_array().cmp(&self.position.to_array()))
    }
}

impl PartialOrd for BlockPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort so that the item nearest to `viewer` ends up last, ready for `Vec::pop`
pub fn sort_for_pop<T>(items: &mut [T], viewer: BlockPos, position: impl Fn(&T) -> BlockPos) {
    items.sort_by_cached_key(|item| BlockPriority::calculate(position(item), viewer));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn test_hint_round_trip() {
        let hint = PriorityHint::new(BlockPos::new(1, -2, 3));
        assert_eq!(hint.load(), BlockPos::new(1, -2, 3));
        hint.store(BlockPos::new(-7, 0, 9));
        assert_eq!(hint.load(), BlockPos::new(-7, 0, 9));
    }

    #[test]
    fn test_distance_sq_no_overflow() {
        let far = BlockPos::splat(i32::MAX);
        let near = BlockPos::splat(i32::MIN);
        assert_eq!(distance_sq(far, near), i64::MAX);
        assert_eq!(distance_sq(BlockPos::new(1, 2, 2), BlockPos::ZERO), 9);
    }

    #[test]
    fn test_priority_ordering() {
        let viewer = BlockPos::ZERO;
        let near = BlockPriority::calculate(BlockPos::new(1, 0, 0), viewer);
        let far = BlockPriority::calculate(BlockPos::new(5, 0, 0), viewer);
        assert!(near > far);

        let mut heap = BinaryHeap::new();
        heap.push(far);
        heap.push(near);
        heap.push(BlockPriority::calculate(BlockPos::ZERO, viewer));
        assert_eq!(heap.pop().unwrap().position, BlockPos::ZERO);
        assert_eq!(heap.pop().unwrap().position, BlockPos::new(1, 0, 0));
        assert_eq!(heap.pop().unwrap().position, BlockPos::new(5, 0, 0));
    }

    #[test]
    fn test_sort_for_pop() {
        let mut positions = vec![
            BlockPos::new(0, 0, 4),
            BlockPos::new(10, 0, 0),
            BlockPos::new(9, 0, 1),
        ];
        sort_for_pop(&mut positions, BlockPos::new(10, 0, 0), |p| *p);
        assert_eq!(positions.pop(), Some(BlockPos::new(10, 0, 0)));
        assert_eq!(positions.pop(), Some(BlockPos::new(9, 0, 1)));
        assert_eq!(positions.pop(), Some(BlockPos::new(0, 0, 4)));
    }
}
