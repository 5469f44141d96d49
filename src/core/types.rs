//! Core type aliases and re-exports

pub use glam::{
    Vec2, Vec3,
    IVec3, UVec3,
};

/// Position of a block in block-space (voxel position divided by block size, floored)
pub type BlockPos = IVec3;

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Convert a duration to whole microseconds, saturating at `u64::MAX`.
pub fn duration_us(d: std::time::Duration) -> u64 {
    d.as_micros().min(u128::from(u64::MAX)) as u64
}
