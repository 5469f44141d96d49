//! Integer geometry helpers

pub mod aabb;

pub use aabb::Aabb3i;
