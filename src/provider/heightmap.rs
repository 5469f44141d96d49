//! Noise-based heightmap terrain

use glam::IVec3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::VoxelProvider;
use crate::voxel::{channel, VoxelBuffer};

/// Voxel type ids written by [`NoiseProvider`], matching `VoxelLibrary::terrain_default`
pub mod types {
    pub const STONE: u8 = 1;
    pub const DIRT: u8 = 2;
    pub const GRASS: u8 = 3;
    pub const WATER: u8 = 4;
}

/// Parameters controlling heightmap generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightmapParams {
    pub seed: u32,
    /// Horizontal scale (larger = smoother)
    pub scale: f32,
    /// Height of the lowest valley floor
    pub base_height: f32,
    /// Vertical range above `base_height`
    pub height_scale: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    /// Air below this height is filled with water
    pub sea_level: f32,
    /// Dirt layer thickness under the grass
    pub dirt_depth: f32,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 100.0,
            base_height: -16.0,
            height_scale: 48.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            sea_level: 0.0,
            dirt_depth: 3.0,
        }
    }
}

/// fBm Perlin heightmap provider.
///
/// Writes stone, dirt and grass columns, water up to the sea level, and a
/// clamped signed distance to the surface in the ISOLEVEL channel (128 = on
/// the surface, larger = deeper).
pub struct NoiseProvider {
    params: HeightmapParams,
    noise: Fbm<Perlin>,
}

impl NoiseProvider {
    pub fn new(params: HeightmapParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);
        Self { params, noise }
    }

    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }

    /// Terrain surface height at world column (x, z)
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let nx = (x / self.params.scale) as f64;
        let nz = (z / self.params.scale) as f64;
        // fBm output is roughly [-1, 1]
        let n = self.noise.get([nx, nz]).clamp(-1.0, 1.0);
        let normalized = (n + 1.0) * 0.5;
        self.params.base_height + (normalized * self.params.height_scale as f64) as f32
    }

    fn classify(&self, y: f32, height: f32) -> u8 {
        let depth = height - y;
        if depth > self.params.dirt_depth + 1.0 {
            types::STONE
        } else if depth > 1.0 {
            types::DIRT
        } else if depth > 0.0 {
            types::GRASS
        } else if y < self.params.sea_level {
            types::WATER
        } else {
            0
        }
    }
}

impl VoxelProvider for NoiseProvider {
    fn emerge_block(&self, out: &mut VoxelBuffer, origin: IVec3) {
        let size = out.size().as_ivec3();
        let min_y = origin.y as f32;
        let max_y = (origin.y + size.y) as f32;

        let mut heights = Vec::with_capacity((size.x * size.z) as usize);
        for z in 0..size.z {
            for x in 0..size.x {
                let wx = (origin.x + x) as f32 + 0.5;
                let wz = (origin.z + z) as f32 + 0.5;
                heights.push(self.height_at(wx, wz));
            }
        }
        let lowest = heights.iter().copied().fold(f32::INFINITY, f32::min);
        let highest = heights.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        // Entirely above ground and sea
        if min_y >= highest && min_y >= self.params.sea_level {
            out.fill(0, channel::TYPE);
            out.fill(0, channel::ISOLEVEL);
            return;
        }
        // Entirely deep underground
        if max_y + self.params.dirt_depth + 1.0 < lowest {
            out.fill(types::STONE, channel::TYPE);
            out.fill(u8::MAX, channel::ISOLEVEL);
            return;
        }

        for z in 0..size.z {
            for x in 0..size.x {
                let h = heights[(z * size.x + x) as usize];
                for y in 0..size.y {
                    let wy = (origin.y + y) as f32 + 0.5;
                    let p = IVec3::new(x, y, z);
                    out.set_voxel(p, channel::TYPE, self.classify(wy, h));
                    let iso = ((h - wy) * 16.0 + 128.0).clamp(0.0, 255.0) as u8;
                    out.set_voxel(p, channel::ISOLEVEL, iso);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_default() {
        let params = HeightmapParams::default();
        assert_eq!(params.seed, 12345);
        assert_eq!(params.octaves, 4);
        assert_eq!(params.persistence, 0.5);
        assert_eq!(params.lacunarity, 2.0);
    }

    #[test]
    fn test_height_range_and_consistency() {
        let provider = NoiseProvider::new(HeightmapParams::default());
        for (x, z) in [(0.0, 0.0), (50.0, 50.0), (-73.5, 12.25)] {
            let h = provider.height_at(x, z);
            assert!((-16.0..=32.0).contains(&h), "height {h} out of range");
            assert_eq!(h, provider.height_at(x, z));
        }
    }

    #[test]
    fn test_different_seeds() {
        let a = NoiseProvider::new(HeightmapParams { seed: 1, ..Default::default() });
        let b = NoiseProvider::new(HeightmapParams { seed: 2, ..Default::default() });
        assert_ne!(a.height_at(50.0, 50.0), b.height_at(50.0, 50.0));
    }

    #[test]
    fn test_sky_and_bedrock_blocks_are_uniform() {
        let provider = NoiseProvider::new(HeightmapParams::default());
        let mut buf = VoxelBuffer::cube(16);
        provider.emerge_block(&mut buf, IVec3::new(0, 64, 0));
        assert!(buf.is_air());

        provider.emerge_block(&mut buf, IVec3::new(0, -64, 0));
        assert_eq!(buf.uniform_value(channel::TYPE), Some(types::STONE));
    }

    #[test]
    fn test_surface_column_layers() {
        let params = HeightmapParams {
            height_scale: 0.0,
            base_height: 8.0,
            sea_level: -100.0,
            ..Default::default()
        };
        let provider = NoiseProvider::new(params);
        let mut buf = VoxelBuffer::cube(16);
        provider.emerge_block(&mut buf, IVec3::ZERO);
        let at = |y| buf.get_voxel(IVec3::new(3, y, 3), channel::TYPE);
        // Surface at 8.0: grass at 7, dirt 4..=6, stone below
        assert_eq!(at(8), 0);
        assert_eq!(at(7), types::GRASS);
        assert_eq!(at(6), types::DIRT);
        assert_eq!(at(4), types::DIRT);
        assert_eq!(at(3), types::STONE);
        assert!(buf.get_voxel(IVec3::new(3, 0, 3), channel::ISOLEVEL) > 128);
    }

    #[test]
    fn test_water_fills_below_sea_level() {
        let params = HeightmapParams {
            height_scale: 0.0,
            base_height: -4.0,
            sea_level: 2.0,
            ..Default::default()
        };
        let provider = NoiseProvider::new(params);
        let mut buf = VoxelBuffer::cube(8);
        provider.emerge_block(&mut buf, IVec3::ZERO);
        assert_eq!(buf.get_voxel(IVec3::new(0, 1, 0), channel::TYPE), types::WATER);
        assert_eq!(buf.get_voxel(IVec3::new(0, 2, 0), channel::TYPE), 0);
    }
}
