use criterion::{criterion_group, criterion_main, Criterion, black_box};

use std::sync::Arc;

use glam::{IVec3, Vec3};

use terrastream::mesher::{padded_size, CubicMesher, Mesher};
use terrastream::provider::{FlatProvider, HeightmapParams, NoiseProvider, VoxelProvider};
use terrastream::streaming::neighbors::boundary_neighbors;
use terrastream::streaming::{ImmediateLoader, ImmediateUpdater};
use terrastream::terrain::{TerrainConfig, VoxelTerrain};
use terrastream::voxel::{VoxelBuffer, VoxelLibrary};

fn immediate_terrain(view_blocks: i32) -> VoxelTerrain {
    let config = TerrainConfig {
        view_distance: view_blocks * 16,
        block_size_pow2: 4,
        ..Default::default()
    };
    let mut terrain = VoxelTerrain::new(config).unwrap();
    let provider = Arc::new(NoiseProvider::new(HeightmapParams::default()));
    let library = Arc::new(VoxelLibrary::terrain_default());
    terrain.set_loader(Box::new(ImmediateLoader::new(provider, 4)));
    terrain.set_updater(Box::new(ImmediateUpdater::new(Arc::new(CubicMesher::new(library)))));
    terrain
}

fn bench_settle_view_2(c: &mut Criterion) {
    c.bench_function("settle_view_2", |b| {
        b.iter(|| {
            let mut terrain = immediate_terrain(2);
            for _ in 0..3 {
                terrain.update(black_box(Vec3::ZERO));
            }
            terrain.stats().resident_blocks
        });
    });
}

fn bench_move_one_block(c: &mut Criterion) {
    let mut terrain = immediate_terrain(3);
    for _ in 0..3 {
        terrain.update(Vec3::ZERO);
    }
    let mut x = 0.0;

    c.bench_function("move_one_block_view_3", |b| {
        b.iter(|| {
            x += 16.0;
            terrain.update(black_box(Vec3::new(x, 0.0, 0.0)));
        });
    });
}

fn bench_cubic_mesher_16(c: &mut Criterion) {
    let provider = NoiseProvider::new(HeightmapParams::default());
    let mut padded = VoxelBuffer::cube(padded_size(16));
    // Pick a block straddling the surface
    let height = provider.height_at(0.0, 0.0).floor() as i32;
    provider.emerge_block(&mut padded, IVec3::new(-1, height - 9, -1));
    let mesher = CubicMesher::new(Arc::new(VoxelLibrary::terrain_default()));

    c.bench_function("cubic_mesher_16", |b| {
        b.iter(|| mesher.build(black_box(&padded)));
    });
}

fn bench_flat_emerge_16(c: &mut Criterion) {
    let provider = FlatProvider::new(8, 1);
    let mut out = VoxelBuffer::cube(16);

    c.bench_function("flat_emerge_16", |b| {
        b.iter(|| provider.emerge_block(&mut out, black_box(IVec3::ZERO)));
    });
}

fn bench_boundary_neighbors(c: &mut Criterion) {
    c.bench_function("boundary_neighbors_block_16", |b| {
        b.iter(|| {
            let mut total = 0;
            for z in 0..16 {
                for y in 0..16 {
                    for x in 0..16 {
                        total += boundary_neighbors(black_box(IVec3::new(x, y, z)), 16).all().len();
                    }
                }
            }
            total
        });
    });
}

fn bench_make_area_dirty(c: &mut Criterion) {
    let mut terrain = immediate_terrain(4);
    for _ in 0..3 {
        terrain.update(Vec3::ZERO);
    }

    c.bench_function("make_area_dirty_32", |b| {
        b.iter(|| {
            terrain.make_area_dirty(black_box(IVec3::new(-16, -16, -16)), IVec3::splat(32));
            terrain.update(Vec3::ZERO);
        });
    });
}

criterion_group!(
    benches,
    bench_settle_view_2,
    bench_move_one_block,
    bench_cubic_mesher_16,
    bench_flat_emerge_16,
    bench_boundary_neighbors,
    bench_make_area_dirty,
);
criterion_main!(benches);
