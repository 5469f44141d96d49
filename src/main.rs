//! Terrastream - headless streaming demo
//!
//! Streams noise terrain around a viewer flying along +X and logs what the
//! scheduler is doing.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use glam::Vec3;

use terrastream::core::{logging, Result};
use terrastream::debug::TerrainDebugHandler;
use terrastream::provider::{HeightmapParams, NoiseProvider};
use terrastream::terrain::{StaticViewers, TerrainConfig, VoxelTerrain};
use terrastream::voxel::{Material, VoxelLibrary};

const DEFAULT_TICKS: u64 = 600;
const DEFAULT_SPEED: f32 = 2.0;
const TICK_INTERVAL: Duration = Duration::from_millis(16);
const STATS_INTERVAL: u64 = 60;

fn main() {
    logging::init();
    log::info!("Terrastream starting...");

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let ticks = parse_ticks_arg(&args).unwrap_or(DEFAULT_TICKS);
    let speed = parse_speed_arg(&args).unwrap_or(DEFAULT_SPEED);

    let mut config = match parse_config_arg(&args) {
        Some(path) => {
            log::info!("Loading config from: {}", path.display());
            TerrainConfig::load_sync(&path)?
        }
        None => TerrainConfig::default(),
    };
    if config.viewer_path.is_empty() {
        config.viewer_path = "Viewer".into();
    }
    default_materials(&mut config);

    let mut params = HeightmapParams::default();
    if let Some(seed) = parse_seed_arg(&args) {
        params.seed = seed;
    }
    log::info!(
        "View distance {} voxels, block size {}, seed {}",
        config.view_distance,
        config.block_size(),
        params.seed
    );

    let mut terrain = VoxelTerrain::new(config)?;
    terrain.set_provider(Arc::new(NoiseProvider::new(params)))?;
    terrain.set_voxel_library(Arc::new(VoxelLibrary::terrain_default()))?;
    let terrain = Arc::new(Mutex::new(terrain));

    if let Some(port) = parse_debug_port_arg(&args) {
        spawn_debug_server(Arc::clone(&terrain), port);
    }

    let viewer_path = lock(&terrain).viewer_path().to_string();
    let mut viewer = StaticViewers::single(viewer_path.clone(), Vec3::ZERO);
    let mut position = Vec3::new(0.0, 16.0, 0.0);

    for tick in 0..ticks {
        viewer.set(viewer_path.clone(), position);
        {
            let mut terrain = lock(&terrain);
            terrain.process(&viewer);
            if tick % STATS_INTERVAL == 0 {
                log_stats(tick, &terrain);
            }
        }
        position.x += speed;
        std::thread::sleep(TICK_INTERVAL);
    }

    log_stats(ticks, &lock(&terrain));
    log::info!("Done after {ticks} ticks");
    Ok(())
}

fn lock(terrain: &Mutex<VoxelTerrain>) -> std::sync::MutexGuard<'_, VoxelTerrain> {
    terrain.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Give the library's material slots something to bind if the config left them empty
fn default_materials(config: &mut TerrainConfig) {
    let defaults = [
        Material::new("stone", [0.5, 0.5, 0.5]),
        Material::new("dirt", [0.45, 0.32, 0.2]),
        Material::new("grass", [0.3, 0.6, 0.2]),
        Material::new("water", [0.2, 0.35, 0.8]),
    ];
    for (slot, material) in config.materials.iter_mut().zip(defaults) {
        if slot.is_none() {
            *slot = Some(material);
        }
    }
}

fn log_stats(tick: u64, terrain: &VoxelTerrain) {
    let stats = terrain.stats();
    log::info!(
        "tick {tick}: {} resident, {} dirty, loads {} pending / {} in flight, \
         meshes {} in flight / {} awaiting commit",
        stats.resident_blocks,
        stats.dirty_blocks,
        stats.pending_loads,
        stats.provider.worker.remaining_blocks,
        stats.updater.worker.remaining_blocks,
        stats.updater.remaining_main_thread_blocks,
    );
    log::debug!(
        "tick {tick} phases (us): detect {}, send loads {}, loads {}, \
         send updates {}, updates {} (commit {})",
        stats.time_detect_required_blocks_us,
        stats.time_send_load_requests_us,
        stats.time_process_load_responses_us,
        stats.time_send_update_requests_us,
        stats.time_process_update_responses_us,
        stats.updater.mesh_alloc_time_us,
    );
}

/// Start the debug server in a background thread with its own tokio runtime
fn spawn_debug_server(terrain: Arc<Mutex<VoxelTerrain>>, port: u16) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("Failed to create debug runtime: {e}");
                return;
            }
        };
        rt.block_on(async {
            let handler = Arc::new(tokio::sync::Mutex::new(TerrainDebugHandler::new(terrain)));
            let _server = match terrastream_debug::DebugServer::start(handler, port).await {
                Ok(server) => server,
                Err(e) => {
                    log::error!("{e}");
                    return;
                }
            };
            // Keep runtime alive forever
            loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        });
    });
}

/// Parse --config argument from command line (JSON terrain config)
fn parse_config_arg(args: &[String]) -> Option<PathBuf> {
    for i in 0..args.len() {
        if args[i] == "--config" || args[i] == "-c" {
            if let Some(path) = args.get(i + 1) {
                return Some(PathBuf::from(path));
            }
        }
    }
    None
}

/// Parse --ticks argument from command line
fn parse_ticks_arg(args: &[String]) -> Option<u64> {
    for i in 0..args.len() {
        if args[i] == "--ticks" || args[i] == "-t" {
            if let Some(ticks) = args.get(i + 1) {
                return ticks.parse().ok();
            }
        }
    }
    None
}

/// Parse --speed argument from command line (voxels per tick)
fn parse_speed_arg(args: &[String]) -> Option<f32> {
    for i in 0..args.len() {
        if args[i] == "--speed" || args[i] == "-s" {
            if let Some(speed) = args.get(i + 1) {
                return speed.parse().ok();
            }
        }
    }
    None
}

/// Parse --seed argument from command line
fn parse_seed_arg(args: &[String]) -> Option<u32> {
    for i in 0..args.len() {
        if args[i] == "--seed" {
            if let Some(seed) = args.get(i + 1) {
                return seed.parse().ok();
            }
        }
    }
    None
}

/// Parse --debug-port argument from command line
fn parse_debug_port_arg(args: &[String]) -> Option<u16> {
    for i in 0..args.len() {
        if args[i] == "--debug-port" {
            if let Some(port) = args.get(i + 1) {
                return port.parse().ok();
            }
        }
    }
    None
}
