//! VoxelTerrain - block lifecycle manager
//!
//! Owns the dirty-state map and the pending queues, turns viewer movement into
//! load and unload decisions, and moves blocks through the loader and mesh
//! workers. Every call happens on the thread that owns the terrain; only the
//! workers run elsewhere.
//!
//! A coordinate has a dirty-map entry exactly while it has pending work:
//!
//! ```text
//! (absent) --dirty, not resident--> LOAD --loaded--> UPDATE_NOT_SENT
//! (absent) --dirty, resident-----------------------> UPDATE_NOT_SENT
//! UPDATE_NOT_SENT --dispatched--> UPDATE_SENT --committed--> (absent)
//! UPDATE_SENT --dirty again--> UPDATE_NOT_SENT
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{IVec3, UVec3, Vec3};

use crate::core::time::{Clock, SystemClock};
use crate::core::{duration_us, BlockPos, Error, Result};
use crate::math::Aabb3i;
use crate::mesher::{padded_size, CubicMesher, PADDING_MIN};
use crate::provider::VoxelProvider;
use crate::streaming::neighbors::{boundary_neighbors, expand_dirty_region};
use crate::streaming::{
    BlockLoader, BlockState, DirtyState, EmergedBlock, LoadInput, LoaderThread, MeshInput,
    MeshRequest, MeshUpdater, MeshUpdaterThread, MeshedBlock, TerrainStats,
};
use crate::voxel::{
    AIR, MAX_MATERIALS, Material, Mesh, VoxelBuffer, VoxelLibrary, VoxelMap, channel,
};

use super::config::TerrainConfig;
use super::host::{Notification, TerrainHost};

/// Streams blocks around a single viewer.
pub struct VoxelTerrain {
    config: TerrainConfig,
    map: VoxelMap,
    clock: Arc<dyn Clock>,

    loader: Option<Box<dyn BlockLoader>>,
    updater: Option<Box<dyn MeshUpdater>>,

    dirty_blocks: HashMap<BlockPos, DirtyState>,
    blocks_pending_load: Vec<BlockPos>,
    blocks_pending_update: Vec<BlockPos>,
    blocks_pending_main_thread_update: VecDeque<MeshedBlock>,

    /// Required area of the last tick; `None` forces a full rescan
    last_view_box: Option<Aabb3i>,
    /// Last revision handed to a mesh job
    revision: u64,

    stats: TerrainStats,
}

impl VoxelTerrain {
    /// Create a terrain driven by the system clock
    pub fn new(config: TerrainConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a terrain reading time from `clock`
    pub fn with_clock(config: TerrainConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let map = VoxelMap::new(config.block_size_pow2)?;
        Ok(Self {
            config,
            map,
            clock,
            loader: None,
            updater: None,
            dirty_blocks: HashMap::new(),
            blocks_pending_load: Vec::new(),
            blocks_pending_update: Vec::new(),
            blocks_pending_main_thread_update: VecDeque::new(),
            last_view_box: None,
            revision: 0,
            stats: TerrainStats::default(),
        })
    }

    // --- Collaborators ---

    /// Use `provider` for block data.
    ///
    /// Starts a new loader worker, drops every resident block, and reloads the
    /// view on the next tick.
    pub fn set_provider(&mut self, provider: Arc<dyn VoxelProvider>) -> Result<()> {
        let loader = LoaderThread::new(
            provider,
            self.config.block_size_pow2,
            self.config.loader_threads,
        )?;
        self.set_loader(Box::new(loader));
        self.immerge_all();
        self.make_all_view_dirty_deferred();
        Ok(())
    }

    /// Mesh with a [`CubicMesher`] over `library`; the whole view is remeshed next tick
    pub fn set_voxel_library(&mut self, library: Arc<VoxelLibrary>) -> Result<()> {
        let updater = MeshUpdaterThread::new(Arc::new(CubicMesher::new(library)))?;
        self.set_updater(Box::new(updater));
        self.make_all_view_dirty_deferred();
        Ok(())
    }

    /// Replace the loader worker. Loads the old one still owed are requested again.
    pub fn set_loader(&mut self, loader: Box<dyn BlockLoader>) {
        self.loader = Some(loader);
        self.blocks_pending_load.clear();
        for (&bpos, state) in &self.dirty_blocks {
            if *state == DirtyState::Load {
                self.blocks_pending_load.push(bpos);
            }
        }
    }

    /// Replace the mesh worker. Blocks the old one still owed are queued
    /// again as `UPDATE_NOT_SENT`.
    pub fn set_updater(&mut self, updater: Box<dyn MeshUpdater>) {
        self.updater = Some(updater);
        for (&bpos, state) in self.dirty_blocks.iter_mut() {
            if matches!(state, DirtyState::UpdateSent { .. }) {
                *state = DirtyState::UpdateNotSent;
                self.blocks_pending_update.push(bpos);
            }
        }
    }

    // --- Configuration ---

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Apply a new configuration. The block size cannot change at runtime.
    pub fn set_config(&mut self, config: TerrainConfig) -> Result<()> {
        config.validate()?;
        if config.block_size_pow2 != self.config.block_size_pow2 {
            return Err(Error::InvalidConfig("block_size_pow2 cannot change at runtime".into()));
        }
        if config.view_distance != self.config.view_distance {
            log::info!(
                "View distance changed from {} blocks to {} blocks",
                self.config.view_distance_blocks(),
                config.view_distance_blocks()
            );
        }
        self.config = config;
        Ok(())
    }

    pub fn view_distance(&self) -> i32 {
        self.config.view_distance
    }

    /// Set the view distance in voxels. The required area follows on the next tick.
    pub fn set_view_distance(&mut self, distance_in_voxels: i32) -> Result<()> {
        if distance_in_voxels < 0 {
            return Err(Error::InvalidViewDistance(distance_in_voxels));
        }
        if distance_in_voxels != self.config.view_distance {
            let old = self.config.view_distance_blocks();
            self.config.view_distance = distance_in_voxels;
            log::info!(
                "View distance changed from {old} blocks to {} blocks",
                self.config.view_distance_blocks()
            );
        }
        Ok(())
    }

    pub fn viewer_path(&self) -> &str {
        &self.config.viewer_path
    }

    pub fn set_viewer_path(&mut self, path: impl Into<String>) {
        self.config.viewer_path = path.into();
    }

    pub fn generate_collisions(&self) -> bool {
        self.config.generate_collisions
    }

    pub fn set_generate_collisions(&mut self, enabled: bool) {
        self.config.generate_collisions = enabled;
    }

    pub fn run_in_editor(&self) -> bool {
        self.config.run_in_editor
    }

    pub fn set_run_in_editor(&mut self, enabled: bool) {
        self.config.run_in_editor = enabled;
    }

    pub fn material(&self, index: usize) -> Result<Option<&Material>> {
        self.config
            .materials
            .get(index)
            .map(Option::as_ref)
            .ok_or(Error::MaterialIndex { index, max: MAX_MATERIALS - 1 })
    }

    /// Bind a material to a model surface slot. Meshes already committed keep their material.
    pub fn set_material(&mut self, index: usize, material: Option<Material>) -> Result<()> {
        let slot = self
            .config
            .materials
            .get_mut(index)
            .ok_or(Error::MaterialIndex { index, max: MAX_MATERIALS - 1 })?;
        *slot = material;
        Ok(())
    }

    // --- Queries ---

    pub fn map(&self) -> &VoxelMap {
        &self.map
    }

    pub fn stats(&self) -> &TerrainStats {
        &self.stats
    }

    /// Block containing a voxel-space point
    pub fn voxel_to_block(&self, pos: Vec3) -> BlockPos {
        self.map.voxel_to_block_f(pos)
    }

    /// Voxel-space origin of a block
    pub fn block_to_voxel(&self, pos: BlockPos) -> IVec3 {
        self.map.block_to_voxel(pos)
    }

    /// Lifecycle state of a block coordinate
    pub fn get_block_state(&self, pos: BlockPos) -> BlockState {
        match self.dirty_blocks.get(&pos) {
            Some(state) => (*state).into(),
            None if self.map.has_block(pos) => BlockState::Idle,
            None => BlockState::None,
        }
    }

    /// Whether the coordinate has pending load or mesh work
    pub fn is_block_dirty(&self, pos: BlockPos) -> bool {
        self.dirty_blocks.contains_key(&pos)
    }

    /// Required area used by the last tick
    pub fn view_box(&self) -> Option<Aabb3i> {
        self.last_view_box
    }

    /// Mesh results waiting for the time-boxed commit
    pub fn pending_commit_count(&self) -> usize {
        self.blocks_pending_main_thread_update.len()
    }

    // --- Editing ---

    /// Read a voxel. Non-resident voxels read as zero.
    pub fn get_voxel(&self, pos: IVec3, channel: usize) -> u8 {
        self.map.get_voxel(pos, channel)
    }

    /// Write a voxel of a resident block and schedule the affected remeshes.
    ///
    /// Returns `false` if the block is not resident or the channel is invalid.
    pub fn set_voxel(&mut self, pos: IVec3, value: u8, channel: usize) -> bool {
        if !self.map.set_voxel(pos, value, channel) {
            return false;
        }
        self.make_voxel_dirty(pos);
        true
    }

    /// Mark the block owning a voxel dirty, plus every neighbor whose mesh samples it
    pub fn make_voxel_dirty(&mut self, pos: IVec3) {
        let bpos = self.map.voxel_to_block(pos);
        let local = self.map.to_local(pos);
        self.make_block_dirty(bpos);

        let neighbors = boundary_neighbors(local, self.map.block_size() as i32);
        if self.config.ambient_occlusion {
            for offset in neighbors.all() {
                self.make_block_dirty(bpos + *offset);
            }
        } else {
            for offset in neighbors.faces() {
                self.make_block_dirty(bpos + offset);
            }
        }
    }

    /// Mark every block whose mesh samples the voxel box `[min, min + size)` dirty.
    /// Empty boxes are ignored.
    pub fn make_area_dirty(&mut self, min: IVec3, size: IVec3) {
        let Some(region) = Aabb3i::from_min_size(min, size) else {
            return;
        };
        let block_size = self.map.block_size() as i32;
        let region = expand_dirty_region(region, block_size, self.config.ambient_occlusion);
        let blocks = self.map.voxel_box_to_blocks(region);
        log::debug!("Area dirty: voxels {region:?} -> {} blocks", blocks.volume());
        for bpos in blocks.iter() {
            self.make_block_dirty(bpos);
        }
    }

    /// Rescan the whole required area on the next tick
    pub fn make_all_view_dirty_deferred(&mut self) {
        self.last_view_box = None;
    }

    /// Forward a host lifecycle event to every resident block
    pub fn notify(&mut self, notification: Notification) {
        match notification {
            Notification::EnterWorld(world) => {
                self.map.for_all_blocks(|b| b.instance.enter_world(world))
            }
            Notification::ExitWorld => self.map.for_all_blocks(|b| b.instance.exit_world()),
            Notification::VisibilityChanged(visible) => {
                self.map.for_all_blocks(|b| b.instance.set_visible(visible))
            }
        }
    }

    // --- Lifecycle ---

    /// Queue `bpos` for work. A resident block is remeshed. A missing block is
    /// loaded when it lies in the current view (or no view exists yet) and is
    /// otherwise ignored, since the area diff would never evict it.
    fn make_block_dirty(&mut self, bpos: BlockPos) {
        match self.dirty_blocks.get(&bpos) {
            None => {
                if self.map.has_block(bpos) {
                    self.dirty_blocks.insert(bpos, DirtyState::UpdateNotSent);
                    self.blocks_pending_update.push(bpos);
                } else if self.last_view_box.is_none_or(|b| b.contains(bpos)) {
                    self.dirty_blocks.insert(bpos, DirtyState::Load);
                    self.blocks_pending_load.push(bpos);
                } else {
                    log::trace!("Ignoring dirty block {bpos} outside the view");
                }
            }
            Some(DirtyState::UpdateSent { .. }) => {
                // Content changed while meshing: the in-flight result is stale
                self.dirty_blocks.insert(bpos, DirtyState::UpdateNotSent);
                self.blocks_pending_update.push(bpos);
            }
            Some(DirtyState::Load | DirtyState::UpdateNotSent) => {}
        }
    }

    /// Evict a block. Its queue entries are pruned by the next area change.
    fn immerge_block(&mut self, bpos: BlockPos) {
        self.map.remove_block(bpos);
        self.dirty_blocks.remove(&bpos);
    }

    fn immerge_all(&mut self) {
        let count = self.map.clear();
        self.dirty_blocks.clear();
        self.blocks_pending_load.clear();
        self.blocks_pending_update.clear();
        self.blocks_pending_main_thread_update.clear();
        if count > 0 {
            log::info!("Evicted {count} blocks");
        }
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    // --- Tick ---

    /// Run one tick for the viewer the host resolves from the configured path.
    ///
    /// Returns `false` when skipped because the host is in editor mode.
    pub fn process(&mut self, host: &dyn TerrainHost) -> bool {
        let editor = host.is_editor();
        if editor && !self.config.run_in_editor {
            return false;
        }
        let viewer_pos = if editor {
            Vec3::ZERO
        } else {
            host.viewer_position(&self.config.viewer_path).unwrap_or(Vec3::ZERO)
        };
        self.update(viewer_pos);
        true
    }

    /// Run one tick with the viewer at `viewer_pos` (voxel space)
    pub fn update(&mut self, viewer_pos: Vec3) {
        let mut stats = TerrainStats::default();
        let viewer_block = self.map.voxel_to_block_f(viewer_pos);

        let t = self.clock.now();
        self.update_required_area(viewer_block);
        stats.time_detect_required_blocks_us = self.elapsed_us(t);

        let t = self.clock.now();
        self.send_load_requests(viewer_block);
        stats.time_send_load_requests_us = self.elapsed_us(t);

        let t = self.clock.now();
        self.process_load_responses(&mut stats);
        stats.time_process_load_responses_us = self.elapsed_us(t);

        let t = self.clock.now();
        self.send_update_requests();
        stats.time_send_update_requests_us = self.elapsed_us(t);

        let t = self.clock.now();
        self.process_update_responses(&mut stats);
        stats.time_process_update_responses_us = self.elapsed_us(t);

        stats.updater.remaining_main_thread_blocks =
            self.blocks_pending_main_thread_update.len() as u64;
        stats.dirty_blocks = self.dirty_blocks.len() as u64;
        stats.pending_loads = self.blocks_pending_load.len() as u64;
        stats.pending_updates = self.blocks_pending_update.len() as u64;
        stats.resident_blocks = self.map.block_count() as u64;
        self.stats = stats;

        log::trace!(
            "Tick at {viewer_block}: {} dirty, {} resident, {} awaiting commit",
            self.stats.dirty_blocks,
            self.stats.resident_blocks,
            self.stats.updater.remaining_main_thread_blocks
        );
    }

    fn elapsed_us(&self, since: Instant) -> u64 {
        duration_us(self.clock.now().saturating_duration_since(since))
    }

    fn update_required_area(&mut self, viewer_block: BlockPos) {
        let radius = self.config.view_distance_blocks();
        let new_box = Aabb3i::from_center_extents(viewer_block, IVec3::splat(radius));
        let prev_box = self.last_view_box.replace(new_box);
        if prev_box == Some(new_box) {
            return;
        }

        match prev_box {
            Some(prev) => {
                for bpos in prev.iter() {
                    if !new_box.contains(bpos) {
                        self.immerge_block(bpos);
                    }
                }
                for bpos in new_box.iter() {
                    if !prev.contains(bpos) {
                        self.make_block_dirty(bpos);
                    }
                }
            }
            None => {
                let outside: Vec<BlockPos> =
                    self.map.positions().filter(|p| !new_box.contains(*p)).collect();
                for bpos in outside {
                    self.immerge_block(bpos);
                }
                for bpos in new_box.iter() {
                    self.make_block_dirty(bpos);
                }
            }
        }

        // Drop queued work that left the area
        let dirty = &mut self.dirty_blocks;
        let mut prune = |bpos: &BlockPos| {
            let keep = new_box.contains(*bpos);
            if !keep {
                dirty.remove(bpos);
            }
            keep
        };
        self.blocks_pending_load.retain(&mut prune);
        self.blocks_pending_update.retain(&mut prune);

        log::debug!(
            "Required area {}..={} ({} blocks), {} loads and {} updates queued",
            new_box.min,
            new_box.max,
            new_box.volume(),
            self.blocks_pending_load.len(),
            self.blocks_pending_update.len()
        );
    }

    fn send_load_requests(&mut self, viewer_block: BlockPos) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        let input = LoadInput {
            blocks_to_emerge: std::mem::take(&mut self.blocks_pending_load),
            priority_block_position: viewer_block,
        };
        loader.push(input);
    }

    fn process_load_responses(&mut self, stats: &mut TerrainStats) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        let output = loader.pop();
        stats.provider.worker = output.stats;
        for block in output.emerged_blocks {
            self.accept_loaded_block(block, stats);
        }
    }

    fn accept_loaded_block(&mut self, emerged: EmergedBlock, stats: &mut TerrainStats) {
        let bpos = emerged.position;
        if self.dirty_blocks.get(&bpos) != Some(&DirtyState::Load) {
            // Evicted or superseded while loading
            stats.provider.dropped_blocks += 1;
            return;
        }

        let expected = UVec3::splat(self.map.block_size());
        if emerged.voxels.size() != expected {
            log::error!(
                "Provider returned a {} buffer for block {bpos}, expected {expected}; dropping it",
                emerged.voxels.size()
            );
            self.dirty_blocks.remove(&bpos);
            stats.provider.rejected_blocks += 1;
            return;
        }

        let first_install = !self.map.has_block(bpos);
        let floor = self.revision;
        let block = self.map.set_block_buffer(bpos, emerged.voxels);
        // Mesh jobs dispatched before this install are stale
        block.mesh_revision = floor;

        self.dirty_blocks.remove(&bpos);
        self.make_block_dirty(bpos);

        if first_install {
            // Neighbors that just became complete can now be meshed correctly
            for offset in Aabb3i::from_center_extents(IVec3::ZERO, IVec3::ONE).iter() {
                let npos = bpos + offset;
                if self.map.has_block(npos) && self.map.is_block_surrounded(npos) {
                    self.make_block_dirty(npos);
                }
            }
        }
    }

    fn send_update_requests(&mut self) {
        if self.updater.is_none() {
            return;
        }
        let block_size = self.map.block_size();
        let mut input = MeshInput::default();

        for bpos in std::mem::take(&mut self.blocks_pending_update) {
            let Some(block) = self.map.get_block(bpos) else {
                continue;
            };
            if self.dirty_blocks.get(&bpos) != Some(&DirtyState::UpdateNotSent) {
                continue;
            }

            if block.voxels.is_air() {
                let floor = self.revision;
                if let Some(block) = self.map.get_block_mut(bpos) {
                    block.instance.set_mesh(None);
                    block.voxels.clear_channel(channel::TYPE, AIR);
                    block.mesh_revision = floor;
                }
                self.dirty_blocks.remove(&bpos);
                continue;
            }

            let mut padded = VoxelBuffer::cube(padded_size(block_size));
            let min = self.map.block_to_voxel(bpos) - IVec3::splat(PADDING_MIN as i32);
            self.map.get_buffer_copy(min, &mut padded, channel::MESHING_MASK);

            let revision = self.next_revision();
            input.blocks.push(MeshRequest {
                position: bpos,
                voxels: padded,
                revision,
            });
            self.dirty_blocks.insert(bpos, DirtyState::UpdateSent { revision });
        }

        if let Some(updater) = self.updater.as_mut() {
            updater.push(input);
        }
    }

    fn process_update_responses(&mut self, stats: &mut TerrainStats) {
        if let Some(updater) = self.updater.as_mut() {
            let output = updater.pop();
            stats.updater.worker = output.stats;
            stats.updater.updated_blocks = output.blocks.len() as u64;
            self.blocks_pending_main_thread_update.extend(output.blocks);
        }

        let budget = Duration::from_millis(self.config.commit_budget_ms);
        let start = self.clock.now();
        while !self.blocks_pending_main_thread_update.is_empty() {
            if self.clock.now().saturating_duration_since(start) >= budget {
                break;
            }
            let Some(result) = self.blocks_pending_main_thread_update.pop_front() else {
                break;
            };
            if !self.commit_mesh(result) {
                stats.updater.dropped_blocks += 1;
            }
        }
        stats.updater.mesh_alloc_time_us = self.elapsed_us(start);
    }

    /// Install a mesh result. Returns `false` if it was dropped.
    fn commit_mesh(&mut self, result: MeshedBlock) -> bool {
        let bpos = result.position;
        let Some(block) = self.map.get_block_mut(bpos) else {
            return false;
        };
        if result.revision <= block.mesh_revision {
            // Superseded by a newer install or mesh
            return false;
        }

        let sent = DirtyState::UpdateSent { revision: result.revision };
        if self.dirty_blocks.get(&bpos) == Some(&sent) {
            self.dirty_blocks.remove(&bpos);
        }

        let mut mesh = Mesh::new();
        for (slot, arrays) in result.surfaces.model_surfaces.into_iter().enumerate() {
            if arrays.is_empty() {
                continue;
            }
            let material = self.config.materials.get(slot).cloned().flatten();
            mesh.add_surface(arrays, material);
        }
        for arrays in result.surfaces.smooth_surfaces {
            if !arrays.is_empty() {
                mesh.add_surface(arrays, None);
            }
        }

        block.instance.set_mesh((mesh.surface_count() > 0).then_some(mesh));
        block.mesh_revision = result.revision;
        true
    }
}
