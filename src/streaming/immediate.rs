//! Synchronous workers for tests and benchmarks
//!
//! Both doubles are cheap handles over shared state: keep a clone to inspect
//! requests, hold work back, or inject hand-made results while the terrain
//! owns the other clone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::BlockPos;
use crate::mesher::Mesher;
use crate::provider::VoxelProvider;
use crate::voxel::VoxelBuffer;

use super::loader::{BlockLoader, EmergedBlock, LoadInput, LoadOutput};
use super::priority::sort_for_pop;
use super::stats::WorkerStats;
use super::updater::{MeshInput, MeshOutput, MeshRequest, MeshUpdater, MeshedBlock};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct LoaderState {
    provider: Option<Arc<dyn VoxelProvider>>,
    block_size_pow2: u32,
    paused: bool,
    requested: Vec<BlockPos>,
    ready: Vec<EmergedBlock>,
    hint: BlockPos,
    pushes: usize,
}

/// Loader that emerges every request on the calling thread, nearest first.
///
/// While paused, or when built without a provider, requests are only recorded.
#[derive(Clone)]
pub struct ImmediateLoader {
    state: Arc<Mutex<LoaderState>>,
}

impl ImmediateLoader {
    pub fn new(provider: Arc<dyn VoxelProvider>, block_size_pow2: u32) -> Self {
        Self::build(Some(provider), block_size_pow2)
    }

    /// Loader that never produces anything on its own
    pub fn manual(block_size_pow2: u32) -> Self {
        Self::build(None, block_size_pow2)
    }

    fn build(provider: Option<Arc<dyn VoxelProvider>>, block_size_pow2: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(LoaderState {
                provider,
                block_size_pow2,
                paused: false,
                requested: Vec::new(),
                ready: Vec::new(),
                hint: BlockPos::ZERO,
                pushes: 0,
            })),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        lock(&self.state).paused = paused;
    }

    /// Requests recorded but not yet served
    pub fn requested(&self) -> Vec<BlockPos> {
        lock(&self.state).requested.clone()
    }

    /// Take the recorded requests without serving them
    pub fn take_requested(&self) -> Vec<BlockPos> {
        std::mem::take(&mut lock(&self.state).requested)
    }

    /// Priority hint of the last push
    pub fn last_hint(&self) -> BlockPos {
        lock(&self.state).hint
    }

    /// Number of pushes received, empty ones included
    pub fn push_count(&self) -> usize {
        lock(&self.state).pushes
    }

    /// Serve every recorded request now. Without a provider blocks come out as air.
    pub fn complete_all(&self) {
        let mut state = lock(&self.state);
        let mut requested = std::mem::take(&mut state.requested);
        sort_for_pop(&mut requested, state.hint, |p| *p);
        while let Some(position) = requested.pop() {
            let block = state.emerge(position);
            state.ready.push(block);
        }
    }

    /// Queue a result as if the worker had produced it
    pub fn inject(&self, block: EmergedBlock) {
        lock(&self.state).ready.push(block);
    }
}

impl LoaderState {
    fn emerge(&self, position: BlockPos) -> EmergedBlock {
        let mut voxels = VoxelBuffer::cube(1 << self.block_size_pow2);
        if let Some(provider) = &self.provider {
            let s = self.block_size_pow2 as i32;
            let origin = BlockPos::new(position.x << s, position.y << s, position.z << s);
            provider.emerge_block(&mut voxels, origin);
        }
        EmergedBlock { position, voxels }
    }
}

impl BlockLoader for ImmediateLoader {
    fn push(&mut self, input: LoadInput) {
        {
            let mut state = lock(&self.state);
            state.pushes += 1;
            state.hint = input.priority_block_position;
            state.requested.extend(input.blocks_to_emerge);
            if state.paused || state.provider.is_none() {
                return;
            }
        }
        self.complete_all();
    }

    fn pop(&mut self) -> LoadOutput {
        let mut state = lock(&self.state);
        let remaining = state.requested.len() as u64;
        LoadOutput {
            emerged_blocks: std::mem::take(&mut state.ready),
            stats: WorkerStats {
                remaining_blocks: remaining,
                ..WorkerStats::default()
            },
        }
    }
}

struct UpdaterState {
    mesher: Arc<dyn Mesher>,
    paused: bool,
    pending: Vec<MeshRequest>,
    ready: Vec<MeshedBlock>,
    meshed: usize,
}

/// Updater that meshes every request on the calling thread, in order.
#[derive(Clone)]
pub struct ImmediateUpdater {
    state: Arc<Mutex<UpdaterState>>,
}

impl ImmediateUpdater {
    pub fn new(mesher: Arc<dyn Mesher>) -> Self {
        Self {
            state: Arc::new(Mutex::new(UpdaterState {
                mesher,
                paused: false,
                pending: Vec::new(),
                ready: Vec::new(),
                meshed: 0,
            })),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        lock(&self.state).paused = paused;
    }

    /// Positions dispatched but not yet meshed, in dispatch order
    pub fn pending_positions(&self) -> Vec<BlockPos> {
        lock(&self.state).pending.iter().map(|r| r.position).collect()
    }

    /// Dispatched requests not yet meshed, in dispatch order
    pub fn pending_requests(&self) -> Vec<MeshRequest> {
        lock(&self.state).pending.clone()
    }

    /// Total blocks meshed so far
    pub fn meshed_count(&self) -> usize {
        lock(&self.state).meshed
    }

    /// Mesh everything held back
    pub fn complete_all(&self) {
        let mut state = lock(&self.state);
        let pending = std::mem::take(&mut state.pending);
        for req in pending {
            let surfaces = state.mesher.build(&req.voxels);
            state.ready.push(MeshedBlock {
                position: req.position,
                revision: req.revision,
                surfaces,
            });
            state.meshed += 1;
        }
    }

    /// Queue a result as if the worker had produced it
    pub fn inject(&self, block: MeshedBlock) {
        lock(&self.state).ready.push(block);
    }
}

impl MeshUpdater for ImmediateUpdater {
    fn push(&mut self, input: MeshInput) {
        let paused = {
            let mut state = lock(&self.state);
            state.pending.extend(input.blocks);
            state.paused
        };
        if !paused {
            self.complete_all();
        }
    }

    fn pop(&mut self) -> MeshOutput {
        let mut state = lock(&self.state);
        let remaining = state.pending.len() as u64;
        MeshOutput {
            blocks: std::mem::take(&mut state.ready),
            stats: WorkerStats {
                remaining_blocks: remaining,
                ..WorkerStats::default()
            },
        }
    }
}
