//! Background block loading with nearest-first scheduling

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::core::{BlockPos, Error, Result};
use crate::provider::VoxelProvider;
use crate::voxel::VoxelBuffer;

use super::priority::{sort_for_pop, PriorityHint};
use super::stats::WorkerStats;

/// Batch of blocks to emerge, with the viewer's block as ordering hint
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadInput {
    pub blocks_to_emerge: Vec<BlockPos>,
    pub priority_block_position: BlockPos,
}

/// A block produced by the loader
#[derive(Clone, Debug)]
pub struct EmergedBlock {
    pub position: BlockPos,
    pub voxels: VoxelBuffer,
}

/// Everything the loader finished since the last pop
#[derive(Clone, Debug, Default)]
pub struct LoadOutput {
    pub emerged_blocks: Vec<EmergedBlock>,
    pub stats: WorkerStats,
}

/// Loader worker seam. Both calls return immediately.
pub trait BlockLoader: Send {
    /// Queue a batch. An empty batch still refreshes the priority hint.
    fn push(&mut self, input: LoadInput);

    /// Take whatever results are ready
    fn pop(&mut self) -> LoadOutput;
}

#[derive(Debug)]
struct LoadJob {
    position: BlockPos,
    queued_at: Instant,
}

struct LoadDone {
    block: EmergedBlock,
    turnaround: Duration,
}

/// Loader running provider calls on a dedicated tokio runtime.
///
/// A worker task keeps the queued coordinates sorted by distance to the
/// current priority hint and runs at most `max_concurrent` provider calls at
/// once on the blocking pool.
pub struct LoaderThread {
    request_tx: Option<mpsc::UnboundedSender<Vec<BlockPos>>>,
    result_rx: mpsc::UnboundedReceiver<LoadDone>,
    hint: Arc<PriorityHint>,
    remaining: Arc<AtomicU64>,
    runtime: Option<Runtime>,
}

impl LoaderThread {
    /// Start the worker.
    ///
    /// # Arguments
    /// * `provider` - Source of voxel data, shared with blocking tasks
    /// * `block_size_pow2` - log2 of the block edge
    /// * `max_concurrent` - Maximum provider calls in flight
    pub fn new(
        provider: Arc<dyn VoxelProvider>,
        block_size_pow2: u32,
        max_concurrent: usize,
    ) -> Result<Self> {
        let max_concurrent = max_concurrent.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_concurrent)
            .thread_name("terrastream-loader")
            .enable_time()
            .build()
            .map_err(|e| Error::Worker(format!("failed to start loader runtime: {e}")))?;

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let hint = Arc::new(PriorityHint::default());
        let remaining = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            provider,
            block_size_pow2,
            max_concurrent,
            hint: Arc::clone(&hint),
            remaining: Arc::clone(&remaining),
        };
        runtime.spawn(worker.run(request_rx, result_tx));
        log::info!("Loader started ({max_concurrent} concurrent jobs)");

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            hint,
            remaining,
            runtime: Some(runtime),
        })
    }

    /// Blocks queued or being emerged
    pub fn remaining_blocks(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }
}

impl BlockLoader for LoaderThread {
    fn push(&mut self, input: LoadInput) {
        self.hint.store(input.priority_block_position);
        if input.blocks_to_emerge.is_empty() {
            return;
        }
        let Some(tx) = &self.request_tx else {
            return;
        };
        let count = input.blocks_to_emerge.len() as u64;
        self.remaining.fetch_add(count, Ordering::Relaxed);
        if tx.send(input.blocks_to_emerge).is_err() {
            self.remaining.fetch_sub(count, Ordering::Relaxed);
            log::error!("Loader worker is gone, dropping {count} requests");
        }
    }

    fn pop(&mut self) -> LoadOutput {
        let mut emerged_blocks = Vec::new();
        let mut times = Vec::new();
        while let Ok(done) = self.result_rx.try_recv() {
            times.push(done.turnaround);
            emerged_blocks.push(done.block);
        }
        LoadOutput {
            emerged_blocks,
            stats: WorkerStats::from_turnarounds(times, self.remaining_blocks()),
        }
    }
}

impl Drop for LoaderThread {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.request_tx.take();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        log::info!("Loader stopped");
    }
}

struct Worker {
    provider: Arc<dyn VoxelProvider>,
    block_size_pow2: u32,
    max_concurrent: usize,
    hint: Arc<PriorityHint>,
    remaining: Arc<AtomicU64>,
}

impl Worker {
    async fn run(
        self,
        mut request_rx: mpsc::UnboundedReceiver<Vec<BlockPos>>,
        result_tx: mpsc::UnboundedSender<LoadDone>,
    ) {
        let mut active_tasks: JoinSet<LoadDone> = JoinSet::new();
        let mut pending: Vec<LoadJob> = Vec::new();
        let mut sorted_for = None;

        loop {
            tokio::select! {
                Some(batch) = request_rx.recv() => {
                    let queued_at = Instant::now();
                    pending.extend(
                        batch.into_iter().map(|position| LoadJob { position, queued_at }),
                    );
                    sorted_for = None;
                }

                Some(joined) = active_tasks.join_next(), if !active_tasks.is_empty() => {
                    match joined {
                        Ok(done) => {
                            self.remaining.fetch_sub(1, Ordering::Relaxed);
                            if result_tx.send(done).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            self.remaining.fetch_sub(1, Ordering::Relaxed);
                            log::error!("Block load task failed: {e}");
                        }
                    }
                }

                else => {
                    if pending.is_empty() && active_tasks.is_empty() {
                        break;
                    }
                }
            }

            if pending.is_empty() || active_tasks.len() >= self.max_concurrent {
                continue;
            }

            // Re-sort when new work arrived or the viewer moved
            let viewer = self.hint.load();
            if sorted_for != Some(viewer) {
                sort_for_pop(&mut pending, viewer, |job| job.position);
                sorted_for = Some(viewer);
            }

            while active_tasks.len() < self.max_concurrent {
                let Some(job) = pending.pop() else {
                    break;
                };
                let provider = Arc::clone(&self.provider);
                let pow2 = self.block_size_pow2;
                active_tasks.spawn_blocking(move || emerge(provider.as_ref(), pow2, job));
            }
        }
        log::debug!("Loader worker loop exited");
    }
}

fn emerge(provider: &dyn VoxelProvider, block_size_pow2: u32, job: LoadJob) -> LoadDone {
    let mut voxels = VoxelBuffer::cube(1 << block_size_pow2);
    let s = block_size_pow2 as i32;
    let origin = BlockPos::new(job.position.x << s, job.position.y << s, job.position.z << s);
    provider.emerge_block(&mut voxels, origin);
    voxels.compress_uniform_channels();
    LoadDone {
        block: EmergedBlock {
            position: job.position,
            voxels,
        },
        turnaround: job.queued_at.elapsed(),
    }
}
