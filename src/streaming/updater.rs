//! Background mesh generation

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tokio::sync::mpsc;

use crate::core::{BlockPos, Error, Result};
use crate::mesher::{Mesher, MesherOutput};
use crate::voxel::VoxelBuffer;

use super::stats::WorkerStats;

/// A padded buffer to mesh, tagged with the revision it was dispatched under
#[derive(Clone, Debug)]
pub struct MeshRequest {
    pub position: BlockPos,
    pub voxels: VoxelBuffer,
    pub revision: u64,
}

#[derive(Clone, Debug, Default)]
pub struct MeshInput {
    pub blocks: Vec<MeshRequest>,
}

/// Surfaces generated for one block
#[derive(Clone, Debug)]
pub struct MeshedBlock {
    pub position: BlockPos,
    pub revision: u64,
    pub surfaces: MesherOutput,
}

#[derive(Clone, Debug, Default)]
pub struct MeshOutput {
    pub blocks: Vec<MeshedBlock>,
    pub stats: WorkerStats,
}

/// Mesh worker seam. Both calls return immediately.
pub trait MeshUpdater: Send {
    fn push(&mut self, input: MeshInput);
    fn pop(&mut self) -> MeshOutput;
}

struct Batch {
    requests: Vec<MeshRequest>,
    queued_at: Instant,
}

struct MeshDone {
    block: MeshedBlock,
    turnaround: Duration,
}

/// Mesh worker on a named OS thread.
///
/// Batches are received in order and each batch is meshed in parallel on the
/// rayon pool.
pub struct MeshUpdaterThread {
    request_tx: Option<mpsc::UnboundedSender<Batch>>,
    result_rx: mpsc::UnboundedReceiver<MeshDone>,
    remaining: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl MeshUpdaterThread {
    pub fn new(mesher: Arc<dyn Mesher>) -> Result<Self> {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<Batch>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<MeshDone>();
        let remaining = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&remaining);

        let handle = std::thread::Builder::new()
            .name("terrastream-mesher".into())
            .spawn(move || {
                while let Some(batch) = request_rx.blocking_recv() {
                    let queued_at = batch.queued_at;
                    let done: Vec<MeshDone> = batch
                        .requests
                        .into_par_iter()
                        .map(|req| MeshDone {
                            block: MeshedBlock {
                                position: req.position,
                                revision: req.revision,
                                surfaces: mesher.build(&req.voxels),
                            },
                            turnaround: queued_at.elapsed(),
                        })
                        .collect();
                    counter.fetch_sub(done.len() as u64, Ordering::Relaxed);
                    for item in done {
                        if result_tx.send(item).is_err() {
                            return;
                        }
                    }
                }
                log::debug!("Mesh worker loop exited");
            })
            .map_err(|e| Error::Worker(format!("failed to spawn mesh worker: {e}")))?;
        log::info!("Mesh updater started");

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            remaining,
            handle: Some(handle),
        })
    }

    /// Blocks queued or being meshed
    pub fn remaining_blocks(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }
}

impl MeshUpdater for MeshUpdaterThread {
    fn push(&mut self, input: MeshInput) {
        if input.blocks.is_empty() {
            return;
        }
        let Some(tx) = &self.request_tx else {
            return;
        };
        let count = input.blocks.len() as u64;
        self.remaining.fetch_add(count, Ordering::Relaxed);
        let batch = Batch {
            requests: input.blocks,
            queued_at: Instant::now(),
        };
        if tx.send(batch).is_err() {
            self.remaining.fetch_sub(count, Ordering::Relaxed);
            log::error!("Mesh worker is gone, dropping {count} requests");
        }
    }

    fn pop(&mut self) -> MeshOutput {
        let mut blocks = Vec::new();
        let mut times = Vec::new();
        while let Ok(done) = self.result_rx.try_recv() {
            times.push(done.turnaround);
            blocks.push(done.block);
        }
        MeshOutput {
            blocks,
            stats: WorkerStats::from_turnarounds(times, self.remaining_blocks()),
        }
    }
}

impl Drop for MeshUpdaterThread {
    fn drop(&mut self) {
        self.request_tx.take();
        // Later sends fail, so the worker exits after its current batch
        self.result_rx.close();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Mesh worker panicked");
            }
        }
        log::info!("Mesh updater stopped");
    }
}
