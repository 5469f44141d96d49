//! Diagnostic counters refreshed every tick

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::duration_us;

/// Turnaround and backlog of one background worker, for the results drained in one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Fastest request-to-result time among drained results (µs)
    pub min_time_us: u64,
    /// Slowest request-to-result time among drained results (µs)
    pub max_time_us: u64,
    /// Blocks pushed but not yet finished
    pub remaining_blocks: u64,
}

impl WorkerStats {
    /// Build from the turnaround times of drained results. No results gives zero min/max.
    pub fn from_turnarounds(
        times: impl IntoIterator<Item = Duration>,
        remaining_blocks: u64,
    ) -> Self {
        let mut min = u64::MAX;
        let mut max = 0;
        for t in times {
            let us = duration_us(t);
            min = min.min(us);
            max = max.max(us);
        }
        Self {
            min_time_us: if min == u64::MAX { 0 } else { min },
            max_time_us: max,
            remaining_blocks,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStats {
    #[serde(flatten)]
    pub worker: WorkerStats,
    /// Loaded blocks discarded because their coordinate was no longer awaited
    pub dropped_blocks: u64,
    /// Loaded blocks discarded because their buffer had the wrong size
    pub rejected_blocks: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterStats {
    #[serde(flatten)]
    pub worker: WorkerStats,
    /// Results drained from the mesh worker this tick
    pub updated_blocks: u64,
    /// Mesh results discarded (block gone or superseded)
    pub dropped_blocks: u64,
    /// Results still waiting for the time-boxed commit
    pub remaining_main_thread_blocks: u64,
    /// Time spent committing meshes this tick (µs)
    pub mesh_alloc_time_us: u64,
}

/// Snapshot of the scheduler's state after the last tick
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainStats {
    pub provider: ProviderStats,
    pub updater: UpdaterStats,
    pub time_detect_required_blocks_us: u64,
    pub time_send_load_requests_us: u64,
    pub time_process_load_responses_us: u64,
    pub time_send_update_requests_us: u64,
    pub time_process_update_responses_us: u64,
    /// Coordinates with pending work
    pub dirty_blocks: u64,
    pub pending_loads: u64,
    pub pending_updates: u64,
    pub resident_blocks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_stats_empty() {
        let stats = WorkerStats::from_turnarounds([], 4);
        assert_eq!(stats, WorkerStats { min_time_us: 0, max_time_us: 0, remaining_blocks: 4 });
    }

    #[test]
    fn test_worker_stats_min_max() {
        let times = [
            Duration::from_micros(300),
            Duration::from_millis(2),
            Duration::from_micros(50),
        ];
        let stats = WorkerStats::from_turnarounds(times, 0);
        assert_eq!(stats.min_time_us, 50);
        assert_eq!(stats.max_time_us, 2000);
    }

    #[test]
    fn test_stats_json_flattens_worker() {
        let stats = TerrainStats {
            provider: ProviderStats {
                worker: WorkerStats { min_time_us: 1, max_time_us: 2, remaining_blocks: 3 },
                dropped_blocks: 4,
                rejected_blocks: 0,
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["provider"]["remaining_blocks"], 3);
        assert_eq!(json["provider"]["dropped_blocks"], 4);
        assert_eq!(json["updater"]["mesh_alloc_time_us"], 0);
    }
}
