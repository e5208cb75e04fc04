//! Miner configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::LaneWidth;
use crate::error::MinerError;

/// Upper bound on worker threads.
pub const MAX_THREADS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinerConfig {
    /// Worker threads; hardware concurrency when unset.
    pub threads: Option<usize>,
    /// Nonces per engine call; detected from the host when unset.
    pub lanes: Option<LaneWidth>,
    /// Batches between resyncs (time refresh, progress, stop checks).
    pub resync_batches: u32,
    /// Payout destination passed to the node with every template request.
    pub payout: String,
    /// Sleep while the node cannot report its tip.
    pub tip_poll_interval_ms: u64,
    /// Interval between peer checks, also used while waiting for sync.
    pub peer_poll_interval_ms: u64,
    /// Peer checks before a solved block is dropped.
    pub submit_peer_polls: u32,
    /// Offline peer polls after which the chain must settle before mining.
    pub sync_after_offline_polls: u64,
    /// Consecutive polls the chain height must hold to count as synced.
    pub sync_window_polls: u32,
    /// Pause after a failed template request.
    pub template_retry_ms: u64,
    /// Stop the session after this many rounds.
    pub max_rounds: Option<u64>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            threads: None,
            lanes: None,
            resync_batches: 1 << 18,
            payout: String::from("local"),
            tip_poll_interval_ms: 5,
            peer_poll_interval_ms: 100,
            submit_peer_polls: 50,
            sync_after_offline_polls: 6000,
            sync_window_polls: 100,
            template_retry_ms: 1000,
            max_rounds: None,
        }
    }
}

impl MinerConfig {
    pub fn validate(&self) -> Result<(), MinerError> {
        if let Some(threads) = self.threads {
            if threads == 0 || threads > MAX_THREADS {
                return Err(MinerError::Config(format!(
                    "threads must be between 1 and {MAX_THREADS}, got {threads}"
                )));
            }
        }
        if self.resync_batches == 0 {
            return Err(MinerError::Config("resync_batches must be positive".into()));
        }
        if self.payout.is_empty() {
            return Err(MinerError::Config("payout must not be empty".into()));
        }
        if self.max_rounds == Some(0) {
            return Err(MinerError::Config("max_rounds must be positive when set".into()));
        }
        Ok(())
    }

    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).clamp(1, MAX_THREADS)
    }

    pub fn lane_width(&self) -> LaneWidth {
        self.lanes.unwrap_or_else(LaneWidth::detect)
    }

    pub fn tip_poll_interval(&self) -> Duration {
        Duration::from_millis(self.tip_poll_interval_ms)
    }

    pub fn peer_poll_interval(&self) -> Duration {
        Duration::from_millis(self.peer_poll_interval_ms)
    }

    pub fn template_retry(&self) -> Duration {
        Duration::from_millis(self.template_retry_ms)
    }
}
