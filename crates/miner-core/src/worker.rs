//! Per-thread nonce search.
//!
//! A worker owns one slice of the nonce space and a private engine for the
//! round's header. It hashes in lane batches, and every `resync_batches`
//! batches it refreshes the header time, publishes progress and looks at the
//! round's stop flag. Worker 0 leads: it also turns a process interrupt into
//! a round stop and watches the chain tip for blocks found elsewhere.

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use crate::block::{HeaderTemplate, WorkTemplate};
use crate::config::MinerConfig;
use crate::engine::{Engine, LaneWidth};
use crate::filter::CandidateFilter;
use crate::node::Node;
use crate::round::{RoundState, Solution};

/// Size of the nonce space.
pub const NONCE_SPACE: u64 = 1 << 32;

/// Half-open nonce interval `[start, end)` with `end <= 2^32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchRange {
    pub start: u64,
    pub end: u64,
}

impl SearchRange {
    pub const FULL: SearchRange = SearchRange {
        start: 0,
        end: NONCE_SPACE,
    };

    pub fn new(start: u64, end: u64) -> Self {
        let end = end.min(NONCE_SPACE);
        SearchRange {
            start: start.min(end),
            end,
        }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, nonce: u32) -> bool {
        (self.start..self.end).contains(&u64::from(nonce))
    }

    /// Split into `parts` consecutive ranges of equal size; the last one also
    /// takes the remainder.
    pub fn split(&self, parts: usize) -> Vec<SearchRange> {
        if parts == 0 {
            return Vec::new();
        }
        let chunk = self.len() / parts as u64;
        (0..parts as u64)
            .map(|i| {
                let start = self.start + i * chunk;
                let end = if i + 1 == parts as u64 {
                    self.end
                } else {
                    start + chunk
                };
                SearchRange { start, end }
            })
            .collect()
    }
}

/// Worker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Initializing,
    Hashing,
    Resyncing,
    Stopping,
    Done,
}

/// Why a worker returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerExit {
    /// This worker's solution won the round.
    Solved,
    /// Every nonce in the range was tried.
    Exhausted,
    /// The round was stopped before the range ran out.
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub id: usize,
    pub range: SearchRange,
    pub hashes: u64,
    /// Digests that passed the pre-check but not the full check.
    pub false_positives: u64,
    pub exit: WorkerExit,
}

/// Knobs a worker takes from [`MinerConfig`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub lanes: LaneWidth,
    pub resync_batches: u32,
    pub tip_poll_interval: Duration,
}

impl From<&MinerConfig> for WorkerSettings {
    fn from(config: &MinerConfig) -> Self {
        WorkerSettings {
            lanes: config.lane_width(),
            resync_batches: config.resync_batches,
            tip_poll_interval: config.tip_poll_interval(),
        }
    }
}

pub struct WorkerLoop<'a, N: Node + ?Sized> {
    id: usize,
    range: SearchRange,
    node: &'a N,
    round: &'a RoundState,
    work: &'a WorkTemplate,
    settings: WorkerSettings,
    filter: CandidateFilter,
    state: WorkerState,
    header: HeaderTemplate,
    engine: Engine,
    cursor: u64,
    hashes: u64,
    false_positives: u64,
    exit: WorkerExit,
}

impl<'a, N: Node + ?Sized> WorkerLoop<'a, N> {
    pub fn new(
        id: usize,
        range: SearchRange,
        node: &'a N,
        round: &'a RoundState,
        work: &'a WorkTemplate,
        settings: WorkerSettings,
    ) -> Self {
        let header = work.header.clone();
        let engine = Engine::new(&header);
        WorkerLoop {
            id,
            range,
            node,
            round,
            work,
            settings,
            filter: CandidateFilter::new(&work.target, header.bits()),
            state: WorkerState::Initializing,
            header,
            engine,
            cursor: range.start,
            hashes: 0,
            false_positives: 0,
            exit: WorkerExit::Stopped,
        }
    }

    fn is_lead(&self) -> bool {
        self.id == 0
    }

    /// Drive the worker to completion.
    pub fn run(mut self) -> WorkerReport {
        while self.state != WorkerState::Done {
            self.state = match self.state {
                WorkerState::Initializing => self.initialize(),
                WorkerState::Hashing => self.hash(),
                WorkerState::Resyncing => self.resync(),
                WorkerState::Stopping => self.finish(),
                WorkerState::Done => WorkerState::Done,
            };
        }
        WorkerReport {
            id: self.id,
            range: self.range,
            hashes: self.hashes,
            false_positives: self.false_positives,
            exit: self.exit,
        }
    }

    fn initialize(&mut self) -> WorkerState {
        debug!(
            "worker {} scanning nonces {:#x}..{:#x}",
            self.id, self.range.start, self.range.end
        );
        self.cursor = self.range.start;
        if self.range.is_empty() {
            self.exit = WorkerExit::Exhausted;
            return WorkerState::Stopping;
        }
        WorkerState::Hashing
    }

    fn hash(&mut self) -> WorkerState {
        for _ in 0..self.settings.resync_batches {
            let remaining = self.range.end - self.cursor;
            if remaining == 0 {
                self.exit = WorkerExit::Exhausted;
                return WorkerState::Stopping;
            }

            let count = self.settings.lanes.count().min(remaining as usize);
            let width = LaneWidth::from_count(count).unwrap_or(LaneWidth::One);
            let batch = self.engine.hash_batch(width, self.cursor as u32);
            self.hashes += batch.len() as u64;
            self.cursor += batch.len() as u64;

            for (nonce, digest) in batch.iter() {
                if !self.filter.precheck(digest) {
                    continue;
                }
                match self.filter.check(self.node, digest) {
                    Some(hash) => {
                        let mut header = self.header.clone();
                        header.set_nonce(nonce);
                        let solution = Solution {
                            time: header.time(),
                            header,
                            nonce,
                            hash,
                            worker: self.id,
                        };
                        self.exit = if self.round.claim(solution) {
                            info!("worker {} found block {hash} (nonce {nonce:#010x})", self.id);
                            WorkerExit::Solved
                        } else {
                            WorkerExit::Stopped
                        };
                        return WorkerState::Stopping;
                    }
                    None => self.false_positives += 1,
                }
            }
        }
        WorkerState::Resyncing
    }

    fn resync(&mut self) -> WorkerState {
        let time = self.node.adjusted_time();
        if time != self.header.time() {
            self.header.set_time(time);
            self.engine.set_time(time);
        }
        self.round.publish_progress(self.id, self.hashes);

        if self.is_lead() {
            self.lead_checks();
        }
        if self.round.should_stop() {
            self.exit = WorkerExit::Stopped;
            return WorkerState::Stopping;
        }
        WorkerState::Hashing
    }

    fn lead_checks(&self) {
        let interrupt = self.round.interrupt();
        if interrupt.is_triggered() {
            self.round.stop();
            return;
        }

        let expected = self.work.header.prev_block_hash();
        while !self.round.should_stop() && !interrupt.is_triggered() {
            match self.node.chain_tip_hash() {
                Some(tip) => {
                    if tip != expected {
                        warn!("chain tip moved to {tip}, abandoning template");
                        self.round.supersede();
                    }
                    return;
                }
                None => thread::sleep(self.settings.tip_poll_interval),
            }
        }
    }

    fn finish(&mut self) -> WorkerState {
        self.round.publish_progress(self.id, self.hashes);
        if self.exit == WorkerExit::Exhausted {
            debug!("worker {} exhausted its range after {} hashes", self.id, self.hashes);
            if self.is_lead() {
                self.round.exhaust();
            }
        }
        WorkerState::Done
    }
}
