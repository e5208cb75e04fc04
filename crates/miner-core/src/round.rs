//! State shared by every worker of one mining round.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::block::HeaderTemplate;
use crate::hash::BlockHash;

/// Process-level cancellation handle. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A header that met its target, exactly as it was hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub header: HeaderTemplate,
    pub nonce: u32,
    pub time: u32,
    pub hash: BlockHash,
    pub worker: usize,
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    Solved,
    Exhausted,
    Superseded,
    Interrupted,
}

#[derive(Debug)]
pub struct RoundState {
    found: AtomicBool,
    stop: AtomicBool,
    superseded: AtomicBool,
    exhausted: AtomicBool,
    winner: OnceLock<Solution>,
    progress: Vec<AtomicU64>,
    interrupt: Interrupt,
    started: Instant,
}

impl RoundState {
    pub fn new(workers: usize, interrupt: Interrupt) -> Self {
        RoundState {
            found: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            superseded: AtomicBool::new(false),
            exhausted: AtomicBool::new(false),
            winner: OnceLock::new(),
            progress: (0..workers).map(|_| AtomicU64::new(0)).collect(),
            interrupt,
            started: Instant::now(),
        }
    }

    /// Record `solution` as the round's winner and stop the round. Only the
    /// first claim wins; later claims return `false`.
    pub fn claim(&self, solution: Solution) -> bool {
        let won = self.winner.set(solution).is_ok();
        if won {
            self.found.store(true, Ordering::Release);
        }
        self.stop();
        won
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// The chain moved past the template.
    pub fn supersede(&self) {
        self.superseded.store(true, Ordering::Release);
        self.stop();
    }

    /// The lead worker ran out of nonces.
    pub fn exhaust(&self) {
        self.exhausted.store(true, Ordering::Release);
        self.stop();
    }

    pub fn is_found(&self) -> bool {
        self.found.load(Ordering::Acquire)
    }

    pub fn is_superseded(&self) -> bool {
        self.superseded.load(Ordering::Acquire)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn winner(&self) -> Option<&Solution> {
        self.winner.get()
    }

    pub fn publish_progress(&self, worker: usize, hashes: u64) {
        if let Some(slot) = self.progress.get(worker) {
            slot.store(hashes, Ordering::Relaxed);
        }
    }

    pub fn progress(&self, worker: usize) -> u64 {
        self.progress
            .get(worker)
            .map_or(0, |slot| slot.load(Ordering::Relaxed))
    }

    pub fn total_hashes(&self) -> u64 {
        self.progress.iter().map(|slot| slot.load(Ordering::Relaxed)).sum()
    }

    pub fn workers(&self) -> usize {
        self.progress.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Reason the round ended, read once every worker has returned.
    pub fn outcome(&self) -> RoundOutcome {
        if self.is_found() {
            RoundOutcome::Solved
        } else if self.interrupt.is_triggered() {
            RoundOutcome::Interrupted
        } else if self.is_superseded() {
            RoundOutcome::Superseded
        } else {
            RoundOutcome::Exhausted
        }
    }
}
