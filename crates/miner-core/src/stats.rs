//! Round and session statistics.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::coordinator::SubmitOutcome;
use crate::hash::BlockHash;
use crate::round::{RoundOutcome, Solution};
use crate::worker::WorkerReport;

/// Hashes per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct HashRate(pub f64);

impl HashRate {
    pub fn from_hashes(hashes: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            HashRate(hashes as f64 / secs)
        } else {
            HashRate(0.0)
        }
    }
}

impl fmt::Display for HashRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = self.0;
        if rate >= 1_000_000_000.0 {
            write!(f, "{:.2} GH/s", rate / 1_000_000_000.0)
        } else if rate >= 1_000_000.0 {
            write!(f, "{:.2} MH/s", rate / 1_000_000.0)
        } else if rate >= 1_000.0 {
            write!(f, "{:.2} KH/s", rate / 1_000.0)
        } else {
            write!(f, "{:.2} H/s", rate)
        }
    }
}

/// Everything one round did.
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub outcome: RoundOutcome,
    /// Present when the round was solved.
    pub submission: Option<SubmitOutcome>,
    pub solution: Option<Solution>,
    pub bits: u32,
    pub hashes: u64,
    pub false_positives: u64,
    pub elapsed_ms: u64,
    pub hash_rate: HashRate,
    pub workers: Vec<WorkerReport>,
}

impl RoundReport {
    pub fn new(
        outcome: RoundOutcome,
        bits: u32,
        elapsed: Duration,
        workers: Vec<WorkerReport>,
    ) -> Self {
        let hashes = workers.iter().map(|w| w.hashes).sum();
        RoundReport {
            outcome,
            submission: None,
            solution: None,
            bits,
            hashes,
            false_positives: workers.iter().map(|w| w.false_positives).sum(),
            elapsed_ms: elapsed.as_millis() as u64,
            hash_rate: HashRate::from_hashes(hashes, elapsed),
            workers,
        }
    }
}

/// Totals over a mining session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    pub rounds: u64,
    pub solved: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Solutions dropped because no peer was around to take them.
    pub dropped: u64,
    /// Solutions the node errored on during submission.
    pub failed: u64,
    pub exhausted: u64,
    pub superseded: u64,
    pub interrupted: u64,
    pub template_errors: u64,
    pub total_hashes: u64,
    pub elapsed_ms: u64,
    pub hash_rate: HashRate,
    /// Hashes of accepted blocks, oldest first.
    pub blocks: Vec<BlockHash>,
}

impl SessionStats {
    pub fn record(&mut self, report: &RoundReport) {
        self.rounds += 1;
        self.total_hashes += report.hashes;
        self.elapsed_ms += report.elapsed_ms;
        self.hash_rate =
            HashRate::from_hashes(self.total_hashes, Duration::from_millis(self.elapsed_ms));

        match report.outcome {
            RoundOutcome::Solved => self.solved += 1,
            RoundOutcome::Exhausted => self.exhausted += 1,
            RoundOutcome::Superseded => self.superseded += 1,
            RoundOutcome::Interrupted => self.interrupted += 1,
        }
        match report.submission {
            Some(SubmitOutcome::Accepted) => {
                self.accepted += 1;
                if let Some(solution) = &report.solution {
                    self.blocks.push(solution.hash);
                }
            }
            Some(SubmitOutcome::Rejected) => self.rejected += 1,
            Some(SubmitOutcome::NoPeers) => self.dropped += 1,
            Some(SubmitOutcome::Failed) => self.failed += 1,
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{SearchRange, WorkerExit};

    fn worker(id: usize, hashes: u64) -> WorkerReport {
        WorkerReport {
            id,
            range: SearchRange::new(0, hashes),
            hashes,
            false_positives: 1,
            exit: WorkerExit::Stopped,
        }
    }

    #[test]
    fn test_hash_rate_display() {
        assert_eq!(HashRate(12.0).to_string(), "12.00 H/s");
        assert_eq!(HashRate(1_500.0).to_string(), "1.50 KH/s");
        assert_eq!(HashRate(2_340_000.0).to_string(), "2.34 MH/s");
        assert_eq!(HashRate(7_000_000_000.0).to_string(), "7.00 GH/s");
    }

    #[test]
    fn test_hash_rate_from_hashes() {
        assert_eq!(HashRate::from_hashes(5_000, Duration::from_secs(2)), HashRate(2_500.0));
        assert_eq!(HashRate::from_hashes(5_000, Duration::ZERO), HashRate(0.0));
    }

    #[test]
    fn test_round_report_sums_workers() {
        let report = RoundReport::new(
            RoundOutcome::Exhausted,
            0x1d00ffff,
            Duration::from_secs(1),
            vec![worker(0, 100), worker(1, 300)],
        );
        assert_eq!(report.hashes, 400);
        assert_eq!(report.false_positives, 2);
        assert_eq!(report.hash_rate, HashRate(400.0));
    }

    #[test]
    fn test_session_records_outcomes() {
        let mut stats = SessionStats::default();

        let mut solved = RoundReport::new(
            RoundOutcome::Solved,
            0x207fffff,
            Duration::from_millis(500),
            vec![worker(0, 10)],
        );
        solved.submission = Some(SubmitOutcome::NoPeers);
        stats.record(&solved);

        let superseded = RoundReport::new(
            RoundOutcome::Superseded,
            0x207fffff,
            Duration::from_millis(500),
            vec![worker(0, 20)],
        );
        stats.record(&superseded);

        let mut failed = solved.clone();
        failed.submission = Some(SubmitOutcome::Failed);
        stats.record(&failed);

        assert_eq!(stats.rounds, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.solved, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.superseded, 1);
        assert_eq!(stats.accepted, 0);
        assert_eq!(stats.total_hashes, 40);
        assert_eq!(stats.hash_rate, HashRate(40.0 / 1.5));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["rounds"], 3);
        assert_eq!(json["failed"], 1);
    }
}
