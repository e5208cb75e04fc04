//! Runs one mining round across a pool of worker threads.
//!
//! The coordinator splits the nonce space, starts one named thread per worker
//! over a shared [`RoundState`], waits for all of them and, if one found a
//! solution, hands the winning header to the node.

use std::thread;

use log::{debug, info, warn};
use serde::Serialize;

use crate::block::WorkTemplate;
use crate::config::MinerConfig;
use crate::difficulty::{bits_to_difficulty, format_difficulty};
use crate::error::MinerError;
use crate::node::Node;
use crate::round::{Interrupt, RoundState, Solution};
use crate::stats::RoundReport;
use crate::worker::{SearchRange, WorkerLoop, WorkerReport, WorkerSettings};

/// What happened to a solved header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Accepted,
    Rejected,
    /// No peer connected in time; the solution was dropped.
    NoPeers,
    /// The node returned an error while taking the block.
    Failed,
}

pub struct MiningCoordinator<N: Node> {
    node: N,
    config: MinerConfig,
    interrupt: Interrupt,
}

impl<N: Node> MiningCoordinator<N> {
    pub fn new(node: N, config: MinerConfig, interrupt: Interrupt) -> Result<Self, MinerError> {
        config.validate()?;
        Ok(MiningCoordinator {
            node,
            config,
            interrupt,
        })
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Mine `work` over the whole nonce space.
    pub fn run_round(&self, work: &WorkTemplate) -> Result<RoundReport, MinerError> {
        self.run_range(work, SearchRange::FULL)
    }

    /// Mine `work` over `range` only.
    pub fn run_range(
        &self,
        work: &WorkTemplate,
        range: SearchRange,
    ) -> Result<RoundReport, MinerError> {
        let threads = self.config.threads();
        let settings = WorkerSettings::from(&self.config);
        let bits = work.header.bits();

        info!(
            "mining on {} with {threads} threads x {} lanes, bits {bits:08x}, difficulty {}",
            work.header.prev_block_hash(),
            settings.lanes.count(),
            format_difficulty(bits_to_difficulty(bits)),
        );
        debug!("target {}", work.target);

        let round = RoundState::new(threads, self.interrupt.clone());
        let workers = self.spawn_workers(work, range.split(threads), &round, settings)?;

        let outcome = round.outcome();
        let mut report = RoundReport::new(outcome, bits, round.elapsed(), workers);
        info!(
            "round {outcome:?}: {} hashes in {} ms ({})",
            report.hashes, report.elapsed_ms, report.hash_rate
        );

        if let Some(solution) = round.winner() {
            let submission = match self.submit(solution) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("submitting block {} failed: {err}", solution.hash);
                    SubmitOutcome::Failed
                }
            };
            report.submission = Some(submission);
            report.solution = Some(solution.clone());
        }
        Ok(report)
    }

    fn spawn_workers(
        &self,
        work: &WorkTemplate,
        ranges: Vec<SearchRange>,
        round: &RoundState,
        settings: WorkerSettings,
    ) -> Result<Vec<WorkerReport>, MinerError> {
        let node = &self.node;
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(ranges.len());
            for (id, range) in ranges.into_iter().enumerate() {
                let worker = WorkerLoop::new(id, range, node, round, work, settings);
                let spawned = thread::Builder::new()
                    .name(format!("miner-{id}"))
                    .spawn_scoped(scope, move || worker.run());
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        round.stop();
                        return Err(MinerError::Spawn { worker: id, source });
                    }
                }
            }

            // Join everything before looking at results.
            let joined: Vec<_> = handles.into_iter().map(|handle| handle.join()).collect();
            joined
                .into_iter()
                .enumerate()
                .map(|(worker, result)| result.map_err(|_| MinerError::WorkerPanicked { worker }))
                .collect()
        })
    }

    /// Hand a solution to the node, waiting briefly for peers if there are
    /// none.
    pub fn submit(&self, solution: &Solution) -> Result<SubmitOutcome, MinerError> {
        if !self.node.has_peers() {
            warn!(
                "no peers for block submission, retrying for {} ms",
                self.config.peer_poll_interval_ms * u64::from(self.config.submit_peer_polls)
            );
            let mut polls = self.config.submit_peer_polls;
            while polls > 0 && !self.node.has_peers() {
                thread::sleep(self.config.peer_poll_interval());
                polls -= 1;
            }
            if !self.node.has_peers() {
                warn!("still no peers, dropping block {}", solution.hash);
                return Ok(SubmitOutcome::NoPeers);
            }
        }

        let header = solution.header.to_header();
        if self.node.submit_block(&header)? {
            info!("submitted block {} (time {}) accepted", solution.hash, solution.time);
            Ok(SubmitOutcome::Accepted)
        } else {
            warn!("submitted block {} rejected", solution.hash);
            Ok(SubmitOutcome::Rejected)
        }
    }
}
