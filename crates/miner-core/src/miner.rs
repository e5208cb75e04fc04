//! Solo mining session: wait for the network, fetch a template, run a round,
//! repeat.

use std::thread;

use log::{info, warn};

use crate::block::WorkTemplate;
use crate::config::MinerConfig;
use crate::coordinator::MiningCoordinator;
use crate::error::MinerError;
use crate::node::Node;
use crate::round::{Interrupt, RoundOutcome};
use crate::stats::SessionStats;

pub struct Miner<N: Node> {
    coordinator: MiningCoordinator<N>,
}

impl<N: Node> Miner<N> {
    pub fn new(node: N, config: MinerConfig, interrupt: Interrupt) -> Result<Self, MinerError> {
        Ok(Miner {
            coordinator: MiningCoordinator::new(node, config, interrupt)?,
        })
    }

    pub fn coordinator(&self) -> &MiningCoordinator<N> {
        &self.coordinator
    }

    fn node(&self) -> &N {
        self.coordinator.node()
    }

    fn config(&self) -> &MinerConfig {
        self.coordinator.config()
    }

    fn interrupted(&self) -> bool {
        self.coordinator.interrupt().is_triggered()
    }

    /// Block until the node has peers. Returns how many polls came back
    /// empty.
    pub fn wait_for_peers(&self) -> u64 {
        let mut polls = 0;
        while !self.node().has_peers() {
            if self.interrupted() {
                break;
            }
            if polls % 10 == 0 {
                info!("waiting for peers to connect ({polls})");
            }
            polls += 1;
            thread::sleep(self.config().peer_poll_interval());
        }
        polls
    }

    /// Block until the chain height holds still for `sync_window_polls`
    /// consecutive polls.
    pub fn wait_for_sync(&self) {
        let window = self.config().sync_window_polls;
        let mut height = self.node().chain_height();
        let mut stable = 0;
        info!("waiting for chain to settle at height {height}");
        while stable < window && !self.interrupted() {
            thread::sleep(self.config().peer_poll_interval());
            let current = self.node().chain_height();
            if current == height {
                stable += 1;
            } else {
                info!("chain moved to height {current}");
                height = current;
                stable = 0;
            }
        }
    }

    /// Wait for peers, and for sync as well after a long time offline.
    fn wait_for_network(&self) {
        let offline = self.wait_for_peers();
        if offline > self.config().sync_after_offline_polls {
            self.wait_for_sync();
        }
    }

    /// Fetch the beat reference and a header committing to it.
    pub fn next_template(&self) -> Result<WorkTemplate, MinerError> {
        let reference = self.node().reference_hash()?;
        let work = self.node().header_template(&self.config().payout, &reference)?;
        Ok(work)
    }

    /// Mine until interrupted or `max_rounds` rounds have run.
    pub fn run(&self) -> Result<SessionStats, MinerError> {
        let mut stats = SessionStats::default();
        self.wait_for_network();

        while !self.interrupted() {
            if self.config().max_rounds.is_some_and(|max| stats.rounds >= max) {
                break;
            }
            if !self.node().has_peers() {
                self.wait_for_network();
                continue;
            }

            let work = match self.next_template() {
                Ok(work) => work,
                Err(err) => {
                    warn!("{err}, retrying in {} ms", self.config().template_retry_ms);
                    stats.template_errors += 1;
                    thread::sleep(self.config().template_retry());
                    continue;
                }
            };

            let report = self.coordinator.run_round(&work)?;
            stats.record(&report);
            if report.outcome == RoundOutcome::Interrupted {
                break;
            }
        }

        info!(
            "session finished: {} rounds, {} accepted, {} hashes ({})",
            stats.rounds, stats.accepted, stats.total_hashes, stats.hash_rate
        );
        Ok(stats)
    }
}
