//! An in-process node.
//!
//! Keeps a single chain tip and accepts any header that builds on it and
//! meets its own bits. Good enough to drive the miner end to end without a
//! network: the binary mines against it and the tests use it to script tip
//! changes and peer loss.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::block::{BlockHeader, WorkTemplate};
use crate::hash::{double_sha256, BlockHash};
use crate::node::{Node, NodeError};

/// Header version stamped on every template.
pub const TEMPLATE_VERSION: i32 = 0x2000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    System,
    Fixed(u32),
}

#[derive(Debug)]
struct Chain {
    tip: BlockHash,
    height: u64,
    bits: u32,
    accepted: Vec<BlockHash>,
}

#[derive(Debug)]
pub struct LocalNode {
    chain: Mutex<Chain>,
    peers: AtomicBool,
    templates: AtomicU64,
    clock: Clock,
}

impl LocalNode {
    /// A node at height 0 with an all-zero tip, connected to peers.
    pub fn new(bits: u32) -> Self {
        Self::with_tip(BlockHash::ZERO, 0, bits)
    }

    pub fn with_tip(tip: BlockHash, height: u64, bits: u32) -> Self {
        LocalNode {
            chain: Mutex::new(Chain {
                tip,
                height,
                bits,
                accepted: Vec::new(),
            }),
            peers: AtomicBool::new(true),
            templates: AtomicU64::new(0),
            clock: Clock::System,
        }
    }

    /// Report `time` from [`Node::adjusted_time`] forever.
    pub fn with_fixed_time(mut self, time: u32) -> Self {
        self.clock = Clock::Fixed(time);
        self
    }

    pub fn set_peers(&self, connected: bool) {
        self.peers.store(connected, Ordering::SeqCst);
    }

    pub fn set_bits(&self, bits: u32) {
        self.chain().bits = bits;
    }

    pub fn tip(&self) -> BlockHash {
        self.chain().tip
    }

    /// Blocks this node accepted through [`Node::submit_block`].
    pub fn accepted(&self) -> Vec<BlockHash> {
        self.chain().accepted.clone()
    }

    /// Extend the chain with a block mined elsewhere. Returns the new tip.
    pub fn advance_tip(&self) -> BlockHash {
        let mut chain = self.chain();
        let mut data = chain.tip.0.to_vec();
        data.extend_from_slice(&chain.height.to_le_bytes());
        chain.tip = BlockHash::of(&data);
        chain.height += 1;
        log::debug!("external block {} at height {}", chain.tip, chain.height);
        chain.tip
    }

    fn chain(&self) -> MutexGuard<'_, Chain> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Node for LocalNode {
    fn header_template(
        &self,
        payout: &str,
        reference: &BlockHash,
    ) -> Result<WorkTemplate, NodeError> {
        let (tip, height, bits) = {
            let chain = self.chain();
            (chain.tip, chain.height, chain.bits)
        };

        // Each template gets a fresh merkle root, standing in for a new
        // coinbase extra nonce.
        let extra_nonce = self.templates.fetch_add(1, Ordering::Relaxed);
        let mut coinbase = payout.as_bytes().to_vec();
        coinbase.extend_from_slice(&(height + 1).to_le_bytes());
        coinbase.extend_from_slice(&extra_nonce.to_le_bytes());

        let header = BlockHeader {
            version: TEMPLATE_VERSION,
            prev_block_hash: tip.0,
            merkle_root: double_sha256(&coinbase),
            reference_hash: reference.0,
            time: self.adjusted_time(),
            bits,
            nonce: 0,
        };
        Ok(WorkTemplate::from_header(&header))
    }

    fn reference_hash(&self) -> Result<BlockHash, NodeError> {
        let tip = self.tip();
        let mut data = b"beat".to_vec();
        data.extend_from_slice(&tip.0);
        Ok(BlockHash::of(&data))
    }

    fn submit_block(&self, header: &BlockHeader) -> Result<bool, NodeError> {
        let mut chain = self.chain();
        let hash = header.hash();

        if header.prev_block_hash != chain.tip.0 {
            log::debug!("rejecting {hash}: does not build on tip {}", chain.tip);
            return Ok(false);
        }
        if header.bits != chain.bits || !self.check_proof_of_work(&hash, header.bits) {
            log::debug!("rejecting {hash}: insufficient proof of work");
            return Ok(false);
        }

        chain.tip = hash;
        chain.height += 1;
        chain.accepted.push(hash);
        Ok(true)
    }

    fn chain_tip_hash(&self) -> Option<BlockHash> {
        Some(self.tip())
    }

    fn chain_height(&self) -> u64 {
        self.chain().height
    }

    fn has_peers(&self) -> bool {
        self.peers.load(Ordering::SeqCst)
    }

    fn adjusted_time(&self) -> u32 {
        match self.clock {
            Clock::Fixed(time) => time,
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_secs() as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASY_BITS: u32 = 0x207fffff;

    fn solve(work: &WorkTemplate) -> BlockHeader {
        let mut header = work.header.clone();
        let nonce = (0..u32::MAX)
            .find(|&nonce| {
                header.set_nonce(nonce);
                work.target.is_met_by(&header.block_hash())
            })
            .unwrap();
        header.set_nonce(nonce);
        header.to_header()
    }

    #[test]
    fn test_template_builds_on_tip() {
        let node = LocalNode::new(EASY_BITS).with_fixed_time(1_700_000_000);
        let reference = node.reference_hash().unwrap();
        let work = node.header_template("payout", &reference).unwrap();
        let header = work.header.to_header();

        assert_eq!(header.prev_block_hash, node.tip().0);
        assert_eq!(header.reference_hash, reference.0);
        assert_eq!(header.time, 1_700_000_000);
        assert_eq!(header.bits, EASY_BITS);
        assert_eq!(header.version, TEMPLATE_VERSION);
    }

    #[test]
    fn test_templates_vary_merkle_root() {
        let node = LocalNode::new(EASY_BITS);
        let reference = node.reference_hash().unwrap();
        let a = node.header_template("payout", &reference).unwrap().header.to_header();
        let b = node.header_template("payout", &reference).unwrap().header.to_header();
        assert_ne!(a.merkle_root, b.merkle_root);
    }

    #[test]
    fn test_submit_accepts_and_advances() {
        let node = LocalNode::new(EASY_BITS);
        let reference = node.reference_hash().unwrap();
        let work = node.header_template("payout", &reference).unwrap();
        let solved = solve(&work);

        assert!(node.submit_block(&solved).unwrap());
        assert_eq!(node.chain_height(), 1);
        assert_eq!(node.tip(), solved.hash());
        assert_eq!(node.accepted(), vec![solved.hash()]);

        // Same block again no longer builds on the tip
        assert!(!node.submit_block(&solved).unwrap());
        assert_ne!(node.reference_hash().unwrap(), reference);
    }

    #[test]
    fn test_submit_rejects_insufficient_work() {
        let node = LocalNode::new(0x1d00ffff);
        let reference = node.reference_hash().unwrap();
        let header = node.header_template("payout", &reference).unwrap().header.to_header();

        assert!(!node.submit_block(&header).unwrap());
        assert_eq!(node.chain_height(), 0);
    }

    #[test]
    fn test_advance_tip_and_peers() {
        let node = LocalNode::new(EASY_BITS);
        let before = node.tip();
        let after = node.advance_tip();

        assert_ne!(before, after);
        assert_eq!(node.chain_tip_hash(), Some(after));
        assert_eq!(node.chain_height(), 1);

        assert!(node.has_peers());
        node.set_peers(false);
        assert!(!node.has_peers());
    }
}
