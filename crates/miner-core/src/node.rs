//! The node a miner works against.
//!
//! Template construction, chain tracking, peer networking and the beat
//! reference all live behind this trait. The miner only ever asks for a
//! header, watches the tip while hashing, and hands back a solved header.

use std::sync::Arc;

use crate::block::{BlockHeader, WorkTemplate};
use crate::difficulty::Target;
use crate::hash::BlockHash;

/// Failures reported by a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("no reference hash available yet")]
    NoReference,
    #[error("failed to create block template: {0}")]
    Template(String),
    #[error("failed to submit block: {0}")]
    Submit(String),
    #[error("node unavailable: {0}")]
    Unavailable(String),
}

pub trait Node: Send + Sync {
    /// Build a header paying `payout` that commits to `reference`.
    fn header_template(&self, payout: &str, reference: &BlockHash)
        -> Result<WorkTemplate, NodeError>;

    /// The latest beat reference hash new headers must commit to.
    fn reference_hash(&self) -> Result<BlockHash, NodeError>;

    /// Authoritative proof-of-work check.
    fn check_proof_of_work(&self, hash: &BlockHash, bits: u32) -> bool {
        Target::from_bits(bits).is_met_by(hash)
    }

    /// Hand a solved header to the node. `Ok(false)` means the node
    /// rejected it.
    fn submit_block(&self, header: &BlockHeader) -> Result<bool, NodeError>;

    /// Hash of the current chain tip, `None` while the node cannot tell.
    fn chain_tip_hash(&self) -> Option<BlockHash>;

    fn chain_height(&self) -> u64;

    fn has_peers(&self) -> bool;

    /// Network-adjusted Unix time.
    fn adjusted_time(&self) -> u32;
}

impl<T: Node + ?Sized> Node for &T {
    fn header_template(
        &self,
        payout: &str,
        reference: &BlockHash,
    ) -> Result<WorkTemplate, NodeError> {
        (**self).header_template(payout, reference)
    }

    fn reference_hash(&self) -> Result<BlockHash, NodeError> {
        (**self).reference_hash()
    }

    fn check_proof_of_work(&self, hash: &BlockHash, bits: u32) -> bool {
        (**self).check_proof_of_work(hash, bits)
    }

    fn submit_block(&self, header: &BlockHeader) -> Result<bool, NodeError> {
        (**self).submit_block(header)
    }

    fn chain_tip_hash(&self) -> Option<BlockHash> {
        (**self).chain_tip_hash()
    }

    fn chain_height(&self) -> u64 {
        (**self).chain_height()
    }

    fn has_peers(&self) -> bool {
        (**self).has_peers()
    }

    fn adjusted_time(&self) -> u32 {
        (**self).adjusted_time()
    }
}

impl<T: Node + ?Sized> Node for Arc<T> {
    fn header_template(
        &self,
        payout: &str,
        reference: &BlockHash,
    ) -> Result<WorkTemplate, NodeError> {
        (**self).header_template(payout, reference)
    }

    fn reference_hash(&self) -> Result<BlockHash, NodeError> {
        (**self).reference_hash()
    }

    fn check_proof_of_work(&self, hash: &BlockHash, bits: u32) -> bool {
        (**self).check_proof_of_work(hash, bits)
    }

    fn submit_block(&self, header: &BlockHeader) -> Result<bool, NodeError> {
        (**self).submit_block(header)
    }

    fn chain_tip_hash(&self) -> Option<BlockHash> {
        (**self).chain_tip_hash()
    }

    fn chain_height(&self) -> u64 {
        (**self).chain_height()
    }

    fn has_peers(&self) -> bool {
        (**self).has_peers()
    }

    fn adjusted_time(&self) -> u32 {
        (**self).adjusted_time()
    }
}
