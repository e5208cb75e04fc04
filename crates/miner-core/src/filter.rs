//! Two-stage candidate check.
//!
//! Every digest goes through a cheap comparison of its most significant word
//! against the target's. Only digests that pass are normalized to a
//! [`BlockHash`] and handed to the node for the authoritative check.

use crate::difficulty::Target;
use crate::engine::Digest;
use crate::hash::BlockHash;
use crate::node::Node;

#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter {
    ceiling: u32,
    bits: u32,
}

impl CandidateFilter {
    pub fn new(target: &Target, bits: u32) -> Self {
        CandidateFilter {
            ceiling: target.top_word(),
            bits,
        }
    }

    /// A hash at or below the target cannot have a larger top word, so this
    /// never rejects a solution.
    #[inline(always)]
    pub fn precheck(&self, digest: &Digest) -> bool {
        digest.top_word() <= self.ceiling
    }

    /// Full check through the node. Returns the normalized hash on success.
    pub fn check<N: Node + ?Sized>(&self, node: &N, digest: &Digest) -> Option<BlockHash> {
        let hash = digest.block_hash();
        node.check_proof_of_work(&hash, self.bits).then_some(hash)
    }
}
