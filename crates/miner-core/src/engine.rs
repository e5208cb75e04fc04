//! Batched double-SHA256 over 1 to 4 nonce lanes sharing one midstate.
//!
//! Per lane the engine finishes the header's second block from the cached
//! midstate with the lane's nonce in place, then hashes the resulting 32-byte
//! digest once more from the standard initial state. Lane `i` of a batch
//! starting at `base` tries nonce `base + i` (wrapping at 2^32).
//!
//! Batching is purely a throughput choice: lane `i` of a width-`N` call is
//! bit-identical to a width-1 call with the same nonce.

use serde::{Deserialize, Serialize};

use crate::block::HeaderTemplate;
use crate::hash::BlockHash;
use crate::midstate::{Midstate, SecondBlock, NONCE_WORD};
use crate::sha256::{self, IV};

/// Widest batch the engine computes in one call.
pub const MAX_LANES: usize = 4;

/// Final SHA256d state words of one lane, in internal word order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Digest(pub [u32; 8]);

impl Digest {
    /// The digest as SHA-256 output bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.0.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    #[inline]
    pub fn block_hash(&self) -> BlockHash {
        BlockHash(self.to_bytes())
    }

    /// The most significant 32 bits of the hash read as a 256-bit number.
    ///
    /// The number is little-endian over the output bytes, so this is the
    /// last state word with its bytes swapped.
    #[inline]
    pub fn top_word(&self) -> u32 {
        self.0[7].swap_bytes()
    }
}

/// Number of lanes per engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum LaneWidth {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl LaneWidth {
    pub const MAX: LaneWidth = LaneWidth::Four;

    #[inline]
    pub fn count(self) -> usize {
        self as usize
    }

    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(LaneWidth::One),
            2 => Some(LaneWidth::Two),
            3 => Some(LaneWidth::Three),
            4 => Some(LaneWidth::Four),
            _ => None,
        }
    }

    /// Widest batch the host runs as a single vector operation: four 32-bit
    /// lanes wherever 128-bit SIMD is present, otherwise one.
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            if std::arch::is_x86_feature_detected!("sse2") {
                return LaneWidth::Four;
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                return LaneWidth::Four;
            }
        }
        LaneWidth::One
    }
}

impl TryFrom<usize> for LaneWidth {
    type Error = String;

    fn try_from(count: usize) -> Result<Self, Self::Error> {
        LaneWidth::from_count(count)
            .ok_or_else(|| format!("lane width must be between 1 and {MAX_LANES}, got {count}"))
    }
}

impl From<LaneWidth> for usize {
    fn from(width: LaneWidth) -> usize {
        width.count()
    }
}

/// Digests of one engine call.
#[derive(Debug, Clone, Copy)]
pub struct LaneBatch {
    base: u32,
    len: usize,
    digests: [Digest; MAX_LANES],
}

impl LaneBatch {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `(nonce, digest)` for every lane in order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Digest)> + '_ {
        let base = self.base;
        self.digests[..self.len]
            .iter()
            .enumerate()
            .map(move |(lane, digest)| (base.wrapping_add(lane as u32), digest))
    }
}

/// Per-worker hashing engine for one header.
#[derive(Debug, Clone)]
pub struct Engine {
    midstate: Midstate,
    block: SecondBlock,
}

impl Engine {
    /// Build the midstate and second-block cache for `header`.
    pub fn new(header: &HeaderTemplate) -> Self {
        let midstate = Midstate::from_header(header);
        let block = SecondBlock::from_header(header, &midstate);
        Engine { midstate, block }
    }

    #[inline]
    pub fn midstate(&self) -> &Midstate {
        &self.midstate
    }

    /// Switch to a new header time without rebuilding the midstate.
    pub fn set_time(&mut self, time: u32) {
        self.block.set_time(time, &self.midstate);
    }

    /// Hash `N` consecutive nonces starting at `base`.
    #[inline]
    pub fn hash_lanes<const N: usize>(&self, base: u32) -> [Digest; N] {
        // First hash: finish the header's second block.
        let mut w: sha256::Schedule<N> = [[0u32; N]; 64];
        for (entry, word) in w.iter_mut().zip(self.block.words()) {
            *entry = [*word; N];
        }
        for (lane, word) in w[NONCE_WORD].iter_mut().enumerate() {
            *word = base.wrapping_add(lane as u32).swap_bytes();
        }
        sha256::expand(&mut w);

        let mut first = sha256::broadcast::<N>(self.block.prefix());
        sha256::run_rounds(&mut first, &w[NONCE_WORD..], NONCE_WORD);
        sha256::feed_forward(&mut first, &sha256::broadcast(&self.midstate.0));

        // Second hash: the 32-byte digest in a single padded block.
        let mut block = [[0u32; N]; 16];
        block[..8].copy_from_slice(&first);
        block[8] = [0x8000_0000; N];
        block[15] = [sha256::bit_length(32); N];
        let second = sha256::compress(&sha256::broadcast(&IV), &block);

        core::array::from_fn(|lane| Digest(core::array::from_fn(|i| second[i][lane])))
    }

    /// Hash a single nonce.
    #[inline]
    pub fn hash_one(&self, nonce: u32) -> Digest {
        let [digest] = self.hash_lanes::<1>(nonce);
        digest
    }

    /// Hash `width` consecutive nonces starting at `base`.
    pub fn hash_batch(&self, width: LaneWidth, base: u32) -> LaneBatch {
        let mut digests = [Digest::default(); MAX_LANES];
        match width {
            LaneWidth::One => digests[..1].copy_from_slice(&self.hash_lanes::<1>(base)),
            LaneWidth::Two => digests[..2].copy_from_slice(&self.hash_lanes::<2>(base)),
            LaneWidth::Three => digests[..3].copy_from_slice(&self.hash_lanes::<3>(base)),
            LaneWidth::Four => digests[..4].copy_from_slice(&self.hash_lanes::<4>(base)),
        }
        LaneBatch {
            base,
            len: width.count(),
            digests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockHeader, HEADER_LEN};
    use crate::hash::double_sha256;

    /// Deterministic pseudo-random header bytes.
    fn random_header(seed: u64) -> HeaderTemplate {
        let mut x = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
        let mut bytes = [0u8; HEADER_LEN];
        for byte in bytes.iter_mut() {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            *byte = x as u8;
        }
        HeaderTemplate::new(bytes)
    }

    fn reference(header: &HeaderTemplate, nonce: u32) -> [u8; 32] {
        let mut header = header.clone();
        header.set_nonce(nonce);
        double_sha256(header.as_bytes())
    }

    #[test]
    fn test_single_lane_matches_reference() {
        for seed in 0..8 {
            let header = random_header(seed);
            let engine = Engine::new(&header);
            for nonce in [0, 1, 0x7fff_ffff, 0xdead_beef, u32::MAX] {
                assert_eq!(
                    engine.hash_one(nonce).to_bytes(),
                    reference(&header, nonce),
                    "seed {seed} nonce {nonce:#x}"
                );
            }
        }
    }

    #[test]
    fn test_structured_header_matches_block_hash() {
        let header = BlockHeader {
            version: 0x20000000,
            prev_block_hash: [0x11; 32],
            merkle_root: [0x22; 32],
            reference_hash: [0x33; 32],
            time: 1_536_000_000,
            bits: 0x1d00ffff,
            nonce: 0,
        };
        let engine = Engine::new(&HeaderTemplate::from(&header));

        let mut solved = header.clone();
        solved.nonce = 12345;
        assert_eq!(engine.hash_one(12345).block_hash(), solved.hash());
    }

    #[test]
    fn test_batching_never_changes_results() {
        let header = random_header(42);
        let engine = Engine::new(&header);
        let base = 0x1234_5678;

        let two = engine.hash_lanes::<2>(base);
        let three = engine.hash_lanes::<3>(base);
        let four = engine.hash_lanes::<4>(base);

        for lane in 0..4 {
            let single = engine.hash_one(base + lane as u32);
            if lane < 2 {
                assert_eq!(two[lane], single);
            }
            if lane < 3 {
                assert_eq!(three[lane], single);
            }
            assert_eq!(four[lane], single);
        }
    }

    #[test]
    fn test_lane_nonces_wrap_around() {
        let header = random_header(7);
        let engine = Engine::new(&header);
        let base = u32::MAX - 1;

        let batch = engine.hash_batch(LaneWidth::Four, base);
        let nonces: Vec<u32> = batch.iter().map(|(nonce, _)| nonce).collect();
        assert_eq!(nonces, vec![u32::MAX - 1, u32::MAX, 0, 1]);

        for (nonce, digest) in batch.iter() {
            assert_eq!(digest.to_bytes(), reference(&header, nonce));
        }
    }

    #[test]
    fn test_hash_batch_widths() {
        let engine = Engine::new(&random_header(3));
        for count in 1..=MAX_LANES {
            let width = LaneWidth::from_count(count).unwrap();
            let batch = engine.hash_batch(width, 100);
            assert_eq!(batch.len(), count);
            assert!(!batch.is_empty());
            let nonces: Vec<u32> = batch.iter().map(|(nonce, _)| nonce).collect();
            assert_eq!(nonces, (100..100 + count as u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_set_time_keeps_midstate_and_matches_reference() {
        let mut header = random_header(11);
        let mut engine = Engine::new(&header);
        let midstate = *engine.midstate();

        engine.set_time(0x6000_0000);
        header.set_time(0x6000_0000);

        assert_eq!(engine.midstate(), &midstate);
        for nonce in [5, 6, 7, 8] {
            assert_eq!(engine.hash_one(nonce).to_bytes(), reference(&header, nonce));
        }
        let four = engine.hash_lanes::<4>(5);
        assert_eq!(four[3].to_bytes(), reference(&header, 8));
    }

    #[test]
    fn test_top_word_is_most_significant() {
        let engine = Engine::new(&random_header(5));
        let digest = engine.hash_one(99);
        let be = digest.block_hash().to_be_bytes();
        assert_eq!(digest.top_word(), u32::from_be_bytes([be[0], be[1], be[2], be[3]]));
    }

    #[test]
    fn test_lane_width_conversions() {
        assert_eq!(LaneWidth::from_count(0), None);
        assert_eq!(LaneWidth::from_count(5), None);
        assert_eq!(LaneWidth::try_from(3usize), Ok(LaneWidth::Three));
        assert_eq!(usize::from(LaneWidth::Two), 2);
        assert_eq!(LaneWidth::MAX.count(), MAX_LANES);

        let detected = LaneWidth::detect();
        assert!(detected == LaneWidth::One || detected == LaneWidth::Four);
    }
}
