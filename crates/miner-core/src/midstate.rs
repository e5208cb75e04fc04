//! Midstate and second-block caching for the 112-byte header.
//!
//! The header spans two SHA-256 blocks. The first (bytes 0..64: version,
//! previous hash, most of the merkle root) never changes during a round, so it
//! is compressed once into a [`Midstate`]. The second block holds the merkle
//! tail, reference hash, time, bits and nonce followed by fixed padding; it is
//! kept as big-endian message words in a [`SecondBlock`].
//!
//! Rounds 0..=10 of the second compression only read words 0..=10, which do
//! not include the nonce (word 11). Their result is cached as well and only
//! recomputed when the time word changes.

use sha2::digest::generic_array::GenericArray;

use crate::block::{HeaderTemplate, HEADER_LEN, NONCE_OFFSET, TIME_OFFSET};
use crate::sha256::{self, IV};

/// Message word holding the header time in the second block.
pub const TIME_WORD: usize = (TIME_OFFSET - 64) / 4;

/// Message word holding the header nonce in the second block.
pub const NONCE_WORD: usize = (NONCE_OFFSET - 64) / 4;

/// First message word after the header bytes.
const PADDING_WORD: usize = (HEADER_LEN - 64) / 4;

/// SHA-256 state after compressing the header's first 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Midstate(pub [u32; 8]);

impl Midstate {
    pub fn from_header(header: &HeaderTemplate) -> Self {
        let mut state = IV;
        let block = GenericArray::from_slice(header.first_block());
        sha2::compress256(&mut state, core::slice::from_ref(block));
        Midstate(state)
    }
}

/// The header's second block, laid out as message words ready for a nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondBlock {
    words: [u32; 16],
    prefix: [u32; 8],
}

impl SecondBlock {
    pub fn from_header(header: &HeaderTemplate, midstate: &Midstate) -> Self {
        let mut words = [0u32; 16];
        for (word, chunk) in words.iter_mut().zip(header.tail().chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words[PADDING_WORD] = 0x8000_0000;
        words[15] = sha256::bit_length(HEADER_LEN);

        let prefix = prefix_state(&words, midstate);
        SecondBlock { words, prefix }
    }

    /// Rewrite the time word. The midstate stays valid; only the cached
    /// prefix rounds are redone.
    pub fn set_time(&mut self, time: u32, midstate: &Midstate) {
        self.words[TIME_WORD] = time.swap_bytes();
        self.prefix = prefix_state(&self.words, midstate);
    }

    #[inline]
    pub fn words(&self) -> &[u32; 16] {
        &self.words
    }

    /// State after rounds `0..NONCE_WORD` of the second compression.
    #[inline]
    pub(crate) fn prefix(&self) -> &[u32; 8] {
        &self.prefix
    }
}

fn prefix_state(words: &[u32; 16], midstate: &Midstate) -> [u32; 8] {
    let mut state = sha256::broadcast::<1>(&midstate.0);
    let schedule = words.map(|w| [w]);
    sha256::run_rounds(&mut state, &schedule[..NONCE_WORD], 0);
    state.map(|[w]| w)
}
