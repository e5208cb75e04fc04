//! Lane-parallel SHA-256 compression.
//!
//! Every word is a `[u32; N]`, one element per lane. Each step loops over the
//! lanes with no cross-lane dependency, so with `N` up to 4 the loops lower to
//! 128-bit vector instructions (SSE2 / NEON).

/// SHA-256 initial hash values.
pub(crate) const IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// SHA-256 round constants.
const K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

/// Eight state words, each holding one value per lane.
pub(crate) type State<const N: usize> = [[u32; N]; 8];

/// A full 64-entry message schedule, one value per lane.
pub(crate) type Schedule<const N: usize> = [[u32; N]; 64];

#[inline(always)]
fn big_sigma0(x: u32) -> u32 {
    x.rotate_right(2) ^ x.rotate_right(13) ^ x.rotate_right(22)
}

#[inline(always)]
fn big_sigma1(x: u32) -> u32 {
    x.rotate_right(6) ^ x.rotate_right(11) ^ x.rotate_right(25)
}

#[inline(always)]
fn small_sigma0(x: u32) -> u32 {
    x.rotate_right(7) ^ x.rotate_right(18) ^ (x >> 3)
}

#[inline(always)]
fn small_sigma1(x: u32) -> u32 {
    x.rotate_right(17) ^ x.rotate_right(19) ^ (x >> 10)
}

#[inline(always)]
fn ch(e: u32, f: u32, g: u32) -> u32 {
    g ^ (e & (f ^ g))
}

#[inline(always)]
fn maj(a: u32, b: u32, c: u32) -> u32 {
    (a & b) | (c & (a | b))
}

/// Copy the same eight words into every lane.
#[inline(always)]
pub(crate) fn broadcast<const N: usize>(words: &[u32; 8]) -> State<N> {
    words.map(|w| [w; N])
}

/// Fill schedule entries 16..64 from entries 0..16.
#[inline(always)]
pub(crate) fn expand<const N: usize>(w: &mut Schedule<N>) {
    for t in 16..64 {
        for l in 0..N {
            w[t][l] = small_sigma1(w[t - 2][l])
                .wrapping_add(w[t - 7][l])
                .wrapping_add(small_sigma0(w[t - 15][l]))
                .wrapping_add(w[t - 16][l]);
        }
    }
}

#[inline(always)]
fn round<const N: usize>(s: &mut State<N>, k: u32, w: &[u32; N]) {
    let mut t1 = [0u32; N];
    let mut t2 = [0u32; N];
    for l in 0..N {
        let (a, b, c) = (s[0][l], s[1][l], s[2][l]);
        let (e, f, g, h) = (s[4][l], s[5][l], s[6][l], s[7][l]);
        t1[l] = h
            .wrapping_add(big_sigma1(e))
            .wrapping_add(ch(e, f, g))
            .wrapping_add(k)
            .wrapping_add(w[l]);
        t2[l] = big_sigma0(a).wrapping_add(maj(a, b, c));
    }

    // h <- g <- f <- e <- d <- c <- b <- a
    s.copy_within(0..7, 1);
    for l in 0..N {
        s[4][l] = s[4][l].wrapping_add(t1[l]);
        s[0][l] = t1[l].wrapping_add(t2[l]);
    }
}

/// Run rounds `first..first + w.len()`, where `w[i]` is the schedule word for
/// round `first + i`.
#[inline(always)]
pub(crate) fn run_rounds<const N: usize>(s: &mut State<N>, w: &[[u32; N]], first: usize) {
    for (i, wt) in w.iter().enumerate() {
        round(s, K[first + i], wt);
    }
}

/// Add the chaining value into the compressed state.
#[inline(always)]
pub(crate) fn feed_forward<const N: usize>(s: &mut State<N>, init: &State<N>) {
    for (word, init) in s.iter_mut().zip(init) {
        for l in 0..N {
            word[l] = word[l].wrapping_add(init[l]);
        }
    }
}

/// Full compression of one 16-word block per lane.
pub(crate) fn compress<const N: usize>(init: &State<N>, block: &[[u32; N]; 16]) -> State<N> {
    let mut w: Schedule<N> = [[0u32; N]; 64];
    w[..16].copy_from_slice(block);
    expand(&mut w);

    let mut s = *init;
    run_rounds(&mut s, &w, 0);
    feed_forward(&mut s, init);
    s
}

/// Total message bits as the final padding word carries them.
pub(crate) const fn bit_length(bytes: usize) -> u32 {
    (bytes * 8) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    fn words_be(bytes: &[u8]) -> [u32; 16] {
        let mut words = [0u32; 16];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words
    }

    #[test]
    fn test_compress_matches_sha2_on_abc() {
        // "abc" in a single padded block
        let mut block = [0u8; 64];
        block[..3].copy_from_slice(b"abc");
        block[3] = 0x80;
        block[63] = 24;

        let words = words_be(&block).map(|w| [w]);
        let state = compress::<1>(&broadcast(&IV), &words);

        let mut bytes = [0u8; 32];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(state.iter()) {
            chunk.copy_from_slice(&word[0].to_be_bytes());
        }
        assert_eq!(bytes.as_slice(), Sha256::digest(b"abc").as_slice());
    }

    #[test]
    fn test_lanes_are_independent() {
        let mut block = [[0u32; 3]; 16];
        for (t, word) in block.iter_mut().enumerate() {
            *word = [t as u32, (t as u32) << 8, 0xdead_0000 | t as u32];
        }
        let wide = compress::<3>(&broadcast(&IV), &block);

        for lane in 0..3 {
            let single = block.map(|w| [w[lane]]);
            let narrow = compress::<1>(&broadcast(&IV), &single);
            for i in 0..8 {
                assert_eq!(wide[i][lane], narrow[i][0], "lane {lane} word {i}");
            }
        }
    }

    #[test]
    fn test_bit_length() {
        assert_eq!(bit_length(112), 896);
        assert_eq!(bit_length(32), 256);
    }
}
