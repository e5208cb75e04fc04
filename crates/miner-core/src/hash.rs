//! Reference SHA256d and the block hash type.

use core::fmt;
use sha2::{Digest, Sha256};

/// Double SHA256: SHA256(SHA256(data)).
///
/// This is the slow, obviously-correct path. The mining engine must agree
/// with it bit for bit.
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Reverse the byte order of a 32-byte array.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// A block hash in internal byte order (the raw SHA-256 output bytes).
///
/// Read as a 256-bit number the hash is little-endian, so the display form
/// and [`BlockHash::to_be_bytes`] are the reversed bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub const ZERO: BlockHash = BlockHash([0u8; 32]);

    /// Hash a serialized header with the reference implementation.
    pub fn of(data: &[u8]) -> Self {
        BlockHash(double_sha256(data))
    }

    /// The hash as a big-endian 256-bit integer, ready for target comparison.
    #[inline]
    pub fn to_be_bytes(&self) -> [u8; 32] {
        reverse_bytes(&self.0)
    }

    /// Parse a hash from display (reversed) hex.
    pub fn from_display_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(BlockHash(reverse_bytes(&bytes)))
    }

    pub fn to_display_hex(&self) -> String {
        hex::encode(self.to_be_bytes())
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_display_hex())
    }
}

impl serde::Serialize for BlockHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_display_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sha256() {
        // Test vector: SHA256d("hello")
        let hash = double_sha256(b"hello");

        let expected = hex::decode(
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        ).unwrap();

        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_reverse_bytes() {
        let mut original = [0u8; 32];
        for (i, byte) in original.iter_mut().enumerate() {
            *byte = i as u8 + 1;
        }
        let reversed = reverse_bytes(&original);

        assert_eq!(reversed[0], 0x20);
        assert_eq!(reversed[31], 0x01);
    }

    #[test]
    fn test_display_hex_roundtrip() {
        let mut raw = [0u8; 32];
        raw[31] = 0xab;
        raw[0] = 0x01;
        let hash = BlockHash(raw);

        let display = hash.to_string();
        assert!(display.starts_with("ab"));
        assert!(display.ends_with("01"));
        assert_eq!(BlockHash::from_display_hex(&display).unwrap(), hash);
    }

    #[test]
    fn test_be_bytes_most_significant_first() {
        let mut raw = [0u8; 32];
        raw[31] = 0x7f;
        assert_eq!(BlockHash(raw).to_be_bytes()[0], 0x7f);
    }
}
