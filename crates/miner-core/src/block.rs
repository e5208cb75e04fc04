//! Block header layout, serialization, and the mutable header buffer.

use crate::difficulty::Target;
use crate::hash::BlockHash;

/// Serialized header length in bytes.
pub const HEADER_LEN: usize = 112;

pub const VERSION_OFFSET: usize = 0;
pub const PREV_HASH_OFFSET: usize = 4;
pub const MERKLE_ROOT_OFFSET: usize = 36;
pub const REFERENCE_HASH_OFFSET: usize = 68;
pub const TIME_OFFSET: usize = 100;
pub const BITS_OFFSET: usize = 104;
pub const NONCE_OFFSET: usize = 108;

/// Errors from parsing raw header bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("header must be {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// A block header (112 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version.
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions.
    pub merkle_root: [u8; 32],
    /// Auxiliary reference hash the block commits to.
    pub reference_hash: [u8; 32],
    /// Block timestamp (Unix time).
    pub time: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Serialize the block header to 112 bytes.
    pub fn serialize(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];

        header[VERSION_OFFSET..PREV_HASH_OFFSET].copy_from_slice(&self.version.to_le_bytes());
        header[PREV_HASH_OFFSET..MERKLE_ROOT_OFFSET].copy_from_slice(&self.prev_block_hash);
        header[MERKLE_ROOT_OFFSET..REFERENCE_HASH_OFFSET].copy_from_slice(&self.merkle_root);
        header[REFERENCE_HASH_OFFSET..TIME_OFFSET].copy_from_slice(&self.reference_hash);
        header[TIME_OFFSET..BITS_OFFSET].copy_from_slice(&self.time.to_le_bytes());
        header[BITS_OFFSET..NONCE_OFFSET].copy_from_slice(&self.bits.to_le_bytes());
        header[NONCE_OFFSET..HEADER_LEN].copy_from_slice(&self.nonce.to_le_bytes());

        header
    }

    /// Parse a header from exactly 112 bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, HeaderError> {
        let template = HeaderTemplate::try_from(bytes)?;
        Ok(template.to_header())
    }

    /// Compute the block hash (double SHA256).
    pub fn hash(&self) -> BlockHash {
        BlockHash::of(&self.serialize())
    }

    /// The target encoded in the bits field.
    pub fn target(&self) -> Target {
        Target::from_bits(self.bits)
    }
}

/// The raw header buffer a mining round works on.
///
/// Only the time and nonce fields are ever rewritten.
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    bytes: [u8; HEADER_LEN],
}

impl HeaderTemplate {
    pub fn new(bytes: [u8; HEADER_LEN]) -> Self {
        HeaderTemplate { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.bytes
    }

    /// The first 64-byte SHA-256 block, which the midstate covers.
    #[inline]
    pub fn first_block(&self) -> &[u8] {
        &self.bytes[..64]
    }

    /// The remaining 48 header bytes that land in the second block.
    #[inline]
    pub fn tail(&self) -> &[u8] {
        &self.bytes[64..]
    }

    pub fn prev_block_hash(&self) -> BlockHash {
        BlockHash(self.read_hash(PREV_HASH_OFFSET))
    }

    pub fn time(&self) -> u32 {
        self.read_u32(TIME_OFFSET)
    }

    pub fn set_time(&mut self, time: u32) {
        self.bytes[TIME_OFFSET..BITS_OFFSET].copy_from_slice(&time.to_le_bytes());
    }

    pub fn bits(&self) -> u32 {
        self.read_u32(BITS_OFFSET)
    }

    pub fn nonce(&self) -> u32 {
        self.read_u32(NONCE_OFFSET)
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.bytes[NONCE_OFFSET..HEADER_LEN].copy_from_slice(&nonce.to_le_bytes());
    }

    /// Hash the buffer as-is with the reference implementation.
    pub fn block_hash(&self) -> BlockHash {
        BlockHash::of(&self.bytes)
    }

    pub fn to_header(&self) -> BlockHeader {
        BlockHeader {
            version: i32::from_le_bytes(self.read_array(VERSION_OFFSET)),
            prev_block_hash: self.read_hash(PREV_HASH_OFFSET),
            merkle_root: self.read_hash(MERKLE_ROOT_OFFSET),
            reference_hash: self.read_hash(REFERENCE_HASH_OFFSET),
            time: self.time(),
            bits: self.bits(),
            nonce: self.nonce(),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.read_array(offset))
    }

    fn read_array(&self, offset: usize) -> [u8; 4] {
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.bytes[offset..offset + 4]);
        out
    }

    fn read_hash(&self, offset: usize) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.bytes[offset..offset + 32]);
        out
    }
}

impl From<&BlockHeader> for HeaderTemplate {
    fn from(header: &BlockHeader) -> Self {
        HeaderTemplate::new(header.serialize())
    }
}

impl TryFrom<&[u8]> for HeaderTemplate {
    type Error = HeaderError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; HEADER_LEN] = bytes.try_into().map_err(|_| HeaderError::InvalidLength {
            expected: HEADER_LEN,
            got: bytes.len(),
        })?;
        Ok(HeaderTemplate::new(bytes))
    }
}

impl core::fmt::Debug for HeaderTemplate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HeaderTemplate")
            .field("prev_block_hash", &self.prev_block_hash())
            .field("time", &self.time())
            .field("bits", &format_args!("{:08x}", self.bits()))
            .field("nonce", &self.nonce())
            .finish()
    }
}

impl serde::Serialize for HeaderTemplate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// A header ready for a mining round, together with the threshold the
/// collaborator will enforce for it.
#[derive(Debug, Clone)]
pub struct WorkTemplate {
    pub header: HeaderTemplate,
    pub target: Target,
}

impl WorkTemplate {
    /// Build a template whose target is decoded from the header's bits.
    pub fn from_header(header: &BlockHeader) -> Self {
        WorkTemplate {
            header: HeaderTemplate::from(header),
            target: header.target(),
        }
    }
}
