//! Difficulty targets and compact "bits" conversion.

use core::fmt;
use crate::hash::BlockHash;

/// A 256-bit proof-of-work threshold, stored as big-endian bytes.
///
/// A hash meets the target when, read as a big-endian integer, it is not
/// greater than the target.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(pub [u8; 32]);

impl Target {
    pub const ZERO: Target = Target([0u8; 32]);
    pub const MAX: Target = Target([0xFF; 32]);

    /// Expand compact bits into a target. Negative or overflowing encodings
    /// give [`Target::ZERO`], which no hash can meet.
    pub fn from_bits(bits: u32) -> Self {
        Target(bits_to_target(bits))
    }

    /// The most significant 32 bits of the target.
    #[inline]
    pub fn top_word(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    #[inline]
    pub fn is_met_by(&self, hash: &BlockHash) -> bool {
        hash_meets_target(&hash.to_be_bytes(), &self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", self.to_hex())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)]
/// Target = mantissa * 256^(exponent - 3)
///
/// The result is a 32-byte big-endian representation of the target.
pub fn bits_to_target(bits: u32) -> [u8; 32] {
    let exponent = ((bits >> 24) & 0xFF) as usize;
    let mantissa = bits & 0x007FFFFF;

    let mut target = [0u8; 32];

    // Negative flag (bit 23 of the mantissa) is never a valid target
    if bits & 0x00800000 != 0 || exponent == 0 {
        return target;
    }

    if exponent <= 3 {
        // Mantissa fits in fewer bytes than specified
        let value = mantissa >> (8 * (3 - exponent));
        target[29] = (value >> 16) as u8;
        target[30] = (value >> 8) as u8;
        target[31] = value as u8;
        return target;
    }

    // Mantissa byte i lands at 32 - exponent + i; bytes pushed past the
    // most significant end mean the encoding overflows 256 bits.
    for i in 0..3 {
        let byte = (mantissa >> (16 - 8 * i)) as u8;
        let pos = 32 + i;
        if pos < exponent {
            if byte != 0 {
                return [0u8; 32];
            }
            continue;
        }
        let pos = pos - exponent;
        if pos < 32 {
            target[pos] = byte;
        }
    }

    target
}

/// Check if a hash meets the difficulty target.
///
/// Returns true if hash <= target. Both are 32-byte big-endian numbers.
#[inline]
pub fn hash_meets_target(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    for i in 0..32 {
        if hash[i] < target[i] {
            return true;
        }
        if hash[i] > target[i] {
            return false;
        }
    }
    true
}

/// Calculate approximate difficulty from bits.
///
/// Difficulty = max_target / current_target, where max_target is the
/// "difficulty 1" target (bits = 0x1d00ffff).
pub fn bits_to_difficulty(bits: u32) -> f64 {
    const DIFFICULTY_ONE_BITS: u32 = 0x1d00ffff;

    let current = target_to_f64(&bits_to_target(bits));
    let one = target_to_f64(&bits_to_target(DIFFICULTY_ONE_BITS));

    if current == 0.0 {
        return f64::INFINITY;
    }

    one / current
}

/// Convert a 256-bit target to an approximate f64 value.
fn target_to_f64(target: &[u8; 32]) -> f64 {
    let first_nonzero = match target.iter().position(|&b| b != 0) {
        Some(i) => i,
        None => return 0.0,
    };

    // Take 8 bytes for precision, padding past the end with zeros
    let mut value: u64 = 0;
    for i in 0..8 {
        let byte = target.get(first_nonzero + i).copied().unwrap_or(0);
        value = (value << 8) | byte as u64;
    }

    let exponent = ((31 - first_nonzero) * 8) as i32 - 56;
    value as f64 * 2f64.powi(exponent)
}

/// Format difficulty for display (e.g., "1.23T" for trillion).
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty >= 1e15 {
        format!("{:.2}P", difficulty / 1e15)
    } else if difficulty >= 1e12 {
        format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        format!("{:.2}K", difficulty / 1e3)
    } else {
        format!("{:.2}", difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_to_target_difficulty_one() {
        let target = bits_to_target(0x1d00ffff);

        // Expected target starts with 00000000ffff...
        assert_eq!(&target[0..4], &[0, 0, 0, 0]);
        assert_eq!(target[4], 0xff);
        assert_eq!(target[5], 0xff);

        for (i, byte) in target.iter().enumerate().skip(6) {
            assert_eq!(*byte, 0x00, "byte {} should be 0", i);
        }
    }

    #[test]
    fn test_bits_to_target_high_difficulty() {
        let target = bits_to_target(0x17034219);

        // Exponent = 0x17 = 23, so target starts at byte 32-23 = 9
        for (i, byte) in target.iter().enumerate().take(9) {
            assert_eq!(*byte, 0x00, "byte {} should be 0", i);
        }

        assert_eq!(target[9], 0x03);
        assert_eq!(target[10], 0x42);
        assert_eq!(target[11], 0x19);
    }

    #[test]
    fn test_bits_to_target_regtest() {
        let target = Target::from_bits(0x207fffff);
        assert_eq!(&target.0[0..3], &[0x7f, 0xff, 0xff]);
        assert_eq!(target.top_word(), 0x7fffff00);
    }

    #[test]
    fn test_bits_to_target_small_exponent() {
        let target = bits_to_target(0x02123456);
        assert_eq!(&target[29..32], &[0x00, 0x12, 0x34]);
    }

    #[test]
    fn test_bits_to_target_overflow_and_negative() {
        assert_eq!(bits_to_target(0x23123456), [0u8; 32]);
        assert_eq!(bits_to_target(0x1d800000), [0u8; 32]);
        assert_eq!(bits_to_target(0x00ffffff), [0u8; 32]);

        // Exponent 33 still fits when the top mantissa byte is zero
        let target = bits_to_target(0x2100ffff);
        assert_eq!(&target[0..2], &[0xff, 0xff]);
    }

    #[test]
    fn test_hash_meets_target() {
        let target = bits_to_target(0x1d00ffff);

        let mut good_hash = [0u8; 32];
        good_hash[4] = 0x12;
        good_hash[5] = 0x34;
        assert!(hash_meets_target(&good_hash, &target));

        let mut bad_hash = [0u8; 32];
        bad_hash[3] = 0x01;
        assert!(!hash_meets_target(&bad_hash, &target));

        assert!(hash_meets_target(&target, &target));
    }

    #[test]
    fn test_target_is_met_by_block_hash() {
        let target = Target::from_bits(0x1d00ffff);

        // Internal byte order: the number's most significant bytes are last
        let mut raw = [0xFFu8; 32];
        raw[28..32].copy_from_slice(&[0, 0, 0, 0]);
        raw[27] = 0x00;
        assert!(target.is_met_by(&BlockHash(raw)));

        raw[31] = 0x01;
        assert!(!target.is_met_by(&BlockHash(raw)));
    }

    #[test]
    fn test_difficulty_calculation() {
        let diff = bits_to_difficulty(0x1d00ffff);
        assert!((diff - 1.0).abs() < 0.01);

        let harder = bits_to_difficulty(0x1c00ffff);
        assert!((harder - 256.0).abs() < 0.5);

        assert_eq!(bits_to_difficulty(0), f64::INFINITY);
    }

    #[test]
    fn test_format_difficulty() {
        assert_eq!(format_difficulty(1.0), "1.00");
        assert_eq!(format_difficulty(2_500.0), "2.50K");
        assert_eq!(format_difficulty(1.23e12), "1.23T");
    }
}
