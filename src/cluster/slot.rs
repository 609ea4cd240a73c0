//! Hash-slot calculation
//!
//! Keys map onto one of 16384 hash slots using CRC16 (XMODEM variant) of the key
//! modulo the slot count. If the key contains a hash tag (the first `{...}` section
//! with non-empty content), only the tag is hashed, so related keys land on the
//! same slot.
//!
//! # Example
//!
//! ```
//! use nodefan::cluster::slot::slot_for_key;
//!
//! assert_eq!(slot_for_key(b"foo"), 12182);
//! assert_eq!(
//!     slot_for_key(b"{user1000}.following"),
//!     slot_for_key(b"{user1000}.followers"),
//! );
//! ```

/// Number of hash slots in a cluster
pub const SLOT_COUNT: u16 = 16384;

/// CRC16 polynomial (XMODEM)
const CRC16_POLY: u16 = 0x1021;

/// Compute the hash slot for a key
pub fn slot_for_key(key: &[u8]) -> u16 {
    crc16(hash_tag(key)) % SLOT_COUNT
}

/// Return the part of the key that participates in hashing
fn hash_tag(key: &[u8]) -> &[u8] {
    let Some(open) = key.iter().position(|&b| b == b'{') else {
        return key;
    };

    match key[open + 1..].iter().position(|&b| b == b'}') {
        // Empty tag "{}" hashes the whole key
        Some(0) | None => key,
        Some(len) => &key[open + 1..open + 1 + len],
    }
}

/// CRC16/XMODEM checksum
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}
