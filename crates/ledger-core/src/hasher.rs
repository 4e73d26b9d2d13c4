//! Canonical block encoding and digest.
//!
//! The byte layout is fixed so that any implementation, in any language,
//! derives the same digest for the same logical block:
//!
//! ```text
//! index       u64 LE
//! prev_len    u64 LE, previous_hash UTF-8 bytes
//! timestamp   u64 LE
//! payload_len u64 LE, payload bytes
//! proof       u64 LE
//! ```
//!
//! The digest is SHA-256 rendered as 64 lowercase hex characters.

use crate::Hash;
use sha2::{Digest, Sha256};

pub fn canonical_bytes(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    payload: &[u8],
    proof: u64,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 * 5 + previous_hash.len() + payload.len());
    bytes.extend_from_slice(&index.to_le_bytes());
    bytes.extend_from_slice(&(previous_hash.len() as u64).to_le_bytes());
    bytes.extend_from_slice(previous_hash.as_bytes());
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&proof.to_le_bytes());
    bytes
}

pub fn digest(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    payload: &[u8],
    proof: u64,
) -> Hash {
    sha256_hex(&canonical_bytes(
        index,
        previous_hash,
        timestamp,
        payload,
        proof,
    ))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// True when `s` has the shape of a digest produced by [`digest`].
pub fn is_digest(s: &str) -> bool {
    s.len() == crate::constants::HASH_HEX_SIZE
        && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
