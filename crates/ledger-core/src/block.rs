use crate::constants::{GENESIS_PAYLOAD, GENESIS_PREVIOUS_HASH, GENESIS_PROOF, GENESIS_TIMESTAMP};
use crate::{hasher, Hash};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One sealed record. Field order here is the wire order.
///
/// `hash` is computed once in [`Block::new`] and carried as-is afterwards;
/// blocks received from peers are checked with [`Block::has_valid_hash`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub index: u64,
    pub previous_hash: Hash,
    pub timestamp: u64,
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
    pub proof: u64,
    pub hash: Hash,
}

impl Block {
    pub fn new(
        index: u64,
        previous_hash: Hash,
        timestamp: u64,
        payload: Vec<u8>,
        proof: u64,
    ) -> Self {
        let hash = hasher::digest(index, &previous_hash, timestamp, &payload, proof);
        Self {
            index,
            previous_hash,
            timestamp,
            payload,
            proof,
            hash,
        }
    }

    /// The agreed-upon first block. Every node derives the same one.
    pub fn genesis() -> Self {
        Self::new(
            1,
            GENESIS_PREVIOUS_HASH.to_string(),
            GENESIS_TIMESTAMP,
            GENESIS_PAYLOAD.to_vec(),
            GENESIS_PROOF,
        )
    }

    /// Recompute the digest from content, ignoring the cached `hash`.
    pub fn compute_hash(&self) -> Hash {
        hasher::digest(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.payload,
            self.proof,
        )
    }

    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }
}

/// Wall-clock seconds since the unix epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
