use crate::constants::{CANCEL_CHECK_INTERVAL, POW_TARGET_DIFFICULTY};
use crate::hasher::sha256_hex;
use crate::{LedgerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation for proof-of-work searches.
///
/// Clones share the same flag. A token made with [`CancelToken::linked`]
/// also reports cancelled once any of its sources is cancelled.
#[derive(Clone, Debug)]
pub struct CancelToken {
    own: Arc<AtomicBool>,
    sources: Vec<Arc<AtomicBool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            own: Arc::new(AtomicBool::new(false)),
            sources: Vec::new(),
        }
    }

    pub fn cancel(&self) {
        self.own.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.own.load(Ordering::Relaxed) || self.sources.iter().any(|s| s.load(Ordering::Relaxed))
    }

    /// A fresh token that is cancelled when `self`, `other`, or the new token is.
    pub fn linked(&self, other: &CancelToken) -> CancelToken {
        let mut sources = Vec::with_capacity(2 + self.sources.len() + other.sources.len());
        sources.push(self.own.clone());
        sources.extend(self.sources.iter().cloned());
        sources.push(other.own.clone());
        sources.extend(other.sources.iter().cloned());
        CancelToken {
            own: Arc::new(AtomicBool::new(false)),
            sources,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// The puzzle: find `proof` such that `sha256("{previous_proof}{proof}")`
/// starts with `difficulty` zero hex characters.
///
/// The decimal concatenation is what peers on the network hash, so it must
/// not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn attempt_hash(previous_proof: u64, proof: u64) -> String {
        sha256_hex(format!("{previous_proof}{proof}").as_bytes())
    }

    pub fn verify(&self, previous_proof: u64, proof: u64) -> bool {
        count_leading_zero_nibbles(&Self::attempt_hash(previous_proof, proof)) >= self.difficulty
    }

    /// Linear search from 0; returns the smallest valid proof.
    pub fn solve(&self, previous_proof: u64, cancel: &CancelToken) -> Result<u64> {
        for proof in 0..=u64::MAX {
            if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(LedgerError::Cancelled);
            }
            if self.verify(previous_proof, proof) {
                return Ok(proof);
            }
        }
        Err(LedgerError::NonceSpaceExhausted)
    }
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(POW_TARGET_DIFFICULTY)
    }
}

/// Number of leading `'0'` characters in a hex digest.
pub fn count_leading_zero_nibbles(hex_digest: &str) -> usize {
    hex_digest.bytes().take_while(|b| *b == b'0').count()
}
