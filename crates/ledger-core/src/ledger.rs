use crate::block::now_secs;
use crate::constants::POW_TARGET_DIFFICULTY;
use crate::pow::{CancelToken, ProofOfWork};
use crate::{Block, Chain, LedgerError, Result};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Leading zero hex characters required by the proof-of-work puzzle.
    /// Must match across the network.
    pub difficulty: usize,
    /// Also check each block's cached hash against its content when
    /// validating a chain. Link and proof checks always run.
    pub verify_block_hashes: bool,
    /// Search proofs on the rayon pool instead of the calling thread.
    pub parallel_mining: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: POW_TARGET_DIFFICULTY,
            verify_block_hashes: true,
            parallel_mining: false,
        }
    }
}

/// The node's chain and the only way to change it.
///
/// The chain is published as an `Arc<Chain>` behind a single `RwLock`.
/// Writers swap or extend it under the write lock; readers clone the `Arc`
/// and never see a half-applied mutation. Proof-of-work runs outside the
/// lock. Every mutation cancels the current epoch token so searches started
/// on the old tip stop early.
#[derive(Debug)]
pub struct Ledger {
    chain: RwLock<Arc<Chain>>,
    epoch: Mutex<CancelToken>,
    pow: ProofOfWork,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            chain: RwLock::new(Arc::new(Chain::genesis())),
            epoch: Mutex::new(CancelToken::new()),
            pow: ProofOfWork::new(config.difficulty),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    // Poisoning is recovered: the chain is only ever replaced whole, so the
    // guarded value is consistent even if a holder panicked.
    fn read(&self) -> RwLockReadGuard<'_, Arc<Chain>> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<Chain>> {
        self.chain.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_epoch(&self) -> CancelToken {
        self.epoch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Must be called with the chain write lock held.
    fn advance_epoch(&self) {
        let mut epoch = self.epoch.lock().unwrap_or_else(PoisonError::into_inner);
        epoch.cancel();
        *epoch = CancelToken::new();
    }

    /// Immutable view of the current chain.
    pub fn snapshot(&self) -> Arc<Chain> {
        Arc::clone(&self.read())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn tip(&self) -> Block {
        self.read().tip().clone()
    }

    fn search(&self, previous_proof: u64, cancel: &CancelToken) -> Result<u64> {
        if self.config.parallel_mining {
            self.pow.solve_parallel(previous_proof, cancel)
        } else {
            self.pow.solve(previous_proof, cancel)
        }
    }

    /// Solve the puzzle on the current tip and append a new block carrying
    /// `payload`.
    ///
    /// Fails with [`LedgerError::StaleTip`] when the chain changed while the
    /// search ran; nothing is appended in that case. Fails with
    /// [`LedgerError::Cancelled`] when `cancel` fires first.
    pub fn mine(&self, payload: Vec<u8>, cancel: &CancelToken) -> Result<Block> {
        let (parent, epoch) = {
            let chain = self.read();
            (chain.tip().clone(), self.current_epoch())
        };
        debug!(parent = parent.index, "mining on tip");

        let token = cancel.linked(&epoch);
        let proof = match self.search(parent.proof, &token) {
            Ok(proof) => proof,
            Err(LedgerError::Cancelled) if epoch.is_cancelled() => {
                let actual = self.read().tip().hash.clone();
                warn!(expected = %parent.hash, %actual, "chain moved during search");
                return Err(LedgerError::StaleTip {
                    expected: parent.hash,
                    actual,
                });
            }
            Err(e) => return Err(e),
        };

        // Links use the recomputed digest, never the cached one.
        let block = Block::new(
            parent.index + 1,
            parent.compute_hash(),
            now_secs().max(parent.timestamp),
            payload,
            proof,
        );

        let mut chain = self.write();
        let tip = chain.tip();
        if tip.hash != parent.hash {
            let actual = tip.hash.clone();
            warn!(expected = %parent.hash, %actual, "discarding block mined on stale tip");
            return Err(LedgerError::StaleTip {
                expected: parent.hash,
                actual,
            });
        }
        Arc::make_mut(&mut chain).push(block.clone());
        self.advance_epoch();
        info!(index = block.index, proof, hash = %block.hash, "mined block");
        Ok(block)
    }

    /// Why `candidate` is not a valid chain, if it is not.
    ///
    /// The first block is trusted as genesis. Each following block must carry
    /// the next index, link to the recomputed digest of its predecessor, and
    /// hold a proof that verifies against the predecessor's proof. With
    /// `verify_block_hashes`, every cached hash must also match its content.
    pub fn validate_chain(&self, candidate: &Chain) -> Result<()> {
        let blocks = candidate.blocks();
        if self.config.verify_block_hashes && !blocks[0].has_valid_hash() {
            return Err(LedgerError::Validation(format!(
                "block {} carries a hash that does not match its content",
                blocks[0].index
            )));
        }
        for pair in blocks.windows(2) {
            let (previous, block) = (&pair[0], &pair[1]);
            if previous.index.checked_add(1) != Some(block.index) {
                return Err(LedgerError::Validation(format!(
                    "block {} follows block {}",
                    block.index, previous.index
                )));
            }
            if block.previous_hash != previous.compute_hash() {
                return Err(LedgerError::Validation(format!(
                    "block {} does not link to block {}",
                    block.index, previous.index
                )));
            }
            if !self.pow.verify(previous.proof, block.proof) {
                return Err(LedgerError::Validation(format!(
                    "block {} has an invalid proof {}",
                    block.index, block.proof
                )));
            }
            if self.config.verify_block_hashes && !block.has_valid_hash() {
                return Err(LedgerError::Validation(format!(
                    "block {} carries a hash that does not match its content",
                    block.index
                )));
            }
        }
        Ok(())
    }

    pub fn is_valid_chain(&self, candidate: &Chain) -> bool {
        match self.validate_chain(candidate) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "rejected chain");
                false
            }
        }
    }

    /// Swap in `candidate` unconditionally. The caller has validated it.
    pub fn replace(&self, candidate: Chain) {
        let mut chain = self.write();
        let old = chain.len();
        *chain = Arc::new(candidate);
        self.advance_epoch();
        info!(old_length = old, new_length = chain.len(), "chain replaced");
    }

    /// Swap in `candidate` only if `accept` approves the current chain, both
    /// decided under one write lock. Returns whether the swap happened.
    pub fn replace_if<F>(&self, candidate: Chain, accept: F) -> bool
    where
        F: FnOnce(&Chain) -> bool,
    {
        let mut chain = self.write();
        if !accept(&chain) {
            return false;
        }
        let old = chain.len();
        *chain = Arc::new(candidate);
        self.advance_epoch();
        info!(old_length = old, new_length = chain.len(), "chain replaced");
        true
    }

    /// Append a block announced by a peer if it extends the current tip.
    pub fn accept_block(&self, block: Block) -> Result<()> {
        let mut chain = self.write();
        let tip = chain.tip();
        if tip.index.checked_add(1) != Some(block.index) {
            return Err(LedgerError::Validation(format!(
                "block {} does not extend tip {}",
                block.index, tip.index
            )));
        }
        if block.previous_hash != tip.compute_hash() {
            return Err(LedgerError::Validation(format!(
                "block {} does not link to the current tip",
                block.index
            )));
        }
        if !self.pow.verify(tip.proof, block.proof) {
            return Err(LedgerError::Validation(format!(
                "block {} has an invalid proof {}",
                block.index, block.proof
            )));
        }
        if !block.has_valid_hash() {
            return Err(LedgerError::Validation(format!(
                "block {} carries a hash that does not match its content",
                block.index
            )));
        }
        info!(index = block.index, hash = %block.hash, "accepted peer block");
        Arc::make_mut(&mut chain).push(block);
        self.advance_epoch();
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
