//! Core of a minimal proof-of-work ledger: blocks, canonical hashing, the
//! proof-of-work puzzle, the shared ledger, and longest-valid-chain consensus.
//!
//! Transport lives elsewhere; this crate only sees peers through the
//! [`ChainFetcher`] port.

pub mod block;
pub mod chain;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod hasher;
pub mod ledger;
mod mine;
pub mod peers;
pub mod pow;
pub mod wire;

/// Lowercase hex SHA-256 digest, or the genesis sentinel.
pub type Hash = String;

pub use block::Block;
pub use chain::Chain;
pub use consensus::{ChainFetcher, ConsensusResolver, RemoteChain, Resolution, ResolveOutcome};
pub use error::{LedgerError, Result};
pub use ledger::{Ledger, LedgerConfig};
pub use peers::PeerRegistry;
pub use pow::{CancelToken, ProofOfWork};
