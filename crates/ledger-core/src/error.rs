use crate::Hash;
use thiserror::Error;

/// Every failure the core reports. All of them are recoverable: none leaves
/// the ledger in a partially mutated state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A chain or block failed validation and was not applied.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Fetching a peer's chain failed; other peers are unaffected.
    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    /// The tip moved while a block was being mined on top of it.
    #[error("stale tip: block was mined on {expected} but the tip is now {actual}, retry")]
    StaleTip { expected: Hash, actual: Hash },

    /// Caller or peer supplied data that fails structural parsing.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("proof-of-work search cancelled")]
    Cancelled,

    #[error("nonce space exhausted")]
    NonceSpaceExhausted,
}

pub type Result<T> = std::result::Result<T, LedgerError>;
