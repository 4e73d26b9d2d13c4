use crate::constants::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LISTEN, DEFAULT_MINE_TIMEOUT_SECS};
use clap::Parser;
use ledger_core::{constants::POW_TARGET_DIFFICULTY, LedgerConfig};
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger node")]
pub struct Args {
    /// Address to listen on, e.g. 0.0.0.0:5000
    #[arg(short, long, default_value = DEFAULT_LISTEN)]
    pub listen: String,

    /// Leading zero hex characters required by proof-of-work. Must match every peer.
    #[arg(long, default_value_t = POW_TARGET_DIFFICULTY)]
    pub difficulty: usize,

    /// Peer to register at startup (repeatable), e.g. 10.0.0.220:5000
    #[arg(long = "peer")]
    pub peers: Vec<String>,

    /// Per-peer timeout when fetching chains during consensus
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Give up on a proof-of-work search after this long
    #[arg(long, default_value_t = DEFAULT_MINE_TIMEOUT_SECS)]
    pub mine_timeout_secs: u64,

    /// Search proofs on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Only check links and proofs when validating peer chains
    #[arg(long)]
    pub skip_hash_check: bool,
}

impl Args {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            verify_block_hashes: !self.skip_hash_check,
            parallel_mining: self.parallel,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn mine_timeout(&self) -> Duration {
        Duration::from_secs(self.mine_timeout_secs)
    }
}
