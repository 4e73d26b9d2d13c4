//! HTTP surface of a ledger node: mining, chain reads, peer registration and
//! consensus, all delegating to `ledger-core`.

pub mod api;
pub mod config;
mod constants;
pub mod fetcher;

use api::AppState;
use config::Args;
use fetcher::HttpChainFetcher;
use ledger_core::{Ledger, PeerRegistry};
use std::sync::Arc;

/// Build the shared node state from command-line arguments.
pub fn build_state(args: &Args) -> anyhow::Result<AppState> {
    let ledger = Arc::new(Ledger::new(args.ledger_config()));
    let peers = Arc::new(PeerRegistry::new());
    peers.add_all(&args.peers)?;
    let fetcher = Arc::new(HttpChainFetcher::new(args.fetch_timeout())?);
    Ok(AppState::new(ledger, peers, fetcher, args.mine_timeout()))
}
