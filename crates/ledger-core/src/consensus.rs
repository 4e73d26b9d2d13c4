use crate::{Chain, Ledger, LedgerError, PeerRegistry, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A peer's chain together with the length it declared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteChain {
    pub length: u64,
    pub chain: Chain,
}

/// Outbound port used by the resolver to read a peer's full chain.
///
/// Implementations bound their own latency (timeouts) and report transport
/// problems as [`LedgerError::PeerUnreachable`].
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<RemoteChain>;
}

#[async_trait]
impl<T: ChainFetcher + ?Sized> ChainFetcher for Arc<T> {
    async fn fetch_chain(&self, peer: &str) -> Result<RemoteChain> {
        (**self).fetch_chain(peer).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveOutcome {
    Unchanged,
    Replaced { peer: String },
}

#[derive(Clone, Debug)]
pub struct Resolution {
    pub outcome: ResolveOutcome,
    /// The local chain after the pass.
    pub chain: Arc<Chain>,
    /// Per-peer problems seen during the pass. None of them stopped it.
    pub failures: Vec<LedgerError>,
}

impl Resolution {
    pub fn replaced(&self) -> bool {
        matches!(self.outcome, ResolveOutcome::Replaced { .. })
    }
}

/// Longest valid chain wins. Ties keep the local chain.
pub struct ConsensusResolver<F> {
    fetcher: F,
}

impl<F: ChainFetcher> ConsensusResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn resolve(&self, ledger: &Ledger, peers: &PeerRegistry) -> Resolution {
        let mut best_length = ledger.len() as u64;
        let mut best: Option<(String, Chain)> = None;
        let mut failures = Vec::new();

        for peer in peers.list() {
            let remote = match self.fetcher.fetch_chain(&peer).await {
                Ok(remote) => remote,
                Err(e) => {
                    warn!(%peer, error = %e, "could not fetch chain");
                    failures.push(e);
                    continue;
                }
            };
            if remote.length != remote.chain.len() as u64 {
                let e = LedgerError::MalformedInput(format!(
                    "{peer} declared length {} but sent {} blocks",
                    remote.length,
                    remote.chain.len()
                ));
                warn!(%peer, error = %e, "rejected chain");
                failures.push(e);
                continue;
            }
            if remote.length <= best_length {
                debug!(%peer, length = remote.length, best_length, "chain not longer");
                continue;
            }
            if let Err(e) = ledger.validate_chain(&remote.chain) {
                warn!(%peer, length = remote.length, error = %e, "rejected invalid chain");
                failures.push(e);
                continue;
            }
            best_length = remote.length;
            best = Some((peer, remote.chain));
        }

        if let Some((peer, chain)) = best {
            let length = chain.len();
            if ledger.replace_if(chain, |current| length > current.len()) {
                info!(%peer, length, "adopted longer chain");
                return Resolution {
                    outcome: ResolveOutcome::Replaced { peer },
                    chain: ledger.snapshot(),
                    failures,
                };
            }
            info!(%peer, length, "local chain grew past candidate, keeping it");
        }

        Resolution {
            outcome: ResolveOutcome::Unchanged,
            chain: ledger.snapshot(),
            failures,
        }
    }
}
