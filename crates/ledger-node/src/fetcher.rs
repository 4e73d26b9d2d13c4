use async_trait::async_trait;
use ledger_core::{wire::ChainResponse, ChainFetcher, LedgerError, RemoteChain};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Reads a peer's `/chain` over HTTP.
#[derive(Clone, Debug)]
pub struct HttpChainFetcher {
    http: Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

/// Registered peers may or may not carry a scheme; plain `host:port` means http.
pub fn chain_url(peer: &str) -> String {
    if peer.contains("://") {
        format!("{peer}/chain")
    } else {
        format!("http://{peer}/chain")
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> ledger_core::Result<RemoteChain> {
        let unreachable = |reason: String| LedgerError::PeerUnreachable {
            peer: peer.to_string(),
            reason,
        };
        let url = chain_url(peer);
        debug!(%url, "fetching chain");

        let body = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| unreachable(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        ChainResponse::parse(&body)
            .and_then(ChainResponse::into_remote_chain)
            .map_err(|e| match e {
                LedgerError::MalformedInput(why) => {
                    LedgerError::MalformedInput(format!("chain from {peer}: {why}"))
                }
                other => other,
            })
    }
}
