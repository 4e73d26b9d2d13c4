use async_trait::async_trait;
use ledger_core::{
    CancelToken, Chain, ChainFetcher, Ledger, LedgerConfig, LedgerError, RemoteChain, Result,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Low difficulty keeps debug-build tests fast.
pub const TEST_DIFFICULTY: usize = 2;

pub fn test_config() -> LedgerConfig {
    LedgerConfig {
        difficulty: TEST_DIFFICULTY,
        ..LedgerConfig::default()
    }
}

pub fn new_ledger() -> Ledger {
    Ledger::new(test_config())
}

/// A valid chain of `len` blocks, genesis included.
pub fn valid_chain(len: usize) -> Chain {
    let ledger = new_ledger();
    for i in 1..len {
        ledger
            .mine(format!("Block {} data", i + 1).into_bytes(), &CancelToken::new())
            .expect("mining at test difficulty");
    }
    ledger.snapshot().as_ref().clone()
}

pub fn ledger_with_len(len: usize) -> Ledger {
    let ledger = new_ledger();
    ledger.replace(valid_chain(len));
    ledger
}

/// Serves canned answers per peer and counts calls.
#[derive(Default)]
pub struct StubFetcher {
    answers: HashMap<String, Result<RemoteChain>>,
    pub calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn with_chain(mut self, peer: &str, chain: Chain) -> Self {
        self.answers.insert(
            peer.to_string(),
            Ok(RemoteChain {
                length: chain.len() as u64,
                chain,
            }),
        );
        self
    }

    pub fn unreachable(mut self, peer: &str) -> Self {
        self.answers.insert(
            peer.to_string(),
            Err(LedgerError::PeerUnreachable {
                peer: peer.to_string(),
                reason: "timed out".into(),
            }),
        );
        self
    }
}

#[async_trait]
impl ChainFetcher for StubFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<RemoteChain> {
        self.calls.lock().unwrap().push(peer.to_string());
        self.answers
            .get(peer)
            .cloned()
            .unwrap_or_else(|| {
                Err(LedgerError::PeerUnreachable {
                    peer: peer.to_string(),
                    reason: "unknown peer".into(),
                })
            })
    }
}
