//! Wire shapes shared by the node's `/chain` route and the peers that read it.
//!
//! Everything coming from a peer goes through a strict parse here before it
//! can become a [`Chain`]: unknown, missing or ill-typed fields are rejected
//! by serde, and the checks below reject structurally impossible chains.

use crate::constants::GENESIS_PREVIOUS_HASH;
use crate::consensus::RemoteChain;
use crate::hasher::is_digest;
use crate::{Block, Chain, LedgerError, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: u64,
}

impl From<&Chain> for ChainResponse {
    fn from(chain: &Chain) -> Self {
        Self {
            chain: chain.blocks().to_vec(),
            length: chain.len() as u64,
        }
    }
}

impl ChainResponse {
    pub fn parse(json: &[u8]) -> Result<Self> {
        serde_json::from_slice(json).map_err(|e| LedgerError::MalformedInput(e.to_string()))
    }

    pub fn into_remote_chain(self) -> Result<RemoteChain> {
        if self.length != self.chain.len() as u64 {
            return Err(LedgerError::MalformedInput(format!(
                "declared length {} but sent {} blocks",
                self.length,
                self.chain.len()
            )));
        }
        for (position, block) in self.chain.iter().enumerate() {
            check_block_shape(block, position as u64 + 1)?;
        }
        Ok(RemoteChain {
            length: self.length,
            chain: Chain::new(self.chain)?,
        })
    }
}

/// Structural checks for a block expected at `expected_index`.
pub fn check_block_shape(block: &Block, expected_index: u64) -> Result<()> {
    if block.index != expected_index {
        return Err(LedgerError::MalformedInput(format!(
            "block at position {expected_index} has index {}",
            block.index
        )));
    }
    if !is_digest(&block.hash) {
        return Err(LedgerError::MalformedInput(format!(
            "block {} hash is not a hex digest",
            block.index
        )));
    }
    let genesis_sentinel = block.index == 1 && block.previous_hash == GENESIS_PREVIOUS_HASH;
    if !genesis_sentinel && !is_digest(&block.previous_hash) {
        return Err(LedgerError::MalformedInput(format!(
            "block {} previous_hash is not a hex digest",
            block.index
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn genesis_response_round_trips() {
        let response = ChainResponse::from(&Chain::genesis());
        let bytes = serde_json::to_vec(&response).unwrap();
        let remote = ChainResponse::parse(&bytes)
            .unwrap()
            .into_remote_chain()
            .unwrap();
        assert_eq!(remote.length, 1);
        assert_eq!(remote.chain, Chain::genesis());
    }

    #[test]
    fn length_mismatch_is_malformed() {
        let mut response = ChainResponse::from(&Chain::genesis());
        response.length = 7;
        assert!(matches!(
            response.into_remote_chain(),
            Err(LedgerError::MalformedInput(_))
        ));
    }

    #[test]
    fn empty_chain_is_malformed() {
        let response = ChainResponse {
            chain: vec![],
            length: 0,
        };
        assert!(response.into_remote_chain().is_err());
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let body = json!({
            "chain": [Block::genesis()],
            "length": 1,
            "message": "hi",
        });
        assert!(ChainResponse::parse(body.to_string().as_bytes()).is_err());
    }

    #[test]
    fn misnumbered_block_is_rejected() {
        let mut genesis = Block::genesis();
        genesis.index = 0;
        let response = ChainResponse {
            chain: vec![genesis],
            length: 1,
        };
        assert!(response.into_remote_chain().is_err());
    }

    #[test]
    fn non_digest_hashes_are_rejected() {
        let block = Block::new(2, "1".into(), 0, vec![], 0);
        assert!(check_block_shape(&block, 2).is_err());

        let mut block = Block::genesis();
        block.hash = "not-a-hash".into();
        assert!(check_block_shape(&block, 1).is_err());

        assert!(check_block_shape(&Block::genesis(), 1).is_ok());
    }
}
