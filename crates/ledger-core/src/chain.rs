use crate::{Block, LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// An ordered, never-empty sequence of blocks from genesis to tip.
///
/// A `Chain` says nothing about validity on its own; see
/// [`Ledger::validate_chain`](crate::Ledger::validate_chain).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Block>", into = "Vec<Block>")]
pub struct Chain(Vec<Block>);

impl Chain {
    pub fn new(blocks: Vec<Block>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(LedgerError::MalformedInput(
                "a chain needs at least a genesis block".into(),
            ));
        }
        Ok(Self(blocks))
    }

    pub fn genesis() -> Self {
        Self(vec![Block::genesis()])
    }

    pub fn blocks(&self) -> &[Block] {
        &self.0
    }

    pub fn tip(&self) -> &Block {
        &self.0[self.0.len() - 1]
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.0
    }

    pub(crate) fn push(&mut self, block: Block) {
        self.0.push(block);
    }
}

impl Deref for Chain {
    type Target = [Block];

    fn deref(&self) -> &[Block] {
        &self.0
    }
}

impl TryFrom<Vec<Block>> for Chain {
    type Error = LedgerError;

    fn try_from(blocks: Vec<Block>) -> Result<Self> {
        Self::new(blocks)
    }
}

impl From<Chain> for Vec<Block> {
    fn from(chain: Chain) -> Self {
        chain.0
    }
}
