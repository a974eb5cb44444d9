//! Blocks: ordered batches of transaction ids chained to a predecessor.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{BlockId, TxId};

/// Domain separator for block id derivation.
const BLOCK_ID_DOMAIN: &[u8] = b"medchain/block-id/v1";

/// A block in the chain.
///
/// Blocks reference transactions by id only. The transactions themselves
/// live in their own namespace so the same content-addressed transaction
/// is never stored twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    /// Predecessor block, or the all-zero sentinel for genesis.
    pub pre_id: BlockId,
    pub tx_list: Vec<TxId>,
}

impl Block {
    /// The genesis block: sentinel predecessor, no transactions.
    pub fn genesis() -> Self {
        Self::new(BlockId::GENESIS_PRE_ID, Vec::new())
    }

    /// Build a block on top of `pre_id`.
    pub fn new(pre_id: BlockId, tx_list: Vec<TxId>) -> Self {
        let id = Self::compute_id(&pre_id, &tx_list);
        Self { id, pre_id, tx_list }
    }

    /// Blake3 over the predecessor id and each transaction id, in order.
    pub fn compute_id(pre_id: &BlockId, tx_list: &[TxId]) -> BlockId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(BLOCK_ID_DOMAIN);
        hasher.update(pre_id.as_bytes());
        hasher.update(&(tx_list.len() as u64).to_be_bytes());
        for tx_id in tx_list {
            hasher.update(tx_id.as_bytes());
        }
        BlockId(*hasher.finalize().as_bytes())
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_id.is_sentinel()
    }

    /// Check the stored id against the block's contents.
    pub fn verify_id(&self) -> Result<()> {
        let expected = Self::compute_id(&self.pre_id, &self.tx_list);
        if expected == self.id {
            Ok(())
        } else {
            Err(CoreError::BlockIdMismatch {
                expected: expected.to_hex(),
                actual: self.id.to_hex(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_shape() {
        let genesis = Block::genesis();
        assert!(genesis.is_genesis());
        assert!(genesis.tx_list.is_empty());
        assert_eq!(genesis.pre_id.to_hex(), "0".repeat(64));
        assert_eq!(genesis, Block::genesis());
    }

    #[test]
    fn test_id_depends_on_order_and_parent() {
        let a = TxId::from_bytes([1; 32]);
        let b = TxId::from_bytes([2; 32]);
        let parent = Block::genesis().id;

        let ab = Block::new(parent, vec![a, b]);
        let ba = Block::new(parent, vec![b, a]);
        assert_ne!(ab.id, ba.id);

        let other_parent = Block::new(BlockId::from_bytes([5; 32]), vec![a, b]);
        assert_ne!(ab.id, other_parent.id);
        assert!(!ab.is_genesis());
    }

    #[test]
    fn test_verify_id() {
        let mut block = Block::new(Block::genesis().id, vec![TxId::from_bytes([1; 32])]);
        block.verify_id().unwrap();

        block.tx_list.push(TxId::from_bytes([2; 32]));
        assert!(matches!(block.verify_id(), Err(CoreError::BlockIdMismatch { .. })));
    }
}
