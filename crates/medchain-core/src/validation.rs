//! Block validation: id recomputation, transaction membership, signatures.

use std::collections::HashSet;

use crate::block::Block;
use crate::error::{CoreError, Result};
use crate::transaction::Transaction;

/// Validate a block against the transactions it references.
///
/// This performs:
/// - Block id recomputation
/// - Genesis shape (no transactions)
/// - Duplicate tx id check
/// - One-to-one, in-order match between `tx_list` and `txs`
/// - Id and signature verification of every transaction
pub fn validate_block(block: &Block, txs: &[Transaction]) -> Result<()> {
    block.verify_id()?;

    if block.is_genesis() && !block.tx_list.is_empty() {
        return Err(CoreError::MalformedBlock(format!(
            "genesis block {} carries {} transactions",
            block.id,
            block.tx_list.len()
        )));
    }

    let mut seen = HashSet::with_capacity(block.tx_list.len());
    if let Some(dup) = block.tx_list.iter().find(|id| !seen.insert(**id)) {
        return Err(CoreError::MalformedBlock(format!(
            "transaction {} listed twice in block {}",
            dup, block.id
        )));
    }

    if txs.len() != block.tx_list.len() {
        return Err(CoreError::MalformedBlock(format!(
            "block {} lists {} transactions, got {}",
            block.id,
            block.tx_list.len(),
            txs.len()
        )));
    }

    for (listed, tx) in block.tx_list.iter().zip(txs) {
        if *listed != tx.id {
            return Err(CoreError::MalformedBlock(format!(
                "block {} lists {} but transaction {} was supplied",
                block.id, listed, tx.id
            )));
        }
        tx.verify()?;
    }

    Ok(())
}
