//! Block/chain management: genesis, append, traversal, point lookup.
//!
//! The chain is a singly linked list of blocks from the tip back to
//! genesis. Every read walks that list newest-first, so for any lookup that
//! stops at the first match, the most recent write wins.

use std::collections::HashSet;

use medchain_core::{validate_block, Block, BlockId, Content, Transaction, TxId, TxType};
use medchain_store::{Store, StoreExt};
use tracing::{debug, info, trace, warn};

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;

/// A lookup hit: the content plus where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundContent {
    pub tx_id: TxId,
    pub block_id: BlockId,
    pub content: Content,
}

/// Summary of a full chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    pub tip: BlockId,
    /// Blocks visited, genesis included.
    pub blocks: u64,
    pub transactions: u64,
}

/// Streaming tip-to-genesis traversal.
///
/// Yields each block once, genesis last. A missing block or a block seen
/// twice ends the walk with [`LedgerError::BrokenChain`].
pub struct ChainWalker<'a, S: Store> {
    store: &'a S,
    next: Option<BlockId>,
    seen: HashSet<BlockId>,
}

impl<'a, S: Store> ChainWalker<'a, S> {
    fn new(store: &'a S, from: BlockId) -> Self {
        Self {
            store,
            next: Some(from),
            seen: HashSet::new(),
        }
    }

    /// Load the next block toward genesis.
    pub async fn next_block(&mut self) -> Result<Option<Block>> {
        let Some(id) = self.next.take() else {
            return Ok(None);
        };

        if !self.seen.insert(id) {
            return Err(LedgerError::BrokenChain(format!("block {} visited twice", id)));
        }

        let block = self
            .store
            .get_block(&id)
            .await?
            .ok_or_else(|| LedgerError::BrokenChain(format!("missing block {}", id)))?;

        if !block.is_genesis() {
            self.next = Some(block.pre_id);
        }
        Ok(Some(block))
    }
}

impl<S: Store> Ledger<S> {
    // ─────────────────────────────────────────────────────────────────────────
    // Chain Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Create the genesis block and point the tip at it.
    pub async fn init(&self) -> Result<BlockId> {
        let _writer = self.writer.lock().await;

        if let Some(tip) = self.store().get_tip().await? {
            return Err(LedgerError::AlreadyInitialized(tip));
        }

        let genesis = Block::genesis();
        self.store().put_block(&genesis).await?;
        if !self.store().compare_and_set_tip(None, &genesis.id).await? {
            let tip = self.store().get_tip().await?.unwrap_or(genesis.id);
            return Err(LedgerError::AlreadyInitialized(tip));
        }

        info!(genesis = %genesis.id, "chain initialized");
        Ok(genesis.id)
    }

    /// Current head block, if the chain is initialized.
    pub async fn tip(&self) -> Result<Option<BlockId>> {
        Ok(self.store().get_tip().await?)
    }

    pub(crate) async fn require_tip(&self) -> Result<BlockId> {
        self.tip().await?.ok_or(LedgerError::NotInitialized)
    }

    /// Append `txs` as one block on top of the current tip.
    ///
    /// Transactions are verified, then persisted in order, then the block,
    /// then the tip is swapped. A crash after the block write but before the
    /// swap leaves an orphan block that no traversal reaches.
    ///
    /// Any transaction id already in the store fails the append with
    /// `DuplicateTransaction` and the tip stays put.
    pub async fn append(&self, txs: &[Transaction]) -> Result<BlockId> {
        let _writer = self.writer.lock().await;
        let tip = self.require_tip().await?;

        let block = Block::new(tip, txs.iter().map(|tx| tx.id).collect());
        validate_block(&block, txs)?;

        for tx in txs {
            if self.store().has_transaction(&tx.id).await? {
                return Err(rejected_duplicate(tx.id));
            }
        }
        // A writer on another handle can still claim an id after the check
        if let Some(id) = self.store().put_new_transactions(txs).await? {
            return Err(rejected_duplicate(id));
        }
        self.store().put_block(&block).await?;

        if !self.store().compare_and_set_tip(Some(&tip), &block.id).await? {
            let found = self.store().get_tip().await?;
            warn!(orphan = %block.id, expected = %tip, ?found, "tip moved during append");
            return Err(LedgerError::TipMoved {
                expected: tip,
                found,
                orphan: block.id,
            });
        }

        info!(block = %block.id, pre_id = %tip, txs = txs.len(), "appended block");
        Ok(block.id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Traversal
    // ─────────────────────────────────────────────────────────────────────────

    /// Walk from the current tip.
    pub async fn walk(&self) -> Result<ChainWalker<'_, S>> {
        let tip = self.require_tip().await?;
        Ok(self.walk_from(tip))
    }

    /// Walk from a given block, for example an orphan found by id.
    pub fn walk_from(&self, from: BlockId) -> ChainWalker<'_, S> {
        ChainWalker::new(self.store(), from)
    }

    /// All blocks from tip to genesis.
    pub async fn blocks(&self) -> Result<Vec<Block>> {
        let mut walker = self.walk().await?;
        let mut blocks = Vec::new();
        while let Some(block) = walker.next_block().await? {
            blocks.push(block);
        }
        Ok(blocks)
    }

    /// Load a block's transactions in listed order.
    pub async fn block_transactions(&self, block: &Block) -> Result<Vec<Transaction>> {
        let mut txs = Vec::with_capacity(block.tx_list.len());
        for tx_id in &block.tx_list {
            txs.push(self.load_transaction(tx_id).await?);
        }
        Ok(txs)
    }

    /// Find the newest transaction of `tx_type` whose `field` equals `target`.
    pub async fn find_content(
        &self,
        target: &str,
        tx_type: TxType,
        field: &str,
    ) -> Result<Option<FoundContent>> {
        let mut walker = self.walk().await?;

        while let Some(block) = walker.next_block().await? {
            for tx_id in &block.tx_list {
                let tx = self.load_transaction(tx_id).await?;
                if tx.tx_type() == tx_type && tx.content.field_equals(field, target) {
                    debug!(
                        identifier = target,
                        tx = %tx.id,
                        block = %block.id,
                        "found content"
                    );
                    return Ok(Some(FoundContent {
                        tx_id: tx.id,
                        block_id: block.id,
                        content: tx.content,
                    }));
                }
                trace!(tx = %tx.id, tx_type = %tx.tx_type(), "skipped transaction");
            }
        }

        debug!(identifier = target, %tx_type, field, "reached genesis without a match");
        Ok(None)
    }

    /// Replay the whole chain, checking every block id and transaction.
    pub async fn verify_chain(&self) -> Result<ChainReport> {
        let tip = self.require_tip().await?;
        let mut walker = self.walk_from(tip);
        let mut report = ChainReport {
            tip,
            blocks: 0,
            transactions: 0,
        };

        while let Some(block) = walker.next_block().await? {
            let txs = self.block_transactions(&block).await?;
            validate_block(&block, &txs)?;
            report.blocks += 1;
            report.transactions += txs.len() as u64;
        }

        info!(tip = %tip, blocks = report.blocks, txs = report.transactions, "chain verified");
        Ok(report)
    }
}

fn rejected_duplicate(id: TxId) -> LedgerError {
    warn!(tx = %id, "transaction id already stored, append rejected");
    LedgerError::DuplicateTransaction(id)
}
