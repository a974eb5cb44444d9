//! Store trait: the abstract interface for ledger persistence.
//!
//! This trait allows the ledger to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use medchain_core::{Block, BlockId, Transaction, TxId};

use crate::error::Result;

/// Result of writing a content-addressed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    /// Record was written.
    Inserted,
    /// A record with the same id already exists (idempotent - not an error).
    AlreadyExists,
}

/// The Store trait: async, key-addressed persistence.
///
/// Two namespaces, transactions keyed by [`TxId`] and blocks keyed by
/// [`BlockId`], plus one singleton slot holding the chain tip.
///
/// # Design Notes
///
/// - **Content addressing**: ids are digests of the record, so a put for an
///   existing id is a no-op that returns `AlreadyExists`.
/// - **Not found is not an error**: getters return `Ok(None)`.
/// - **The tip is the only mutable value**: it only moves through
///   [`Store::compare_and_set_tip`], so two writers cannot both advance
///   from the same head.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a transaction under its id.
    async fn put_transaction(&self, tx: &Transaction) -> Result<PutResult>;

    /// Get a transaction by id.
    async fn get_transaction(&self, id: &TxId) -> Result<Option<Transaction>>;

    /// Check if a transaction exists.
    async fn has_transaction(&self, id: &TxId) -> Result<bool>;

    /// Number of stored transactions, referenced or not.
    async fn transaction_count(&self) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Blocks
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a block under its id.
    async fn put_block(&self, block: &Block) -> Result<PutResult>;

    /// Get a block by id.
    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>>;

    /// Number of stored blocks, including orphans.
    async fn block_count(&self) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Chain tip
    // ─────────────────────────────────────────────────────────────────────────

    /// Current head block, or `None` before the chain is initialized.
    async fn get_tip(&self) -> Result<Option<BlockId>>;

    /// Move the tip to `new` only if it currently equals `expected`.
    ///
    /// `expected = None` means "no tip yet". Returns whether the swap happened.
    async fn compare_and_set_tip(&self, expected: Option<&BlockId>, new: &BlockId)
        -> Result<bool>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Persist transactions in order, stopping at the first id already stored.
    ///
    /// Returns that id, or `None` when every transaction was new. Ids
    /// inserted before the collision stay in the store.
    fn put_new_transactions(
        &self,
        txs: &[Transaction],
    ) -> impl std::future::Future<Output = Result<Option<TxId>>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn put_new_transactions(&self, txs: &[Transaction]) -> Result<Option<TxId>> {
        for tx in txs {
            if self.put_transaction(tx).await? == PutResult::AlreadyExists {
                return Ok(Some(tx.id));
            }
        }
        Ok(None)
    }
}
