//! Error types for the ledger.

use medchain_core::{BlockId, CoreError, TxId, TxType};
use medchain_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Content, signature, or encoding error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error, passed through unchanged.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// An id was absent from the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// `init` was called on a chain that already has a tip.
    #[error("chain already initialized at {0}")]
    AlreadyInitialized(BlockId),

    /// An append or query ran before `init`.
    #[error("chain not initialized")]
    NotInitialized,

    /// Relation query mode outside the supported set.
    #[error("unsupported query mode: {0}")]
    UnsupportedMode(String),

    /// Relation query against a type that is not an index entry.
    #[error("{0} is not a relation index type")]
    UnsupportedRelation(TxType),

    /// Filtering tried to remove a record that was never live.
    #[error("invariant violation: {id} is not in the live list ({context})")]
    InvariantViolation { id: TxId, context: String },

    /// A transaction held a different content variant than the operation needs.
    #[error("transaction {tx_id}: expected {expected} content, found {found}")]
    UnexpectedContent {
        tx_id: TxId,
        expected: TxType,
        found: TxType,
    },

    /// A transaction id is already in the store. Ids must be unique on the
    /// chain; a fixed signing key signing identical content repeats one.
    #[error("transaction {0} is already stored")]
    DuplicateTransaction(TxId),

    /// Another writer advanced the tip between our read and our swap.
    #[error("tip moved from {expected:?} to {found:?}; block {orphan} left unreferenced")]
    TipMoved {
        expected: BlockId,
        found: Option<BlockId>,
        orphan: BlockId,
    },

    /// A traversal hit a missing block or revisited one.
    #[error("broken chain: {0}")]
    BrokenChain(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
