//! The Ledger: unified API over a [`Store`].
//!
//! Chain management lives in [`crate::chain`], relation queries in
//! [`crate::relation`] and record lifecycle in [`crate::records`]. This
//! module holds the handle itself and the transaction-level operations.

use std::sync::Arc;

use medchain_core::{now_millis, Content, Transaction, TransactionBuilder, TxId};
use medchain_store::{PutResult, Store};
use tokio::sync::Mutex;

use crate::cache::RelationCache;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// Content read back from a transaction, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContent {
    pub tx_id: TxId,
    /// Creation time of the owning transaction (Unix ms).
    pub timestamp: i64,
    pub content: Content,
}

impl From<Transaction> for StoredContent {
    fn from(tx: Transaction) -> Self {
        Self {
            tx_id: tx.id,
            timestamp: tx.timestamp,
            content: tx.content,
        }
    }
}

/// The main Ledger struct.
///
/// Provides a unified API for:
/// - Initializing the chain and appending blocks
/// - Point lookups by walking from tip to genesis
/// - Relation queries (a subject's live or deleted records)
/// - Adding, deleting and updating medical records
///
/// Appends are serialized through an internal writer lock, and the tip
/// only moves by compare-and-swap, so the chain never forks. Reads take
/// no lock.
pub struct Ledger<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: LedgerConfig,
    /// Held for the whole of `init` and `append`.
    pub(crate) writer: Mutex<()>,
    /// Relation results per tip, when enabled.
    pub(crate) cache: Option<RelationCache>,
}

impl<S: Store> Ledger<S> {
    /// Create a new ledger over `store`.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create a ledger over a store that other handles may also use.
    pub fn with_shared_store(store: Arc<S>, config: LedgerConfig) -> Self {
        let cache = config.cache_relations.then(RelationCache::new);
        Self {
            store,
            config,
            writer: Mutex::new(()),
            cache,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Build and sign a transaction under the configured key policy.
    pub fn sign(&self, content: impl Into<Content>) -> Result<Transaction> {
        Ok(TransactionBuilder::new(content)
            .timestamp(now_millis())
            .sign(&self.config.key_policy)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a transaction under its id without putting it in a block.
    pub async fn persist_transaction(&self, tx: &Transaction) -> Result<PutResult> {
        Ok(self.store.put_transaction(tx).await?)
    }

    /// Get a transaction by id.
    pub async fn transaction(&self, id: &TxId) -> Result<Transaction> {
        self.load_transaction(id).await
    }

    /// Get the contents of several transactions, in the order given.
    pub async fn contents_by_ids(&self, ids: &[TxId]) -> Result<Vec<StoredContent>> {
        let mut contents = Vec::with_capacity(ids.len());
        for id in ids {
            contents.push(self.load_transaction(id).await?.into());
        }
        Ok(contents)
    }

    /// Check a transaction's id and signature against its content.
    pub fn verify_transaction(&self, tx: &Transaction) -> Result<()> {
        Ok(tx.verify()?)
    }

    /// Load a transaction, verifying it when `verify_on_read` is set.
    pub(crate) async fn load_transaction(&self, id: &TxId) -> Result<Transaction> {
        let tx = self
            .store
            .get_transaction(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", id)))?;
        if self.config.verify_on_read {
            tx.verify()?;
        }
        Ok(tx)
    }
}
