//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use medchain_core::{Block, BlockId, Transaction, TxId};

use crate::error::{Result, StoreError};
use crate::traits::{PutResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Transactions indexed by ID.
    transactions: HashMap<TxId, Transaction>,

    /// Blocks indexed by ID.
    blocks: HashMap<BlockId, Block>,

    /// Current chain head.
    tip: Option<BlockId>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_transaction(&self, tx: &Transaction) -> Result<PutResult> {
        let mut inner = self.write()?;
        if inner.transactions.contains_key(&tx.id) {
            return Ok(PutResult::AlreadyExists);
        }
        inner.transactions.insert(tx.id, tx.clone());
        Ok(PutResult::Inserted)
    }

    async fn get_transaction(&self, id: &TxId) -> Result<Option<Transaction>> {
        Ok(self.read()?.transactions.get(id).cloned())
    }

    async fn has_transaction(&self, id: &TxId) -> Result<bool> {
        Ok(self.read()?.transactions.contains_key(id))
    }

    async fn transaction_count(&self) -> Result<u64> {
        Ok(self.read()?.transactions.len() as u64)
    }

    async fn put_block(&self, block: &Block) -> Result<PutResult> {
        let mut inner = self.write()?;
        if inner.blocks.contains_key(&block.id) {
            return Ok(PutResult::AlreadyExists);
        }
        inner.blocks.insert(block.id, block.clone());
        Ok(PutResult::Inserted)
    }

    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>> {
        Ok(self.read()?.blocks.get(id).cloned())
    }

    async fn block_count(&self) -> Result<u64> {
        Ok(self.read()?.blocks.len() as u64)
    }

    async fn get_tip(&self) -> Result<Option<BlockId>> {
        Ok(self.read()?.tip)
    }

    async fn compare_and_set_tip(
        &self,
        expected: Option<&BlockId>,
        new: &BlockId,
    ) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.tip.as_ref() != expected {
            return Ok(false);
        }
        inner.tip = Some(*new);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;

    #[tokio::test]
    async fn test_memory_store_transactions() {
        let store = MemoryStore::new();
        let tx = Transaction::build("visit note").unwrap();

        assert_eq!(store.put_transaction(&tx).await.unwrap(), PutResult::Inserted);
        assert_eq!(
            store.put_transaction(&tx).await.unwrap(),
            PutResult::AlreadyExists
        );

        let retrieved = store.get_transaction(&tx.id).await.unwrap().unwrap();
        assert_eq!(retrieved, tx);
        assert!(store.has_transaction(&tx.id).await.unwrap());
        assert_eq!(store.transaction_count().await.unwrap(), 1);

        let missing = TxId::from_bytes([0xee; 32]);
        assert!(store.get_transaction(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_blocks() {
        let store = MemoryStore::new();
        let genesis = Block::genesis();

        assert_eq!(store.put_block(&genesis).await.unwrap(), PutResult::Inserted);
        assert_eq!(
            store.put_block(&genesis).await.unwrap(),
            PutResult::AlreadyExists
        );
        assert_eq!(store.get_block(&genesis.id).await.unwrap(), Some(genesis));
        assert_eq!(store.block_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_tip_cas() {
        let store = MemoryStore::new();
        let a = BlockId::from_bytes([1; 32]);
        let b = BlockId::from_bytes([2; 32]);

        assert_eq!(store.get_tip().await.unwrap(), None);
        assert!(store.compare_and_set_tip(None, &a).await.unwrap());
        assert!(!store.compare_and_set_tip(None, &b).await.unwrap());
        assert!(!store.compare_and_set_tip(Some(&b), &b).await.unwrap());
        assert!(store.compare_and_set_tip(Some(&a), &b).await.unwrap());
        assert_eq!(store.get_tip().await.unwrap(), Some(b));
    }

    #[tokio::test]
    async fn test_put_new_transactions_stops_at_stored_id() {
        let store = MemoryStore::new();
        let a = Transaction::build("a").unwrap();
        let b = Transaction::build("b").unwrap();
        let c = Transaction::build("c").unwrap();

        assert_eq!(store.put_new_transactions(&[a.clone()]).await.unwrap(), None);
        assert_eq!(
            store.put_new_transactions(&[b.clone(), a.clone(), c.clone()]).await.unwrap(),
            Some(a.id)
        );
        assert!(store.has_transaction(&b.id).await.unwrap());
        assert!(!store.has_transaction(&c.id).await.unwrap());
    }
}
