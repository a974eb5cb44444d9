//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Medchain. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use medchain_core::{
    now_millis, Block, BlockId, Content, Ed25519PublicKey, Ed25519Signature, Transaction, TxId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{PutResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Raw transaction columns, decoded outside the connection lock.
struct TransactionRow {
    tx_type: String,
    pub_key: String,
    signature: String,
    timestamp: i64,
    content: String,
}

fn decode_transaction(id: TxId, row: TransactionRow) -> Result<Transaction> {
    let content: Content = serde_json::from_str(&row.content)
        .map_err(|e| StoreError::Serialization(format!("transaction {}: {}", id, e)))?;

    if content.tx_type().as_str() != row.tx_type {
        return Err(StoreError::InvalidData(format!(
            "transaction {} stored as {} but content is {}",
            id,
            row.tx_type,
            content.tx_type()
        )));
    }

    Ok(Transaction {
        id,
        pub_key: Ed25519PublicKey::from_hex(&row.pub_key)
            .map_err(|e| StoreError::InvalidData(format!("transaction {}: {}", id, e)))?,
        content,
        signature: Ed25519Signature::from_hex(&row.signature)
            .map_err(|e| StoreError::InvalidData(format!("transaction {}: {}", id, e)))?,
        timestamp: row.timestamp,
    })
}

// Helper to encode a tx list to CBOR
fn encode_tx_list(tx_list: &[TxId]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(tx_list, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_tx_list(bytes: &[u8]) -> Result<Vec<TxId>> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn parse_block_id(hex: &str) -> Result<BlockId> {
    BlockId::from_hex(hex).map_err(|e| StoreError::InvalidData(e.to_string()))
}

#[async_trait]
impl Store for SqliteStore {
    async fn put_transaction(&self, tx: &Transaction) -> Result<PutResult> {
        let content = serde_json::to_string(&tx.content)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tx_id = tx.id.to_hex();
        let tx_type = tx.tx_type().as_str();
        let pub_key = tx.pub_key.to_hex();
        let signature = tx.signature.to_hex();
        let timestamp = tx.timestamp;

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO transactions (
                    tx_id, tx_type, pub_key, signature, timestamp, content, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![tx_id, tx_type, pub_key, signature, timestamp, content, now_millis()],
            )?;
            Ok(if changed == 1 {
                PutResult::Inserted
            } else {
                PutResult::AlreadyExists
            })
        })
        .await
    }

    async fn get_transaction(&self, id: &TxId) -> Result<Option<Transaction>> {
        let id = *id;
        let row = self
            .blocking(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT tx_type, pub_key, signature, timestamp, content
                         FROM transactions WHERE tx_id = ?1",
                        params![id.to_hex()],
                        |row| {
                            Ok(TransactionRow {
                                tx_type: row.get(0)?,
                                pub_key: row.get(1)?,
                                signature: row.get(2)?,
                                timestamp: row.get(3)?,
                                content: row.get(4)?,
                            })
                        },
                    )
                    .optional()?)
            })
            .await?;

        row.map(|row| decode_transaction(id, row)).transpose()
    }

    async fn has_transaction(&self, id: &TxId) -> Result<bool> {
        let id = id.to_hex();
        self.blocking(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM transactions WHERE tx_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn transaction_count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn put_block(&self, block: &Block) -> Result<PutResult> {
        let block_id = block.id.to_hex();
        let pre_id = block.pre_id.to_hex();
        let tx_list = encode_tx_list(&block.tx_list)?;

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO blocks (block_id, pre_id, tx_list, stored_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![block_id, pre_id, tx_list, now_millis()],
            )?;
            Ok(if changed == 1 {
                PutResult::Inserted
            } else {
                PutResult::AlreadyExists
            })
        })
        .await
    }

    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>> {
        let id = *id;
        let row: Option<(String, Vec<u8>)> = self
            .blocking(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT pre_id, tx_list FROM blocks WHERE block_id = ?1",
                        params![id.to_hex()],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?)
            })
            .await?;

        match row {
            Some((pre_id, tx_list)) => Ok(Some(Block {
                id,
                pre_id: parse_block_id(&pre_id)?,
                tx_list: decode_tx_list(&tx_list)?,
            })),
            None => Ok(None),
        }
    }

    async fn block_count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn get_tip(&self) -> Result<Option<BlockId>> {
        let tip: Option<String> = self
            .blocking(|conn| {
                Ok(conn
                    .query_row("SELECT block_id FROM chain_tip WHERE slot = 0", [], |row| {
                        row.get(0)
                    })
                    .optional()?)
            })
            .await?;

        tip.as_deref().map(parse_block_id).transpose()
    }

    async fn compare_and_set_tip(
        &self,
        expected: Option<&BlockId>,
        new: &BlockId,
    ) -> Result<bool> {
        let expected = expected.map(BlockId::to_hex);
        let new = new.to_hex();

        self.blocking(move |conn| {
            // IMMEDIATE takes the write lock up front so the read-compare-write
            // is atomic across connections to the same file.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current: Option<String> = tx
                .query_row("SELECT block_id FROM chain_tip WHERE slot = 0", [], |row| {
                    row.get(0)
                })
                .optional()?;

            if current != expected {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO chain_tip (slot, block_id, updated_at) VALUES (0, ?1, ?2)
                 ON CONFLICT(slot) DO UPDATE SET
                    block_id = excluded.block_id,
                    updated_at = excluded.updated_at",
                params![new, now_millis()],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medchain_core::{KeyPolicy, PatientRecord, TransactionBuilder};

    #[tokio::test]
    async fn test_sqlite_store_transaction_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let tx = TransactionBuilder::new(PatientRecord {
            patient_id: "101".into(),
            record_tx_id: TxId::from_bytes([4; 32]),
        })
        .timestamp(1_700_000_000_000)
        .sign(&KeyPolicy::Ephemeral)
        .unwrap();

        assert_eq!(store.put_transaction(&tx).await.unwrap(), PutResult::Inserted);
        assert_eq!(
            store.put_transaction(&tx).await.unwrap(),
            PutResult::AlreadyExists
        );

        let retrieved = store.get_transaction(&tx.id).await.unwrap().unwrap();
        assert_eq!(retrieved, tx);
        retrieved.verify().unwrap();
        assert!(store.has_transaction(&tx.id).await.unwrap());
        assert_eq!(store.transaction_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_store_missing_is_none() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store
            .get_transaction(&TxId::from_bytes([1; 32]))
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_block(&BlockId::from_bytes([1; 32]))
            .await
            .unwrap()
            .is_none());
        assert!(store.get_tip().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_store_block_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let genesis = Block::genesis();
        let block = Block::new(
            genesis.id,
            vec![TxId::from_bytes([1; 32]), TxId::from_bytes([2; 32])],
        );

        store.put_block(&genesis).await.unwrap();
        assert_eq!(store.put_block(&block).await.unwrap(), PutResult::Inserted);

        let retrieved = store.get_block(&block.id).await.unwrap().unwrap();
        assert_eq!(retrieved, block);
        retrieved.verify_id().unwrap();
        assert_eq!(store.block_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_store_tip_cas() {
        let store = SqliteStore::open_memory().unwrap();
        let a = BlockId::from_bytes([1; 32]);
        let b = BlockId::from_bytes([2; 32]);

        assert!(store.compare_and_set_tip(None, &a).await.unwrap());
        assert!(!store.compare_and_set_tip(None, &b).await.unwrap());
        assert!(store.compare_and_set_tip(Some(&a), &b).await.unwrap());
        assert_eq!(store.get_tip().await.unwrap(), Some(b));
    }

    #[tokio::test]
    async fn test_sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let tx = Transaction::build("persisted").unwrap();
        let genesis = Block::genesis();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put_transaction(&tx).await.unwrap();
            store.put_block(&genesis).await.unwrap();
            store.compare_and_set_tip(None, &genesis.id).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_transaction(&tx.id).await.unwrap(), Some(tx));
        assert_eq!(store.get_tip().await.unwrap(), Some(genesis.id));
    }
}
