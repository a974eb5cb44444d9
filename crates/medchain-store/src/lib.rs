//! # Medchain Store
//!
//! Storage abstraction for Medchain. Provides a trait-based interface for
//! ledger persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The ledger needs very little from storage: key-addressed get and put
//! across a transaction namespace and a block namespace, plus one singleton
//! slot holding the chain tip. The [`Store`] trait captures exactly that.
//! The primary implementation is [`SqliteStore`], with [`MemoryStore`] for
//! testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`PutResult`] - Result of writing a content-addressed record
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medchain_store::{SqliteStore, Store};
//! use medchain_core::Transaction;
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let tx = Transaction::build("visit note").unwrap();
//!     store.put_transaction(&tx).await.unwrap();
//!     let stored = store.get_transaction(&tx.id).await.unwrap();
//!     assert_eq!(stored, Some(tx));
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent puts**: Writing the same record twice returns `AlreadyExists`
//! - **Missing is not an error**: getters return `Ok(None)`
//! - **Guarded tip**: the tip only moves by compare-and-swap

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{PutResult, Store, StoreExt};
