//! # Medchain
//!
//! The unified API for Medchain: medical visit records kept as an
//! append-only ledger of signed transactions in hash-chained blocks.
//!
//! ## Overview
//!
//! The ledger never edits what it has written. It provides:
//!
//! - **Chain**: Genesis, append, and tip-to-genesis traversal
//! - **Lookups**: Newest transaction of a type whose field matches
//! - **Relations**: A patient's or doctor's records, recomputed by replay
//! - **Lifecycle**: Add, delete, and update records as new transactions
//!
//! ## Key Concepts
//!
//! - **Transaction**: Immutable. Signed. Its id is derived from its signature.
//! - **Block**: Ordered batch of transaction ids chained to its predecessor.
//! - **Tombstone**: A transaction marking a record as deleted.
//! - **Supersession**: A transaction linking a replaced record to its successor.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medchain::{Ledger, LedgerConfig, NewRecord, Operator, QueryMode};
//! use medchain::store::SqliteStore;
//!
//! async fn example() {
//!     // Open storage
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     // Create the ledger and its genesis block
//!     let ledger = Ledger::new(store, LedgerConfig::default());
//!     ledger.init().await.unwrap();
//!
//!     // Add a visit record
//!     let added = ledger
//!         .add_record(NewRecord {
//!             patient_id: "101".into(),
//!             doctor_id: "001".into(),
//!             record_loc: "outpatient 3".into(),
//!             chief_complaint: "cough".into(),
//!             present_illness_history: "three days".into(),
//!             past_history: "none".into(),
//!         })
//!         .await
//!         .unwrap();
//!
//!     // The doctor's live records
//!     let view = ledger.find_by_doctor_id("001", QueryMode::Normal).await.unwrap();
//!
//!     // Delete it again
//!     ledger
//!         .delete_record(&added.tx_id, &Operator::doctor("001"))
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `medchain::core` - Core primitives (Transaction, Content, Block, etc.)
//! - `medchain::store` - Storage abstraction and SQLite

pub(crate) mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod ledger;
pub mod records;
pub mod relation;

// Re-export component crates
pub use medchain_core as core;
pub use medchain_store as store;

// Re-export main types for convenience
pub use chain::{ChainReport, ChainWalker, FoundContent};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{Ledger, StoredContent};
pub use records::{Committed, DeletedRecord, NewRecord, Operator};
pub use relation::{QueryMode, RelationQuery, RelationScan, RelationView};

// Re-export commonly used core types
pub use medchain_core::{
    Block, BlockId, Content, KeyPolicy, Keypair, MedicalRecord, RecordPatch, Transaction, TxId,
    TxType,
};
