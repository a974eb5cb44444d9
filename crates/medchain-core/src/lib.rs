//! # Medchain Core
//!
//! Pure primitives for the Medchain ledger: signed transactions, typed
//! content, canonical encoding, and blocks.
//!
//! This crate contains no I/O, no storage, no async. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Transaction`] - A signed, immutable wrapper around one [`Content`] value
//! - [`Content`] - Closed tagged union of everything the ledger records
//! - [`TxId`] - Content-addressed id, derived from a transaction's signature
//! - [`Block`] - Ordered batch of transaction ids chained to its predecessor
//! - [`KeyPolicy`] - Ephemeral per-transaction keys or a fixed signer
//!
//! ## Canonicalization
//!
//! Structured content is signed as deterministic CBOR. Plain text is signed
//! verbatim. See [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod content;
pub mod crypto;
pub mod error;
pub mod transaction;
pub mod types;
pub mod validation;

pub use block::Block;
pub use canonical::canonical_bytes;
pub use content::{
    Content, Doctor, DoctorLastRecord, DoctorRecord, Fields, MedicalRecord, MedicalRecordDel,
    MedicalRecordUpdate, OperatorType, Patient, PatientLastRecord, PatientRecord, RecordPatch,
    RecordType, TxType,
};
pub use crypto::{
    derive_id, generate_keypair, sign, verify, Ed25519PublicKey, Ed25519Signature, Keypair,
};
pub use error::{CoreError, Result};
pub use transaction::{now_millis, KeyPolicy, Transaction, TransactionBuilder};
pub use types::{BlockId, TxId};
pub use validation::validate_block;
