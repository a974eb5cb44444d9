//! # Medchain Testkit
//!
//! Testing utilities for Medchain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: An initialized ledger over a memory store, plus sample content
//! - **Generators**: Proptest strategies for every content variant
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use medchain_core::{KeyPolicy, TransactionBuilder};
//! use medchain_testkit::generators::content;
//!
//! proptest! {
//!     #[test]
//!     fn built_transaction_verifies(content in content()) {
//!         let tx = TransactionBuilder::new(content).sign(&KeyPolicy::Ephemeral).unwrap();
//!         prop_assert!(tx.verify().is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust,ignore
//! use medchain_testkit::fixtures::LedgerFixture;
//!
//! let fixture = LedgerFixture::new().await?;
//! let added = fixture.add_record("101", "001").await?;
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    operator_policies, sample_doctor, sample_new_record, sample_patient, LedgerFixture,
};
pub use generators::{content, medical_record, new_record};
