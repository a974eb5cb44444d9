//! Transaction: a signed, typed, immutable content wrapper.
//!
//! A transaction's id is derived from its signature, and the signature
//! covers the canonical encoding of its content. Nothing about a
//! transaction changes after it is built.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_bytes;
use crate::content::{Content, TxType};
use crate::crypto::{derive_id, Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{CoreError, Result};
use crate::types::TxId;

/// Which key signs a new transaction.
///
/// `Ephemeral` generates a fresh keypair for every transaction and drops it
/// right after signing. A stored transaction then proves its content was
/// not altered, but says nothing about who wrote it. `Fixed` signs every
/// transaction with the same key, so the public key identifies the signer.
#[derive(Debug, Clone, Default)]
pub enum KeyPolicy {
    #[default]
    Ephemeral,
    Fixed(Keypair),
}

impl KeyPolicy {
    /// Sign a message under this policy, returning the key that verifies it.
    fn sign(&self, message: &[u8]) -> (Ed25519PublicKey, Ed25519Signature) {
        match self {
            KeyPolicy::Ephemeral => {
                let keypair = Keypair::generate();
                (keypair.public_key(), keypair.sign(message))
            }
            KeyPolicy::Fixed(keypair) => (keypair.public_key(), keypair.sign(message)),
        }
    }

    /// The stable signer, if any.
    pub fn signer(&self) -> Option<Ed25519PublicKey> {
        match self {
            KeyPolicy::Ephemeral => None,
            KeyPolicy::Fixed(keypair) => Some(keypair.public_key()),
        }
    }
}

/// A signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// `derive_id(signature)`.
    pub id: TxId,
    pub pub_key: Ed25519PublicKey,
    pub content: Content,
    pub signature: Ed25519Signature,
    /// Creation time in Unix milliseconds. Not covered by the signature.
    pub timestamp: i64,
}

impl Transaction {
    /// Build and sign a transaction with a fresh key, stamped with the current time.
    pub fn build(content: impl Into<Content>) -> Result<Self> {
        TransactionBuilder::new(content)
            .timestamp(now_millis())
            .sign(&KeyPolicy::Ephemeral)
    }

    /// The content's variant tag.
    pub fn tx_type(&self) -> TxType {
        self.content.tx_type()
    }

    /// The bytes the signature covers.
    pub fn signed_message(&self) -> Vec<u8> {
        canonical_bytes(&self.content)
    }

    /// Check the id against the signature and the signature against the content.
    pub fn verify(&self) -> Result<()> {
        let expected = derive_id(&self.signature);
        if expected != self.id {
            return Err(CoreError::IdMismatch {
                expected: expected.to_hex(),
                actual: self.id.to_hex(),
            });
        }

        if self.pub_key.verify(&self.signed_message(), &self.signature)? {
            Ok(())
        } else {
            Err(CoreError::InvalidSignature)
        }
    }
}

/// Builder for transactions.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    content: Content,
    timestamp: i64,
}

impl TransactionBuilder {
    /// Start building a transaction around `content`.
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            content: content.into(),
            timestamp: 0,
        }
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    /// Sign the content under `policy` and derive the id.
    ///
    /// Fails with `InvalidContent` for [`Content::Empty`].
    pub fn sign(self, policy: &KeyPolicy) -> Result<Transaction> {
        if matches!(self.content, Content::Empty) {
            return Err(CoreError::InvalidContent("content is empty".into()));
        }

        let message = canonical_bytes(&self.content);
        let (pub_key, signature) = policy.sign(&message);

        Ok(Transaction {
            id: derive_id(&signature),
            pub_key,
            content: self.content,
            signature,
            timestamp: self.timestamp,
        })
    }
}

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DoctorRecord, Patient};
    use crate::crypto::verify;

    fn patient() -> Patient {
        Patient {
            identifier: "101".into(),
            name: "Li Lei".into(),
            gender: "M".into(),
            birth_date: "1990-01-01".into(),
            phone: "555-0101".into(),
        }
    }

    #[test]
    fn test_build_invariants() {
        let tx = Transaction::build(patient()).unwrap();
        assert_eq!(tx.id, derive_id(&tx.signature));
        assert_eq!(tx.tx_type(), TxType::Patient);
        assert!(tx.timestamp > 0);
        tx.verify().unwrap();

        let ok = verify(
            &tx.pub_key.to_hex(),
            &tx.signature.to_hex(),
            &canonical_bytes(&tx.content),
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_empty_content_rejected() {
        let err = TransactionBuilder::new(Content::Empty)
            .sign(&KeyPolicy::Ephemeral)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidContent(_)));
    }

    #[test]
    fn test_ephemeral_keys_differ() {
        let a = Transaction::build("same text").unwrap();
        let b = Transaction::build("same text").unwrap();
        assert_ne!(a.pub_key, b.pub_key);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_fixed_key_is_deterministic() {
        let policy = KeyPolicy::Fixed(Keypair::from_seed(&[3u8; 32]));
        let content = DoctorRecord {
            doctor_id: "001".into(),
            record_tx_id: TxId::from_bytes([9; 32]),
        };
        let a = TransactionBuilder::new(content.clone()).timestamp(1).sign(&policy).unwrap();
        let b = TransactionBuilder::new(content).timestamp(2).sign(&policy).unwrap();

        // Ed25519 is deterministic and the timestamp is not signed
        assert_eq!(a.id, b.id);
        assert_eq!(Some(a.pub_key), policy.signer());
    }

    #[test]
    fn test_tampered_content_fails_verification() {
        let mut tx = Transaction::build(patient()).unwrap();
        if let Content::Patient(p) = &mut tx.content {
            p.name = "Han Meimei".into();
        }
        assert!(matches!(tx.verify(), Err(CoreError::InvalidSignature)));
    }

    #[test]
    fn test_tampered_id_fails_verification() {
        let mut tx = Transaction::build("note").unwrap();
        tx.id = TxId::from_bytes([0; 32]);
        assert!(matches!(tx.verify(), Err(CoreError::IdMismatch { .. })));
    }

    proptest::proptest! {
        #[test]
        fn prop_text_build_verifies(text in "\\PC{1,64}") {
            let tx = Transaction::build(text.clone()).unwrap();
            proptest::prop_assert_eq!(tx.id, derive_id(&tx.signature));
            proptest::prop_assert!(tx.pub_key.verify(text.as_bytes(), &tx.signature).unwrap());
        }
    }

    #[test]
    fn test_serde_roundtrip_keeps_signature_valid() {
        let tx = Transaction::build(patient()).unwrap();
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
        back.verify().unwrap();
    }
}
