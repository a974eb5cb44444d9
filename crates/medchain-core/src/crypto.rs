//! Signature service: Ed25519 keys and signatures, Blake3 id derivation.
//!
//! Keys and signatures travel as hex strings in stored records. Parsing
//! them is the only place an [`CoreError::Encoding`] can originate.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::TxId;

/// Domain separator for transaction id derivation.
const TX_ID_DOMAIN: &[u8] = b"medchain/tx-id/v1";

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CoreError::Encoding(format!("public key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Verify a signature over a message.
    ///
    /// Returns `Ok(false)` for a well-formed signature that does not match,
    /// and an encoding error if the key is not a valid curve point.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<bool> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CoreError::Encoding(format!("invalid public key: {}", e)))?;
        let sig = Signature::from_bytes(&signature.0);
        Ok(verifying_key.verify(message, &sig).is_ok())
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 64] = bytes.as_slice().try_into().map_err(|_| {
            CoreError::Encoding(format!("signature must be 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &self.to_hex()[..16])
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A keypair for signing transactions.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Signature service
// ─────────────────────────────────────────────────────────────────────────────

/// Generate a fresh keypair.
pub fn generate_keypair() -> Keypair {
    Keypair::generate()
}

/// Sign the exact bytes of `message`.
pub fn sign(keypair: &Keypair, message: &[u8]) -> Ed25519Signature {
    keypair.sign(message)
}

/// Derive the content-addressed transaction id from a signature.
pub fn derive_id(signature: &Ed25519Signature) -> TxId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(TX_ID_DOMAIN);
    hasher.update(&signature.0);
    TxId(*hasher.finalize().as_bytes())
}

/// Verify a hex-encoded signature against a hex-encoded public key.
pub fn verify(public_hex: &str, signature_hex: &str, message: &[u8]) -> Result<bool> {
    let public_key = Ed25519PublicKey::from_hex(public_hex)?;
    let signature = Ed25519Signature::from_hex(signature_hex)?;
    public_key.verify(message, &signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = generate_keypair();
        let message = b"chief complaint: headache";
        let signature = sign(&keypair, message);

        assert!(keypair.public_key().verify(message, &signature).unwrap());
        assert!(!keypair
            .public_key()
            .verify(b"chief complaint: headachE", &signature)
            .unwrap());
    }

    #[test]
    fn test_verify_hex() {
        let keypair = Keypair::from_seed(&[7u8; 32]);
        let signature = keypair.sign(b"msg");
        let ok = verify(&keypair.public_key().to_hex(), &signature.to_hex(), b"msg").unwrap();
        assert!(ok);

        let other = Keypair::from_seed(&[8u8; 32]);
        let wrong = verify(&other.public_key().to_hex(), &signature.to_hex(), b"msg").unwrap();
        assert!(!wrong);
    }

    #[test]
    fn test_verify_malformed_inputs() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(b"msg").to_hex();
        let public = keypair.public_key().to_hex();

        assert!(matches!(
            verify("not-hex", &signature, b"msg"),
            Err(CoreError::Encoding(_))
        ));
        assert!(matches!(
            verify(&public, &signature[..10], b"msg"),
            Err(CoreError::Encoding(_))
        ));
        assert!(matches!(
            verify(&public[..62], &signature, b"msg"),
            Err(CoreError::Encoding(_))
        ));
    }

    #[test]
    fn test_derive_id_deterministic() {
        let keypair = Keypair::from_seed(&[0x42u8; 32]);
        let sig = keypair.sign(b"record");
        assert_eq!(derive_id(&sig), derive_id(&sig));
        assert_eq!(derive_id(&sig).to_hex().len(), 64);

        let other = keypair.sign(b"other record");
        assert_ne!(derive_id(&sig), derive_id(&other));
    }

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let seed = [0x42u8; 32];
        assert_eq!(
            Keypair::from_seed(&seed).public_key(),
            Keypair::from_seed(&seed).public_key()
        );
    }
}
