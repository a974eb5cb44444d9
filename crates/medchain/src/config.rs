//! Ledger configuration.

use medchain_core::KeyPolicy;

/// Configuration for the Ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Which key signs new transactions.
    ///
    /// Defaults to [`KeyPolicy::Ephemeral`]: every transaction proves its own
    /// integrity, but carries no stable signer identity. Use
    /// [`KeyPolicy::Fixed`] when the public key should identify the operator.
    pub key_policy: KeyPolicy,
    /// Verify every transaction loaded during traversal.
    pub verify_on_read: bool,
    /// Cache relation query results per chain tip.
    pub cache_relations: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            key_policy: KeyPolicy::Ephemeral,
            verify_on_read: false,
            cache_relations: false,
        }
    }
}
