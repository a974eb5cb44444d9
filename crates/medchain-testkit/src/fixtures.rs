//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use medchain::{Committed, Ledger, LedgerConfig, NewRecord, Result};
use medchain_core::{Doctor, KeyPolicy, Keypair, Patient};
use medchain_store::MemoryStore;

/// An initialized ledger over a memory store.
pub struct LedgerFixture {
    pub ledger: Ledger<MemoryStore>,
}

impl LedgerFixture {
    /// A fresh chain with the default configuration.
    pub async fn new() -> Result<Self> {
        Self::with_config(LedgerConfig::default()).await
    }

    /// A fresh chain signing with a deterministic key from `seed`.
    pub async fn with_seed(seed: [u8; 32]) -> Result<Self> {
        Self::with_config(LedgerConfig {
            key_policy: KeyPolicy::Fixed(Keypair::from_seed(&seed)),
            ..Default::default()
        })
        .await
    }

    /// A fresh chain with the given configuration.
    pub async fn with_config(config: LedgerConfig) -> Result<Self> {
        let ledger = Ledger::new(MemoryStore::new(), config);
        ledger.init().await?;
        Ok(Self { ledger })
    }

    /// Add a sample record for a patient and doctor.
    pub async fn add_record(&self, patient_id: &str, doctor_id: &str) -> Result<Committed> {
        self.ledger
            .add_record(sample_new_record(patient_id, doctor_id))
            .await
    }
}

/// A visit record with filler clinical fields.
pub fn sample_new_record(patient_id: &str, doctor_id: &str) -> NewRecord {
    NewRecord {
        patient_id: patient_id.to_string(),
        doctor_id: doctor_id.to_string(),
        record_loc: "outpatient 3".to_string(),
        chief_complaint: "cough".to_string(),
        present_illness_history: "three days, no fever".to_string(),
        past_history: "none".to_string(),
    }
}

pub fn sample_patient(identifier: &str) -> Patient {
    Patient {
        identifier: identifier.to_string(),
        name: format!("patient {}", identifier),
        gender: "F".to_string(),
        birth_date: "1990-01-01".to_string(),
        phone: "555-0100".to_string(),
    }
}

pub fn sample_doctor(identifier: &str) -> Doctor {
    Doctor {
        identifier: identifier.to_string(),
        name: format!("doctor {}", identifier),
        department: "internal medicine".to_string(),
        password_hash: "0".repeat(64),
    }
}

/// Distinct fixed signing policies for multi-operator tests.
pub fn operator_policies(count: usize) -> Vec<KeyPolicy> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            KeyPolicy::Fixed(Keypair::from_seed(&seed))
        })
        .collect()
}
