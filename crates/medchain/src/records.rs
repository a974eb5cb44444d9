//! Record lifecycle operations.
//!
//! Adding, deleting, and updating a medical record each append exactly one
//! block. Nothing already on the chain is touched: a delete appends a
//! tombstone, an update appends the new record together with a
//! supersession pointing back at the old one.

use chrono::Local;
use medchain_core::{
    BlockId, Content, Doctor, DoctorRecord, MedicalRecord, MedicalRecordDel, MedicalRecordUpdate,
    OperatorType, Patient, PatientRecord, RecordType, Transaction, TxId, TxType,
};
use medchain_store::Store;
use tracing::info;

use crate::chain::FoundContent;
use crate::error::{LedgerError, Result};
use crate::ledger::{Ledger, StoredContent};
use crate::relation::{QueryMode, RelationQuery, RelationView};

/// Format of `MedicalRecord::record_time`.
pub const RECORD_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Caller-supplied fields of a new visit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub patient_id: String,
    pub doctor_id: String,
    pub record_loc: String,
    pub chief_complaint: String,
    pub present_illness_history: String,
    pub past_history: String,
}

impl NewRecord {
    /// Stamp the record with its visit time.
    pub fn into_record(self, record_time: &str) -> MedicalRecord {
        MedicalRecord {
            record_id: format!("{}{}", self.patient_id, record_time),
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            record_time: record_time.to_string(),
            record_loc: self.record_loc,
            chief_complaint: self.chief_complaint,
            present_illness_history: self.present_illness_history,
            past_history: self.past_history,
            record_type: RecordType::Add,
        }
    }
}

/// Who issued a delete or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub operator_type: OperatorType,
    pub operator_id: String,
}

impl Operator {
    pub fn doctor(id: impl Into<String>) -> Self {
        Self {
            operator_type: OperatorType::Doctor,
            operator_id: id.into(),
        }
    }

    pub fn patient(id: impl Into<String>) -> Self {
        Self {
            operator_type: OperatorType::Patient,
            operator_id: id.into(),
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            operator_type: OperatorType::Admin,
            operator_id: id.into(),
        }
    }
}

/// Outcome of a write: the new block and the transaction of interest in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed {
    pub block_id: BlockId,
    pub tx_id: TxId,
}

/// A deleted record alongside the tombstone that deleted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedRecord {
    pub record: StoredContent,
    pub tombstone: StoredContent,
}

/// Current local time as a record timestamp.
pub fn record_time_now() -> String {
    Local::now().format(RECORD_TIME_FORMAT).to_string()
}

impl<S: Store> Ledger<S> {
    // ─────────────────────────────────────────────────────────────────────────
    // Record Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a visit record stamped with the current local time.
    pub async fn add_record(&self, new: NewRecord) -> Result<Committed> {
        self.add_record_at(new, &record_time_now()).await
    }

    /// Add a visit record with an explicit `record_time`.
    ///
    /// Appends the record and its patient and doctor index entries as one
    /// block.
    pub async fn add_record_at(&self, new: NewRecord, record_time: &str) -> Result<Committed> {
        let record = new.into_record(record_time);
        let record_tx = self.sign(record.clone())?;
        let [patient_idx, doctor_idx] = self.index_entries(&record, record_tx.id)?;

        let block_id = self
            .append(&[record_tx.clone(), patient_idx, doctor_idx])
            .await?;
        info!(record_id = %record.record_id, tx = %record_tx.id, "record added");

        Ok(Committed {
            block_id,
            tx_id: record_tx.id,
        })
    }

    /// Delete a record by appending a tombstone for it.
    pub async fn delete_record(&self, target: &TxId, operator: &Operator) -> Result<Committed> {
        let tx = self.load_transaction(target).await?;
        let record = expect_record(tx.id, &tx.content)?;

        let tombstone = self.sign(MedicalRecordDel {
            tx_id: tx.id,
            operator_type: operator.operator_type,
            operator_id: operator.operator_id.clone(),
            patient_id: record.patient_id.clone(),
            doctor_id: record.doctor_id.clone(),
        })?;

        let block_id = self.append(std::slice::from_ref(&tombstone)).await?;
        info!(record = %tx.id, tombstone = %tombstone.id, "record deleted");

        Ok(Committed {
            block_id,
            tx_id: tombstone.id,
        })
    }

    /// Replace `old` with `new`.
    ///
    /// Appends the new record, its index entries, and a supersession from
    /// old to new as one block. The new record is marked as an update.
    /// Returns the new record's transaction id.
    pub async fn update_record(
        &self,
        old: &StoredContent,
        mut new: MedicalRecord,
        operator: &Operator,
    ) -> Result<Committed> {
        let old_record = expect_record(old.tx_id, &old.content)?;
        new.record_type = RecordType::Update;

        let record_tx = self.sign(new.clone())?;
        let [patient_idx, doctor_idx] = self.index_entries(&new, record_tx.id)?;
        let supersession = self.sign(MedicalRecordUpdate {
            old_tx_id: old.tx_id,
            new_tx_id: record_tx.id,
            operator_type: operator.operator_type,
            operator_id: operator.operator_id.clone(),
            old_patient_id: old_record.patient_id.clone(),
            old_doctor_id: old_record.doctor_id.clone(),
        })?;

        let block_id = self
            .append(&[record_tx.clone(), patient_idx, doctor_idx, supersession])
            .await?;
        info!(old = %old.tx_id, new = %record_tx.id, "record updated");

        Ok(Committed {
            block_id,
            tx_id: record_tx.id,
        })
    }

    fn index_entries(
        &self,
        record: &MedicalRecord,
        record_tx_id: TxId,
    ) -> Result<[Transaction; 2]> {
        Ok([
            self.sign(PatientRecord {
                patient_id: record.patient_id.clone(),
                record_tx_id,
            })?,
            self.sign(DoctorRecord {
                doctor_id: record.doctor_id.clone(),
                record_tx_id,
            })?,
        ])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Record Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Newest record with the given `record_id`.
    pub async fn find_by_id(&self, record_id: &str) -> Result<Option<FoundContent>> {
        self.find_content(record_id, TxType::MedicalRecord, "record_id")
            .await
    }

    /// A patient's records in the given mode.
    pub async fn find_by_patient_id(
        &self,
        patient_id: &str,
        mode: QueryMode,
    ) -> Result<RelationView> {
        self.resolve(&RelationQuery::by_patient(patient_id, mode))
            .await
    }

    /// A doctor's records in the given mode.
    pub async fn find_by_doctor_id(
        &self,
        doctor_id: &str,
        mode: QueryMode,
    ) -> Result<RelationView> {
        self.resolve(&RelationQuery::by_doctor(doctor_id, mode))
            .await
    }

    /// Every record a doctor's tombstones deleted, newest deletion first.
    pub async fn deleted_records_by_doctor(&self, doctor_id: &str) -> Result<Vec<DeletedRecord>> {
        let tip = self.require_tip().await?;
        let query = RelationQuery::by_doctor(doctor_id, QueryMode::Deleted);
        let scan = self.scan_relation(tip, &query).await?;

        let records = self.contents_by_ids(&scan.tombstone_targets).await?;
        let tombstones = self.contents_by_ids(&scan.tombstones).await?;
        Ok(records
            .into_iter()
            .zip(tombstones)
            .map(|(record, tombstone)| DeletedRecord { record, tombstone })
            .collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identities
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a patient's identity as a one-transaction block.
    pub async fn register_patient(&self, patient: Patient) -> Result<Committed> {
        self.append_single(patient).await
    }

    /// Record a doctor's identity as a one-transaction block.
    pub async fn register_doctor(&self, doctor: Doctor) -> Result<Committed> {
        self.append_single(doctor).await
    }

    /// Newest identity recorded for a patient.
    pub async fn find_patient(&self, identifier: &str) -> Result<Option<Patient>> {
        let found = self
            .find_content(identifier, TxType::Patient, "identifier")
            .await?;
        Ok(found.and_then(|f| match f.content {
            Content::Patient(patient) => Some(patient),
            _ => None,
        }))
    }

    /// Newest identity recorded for a doctor.
    pub async fn find_doctor(&self, identifier: &str) -> Result<Option<Doctor>> {
        let found = self
            .find_content(identifier, TxType::Doctor, "identifier")
            .await?;
        Ok(found.and_then(|f| match f.content {
            Content::Doctor(doctor) => Some(doctor),
            _ => None,
        }))
    }

    async fn append_single(&self, content: impl Into<Content>) -> Result<Committed> {
        let tx = self.sign(content)?;
        let block_id = self.append(std::slice::from_ref(&tx)).await?;
        Ok(Committed {
            block_id,
            tx_id: tx.id,
        })
    }
}

fn expect_record(tx_id: TxId, content: &Content) -> Result<&MedicalRecord> {
    content
        .as_medical_record()
        .ok_or(LedgerError::UnexpectedContent {
            tx_id,
            expected: TxType::MedicalRecord,
            found: content.tx_type(),
        })
}
