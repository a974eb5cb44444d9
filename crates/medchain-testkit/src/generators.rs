//! Proptest generators for property-based testing.

use proptest::prelude::*;

use medchain::NewRecord;
use medchain_core::{
    BlockId, Content, Doctor, DoctorLastRecord, DoctorRecord, Keypair, MedicalRecord,
    MedicalRecordDel, MedicalRecordUpdate, OperatorType, Patient, PatientLastRecord,
    PatientRecord, RecordPatch, RecordType, TxId,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random TxId.
pub fn tx_id() -> impl Strategy<Value = TxId> {
    any::<[u8; 32]>().prop_map(TxId::from_bytes)
}

/// Generate a random BlockId, never the genesis sentinel.
pub fn block_id() -> impl Strategy<Value = BlockId> {
    any::<[u8; 32]>()
        .prop_map(BlockId::from_bytes)
        .prop_filter("sentinel", |id| !id.is_sentinel())
}

/// Generate a patient or doctor identifier.
pub fn identifier() -> impl Strategy<Value = String> {
    "[0-9]{3}".prop_map(String::from)
}

/// Generate free text, including non-ASCII.
pub fn text() -> impl Strategy<Value = String> {
    "\\PC{0,40}".prop_map(String::from)
}

/// Generate a `YYYYmmddHHMMSS` timestamp.
pub fn record_time() -> impl Strategy<Value = String> {
    (2000u32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(y, mo, d, h, mi, s)| format!("{:04}{:02}{:02}{:02}{:02}{:02}", y, mo, d, h, mi, s),
    )
}

pub fn operator_type() -> impl Strategy<Value = OperatorType> {
    prop_oneof![
        Just(OperatorType::Doctor),
        Just(OperatorType::Patient),
        Just(OperatorType::Admin),
    ]
}

pub fn patient() -> impl Strategy<Value = Patient> {
    (identifier(), text(), text(), text(), text()).prop_map(
        |(identifier, name, gender, birth_date, phone)| Patient {
            identifier,
            name,
            gender,
            birth_date,
            phone,
        },
    )
}

pub fn doctor() -> impl Strategy<Value = Doctor> {
    (identifier(), text(), text(), "[0-9a-f]{64}").prop_map(
        |(identifier, name, department, password_hash)| Doctor {
            identifier,
            name,
            department,
            password_hash,
        },
    )
}

/// Generate the caller-supplied part of a visit record.
pub fn new_record() -> impl Strategy<Value = NewRecord> {
    (identifier(), identifier(), text(), text(), text(), text()).prop_map(
        |(patient_id, doctor_id, record_loc, chief_complaint, present, past)| NewRecord {
            patient_id,
            doctor_id,
            record_loc,
            chief_complaint,
            present_illness_history: present,
            past_history: past,
        },
    )
}

pub fn medical_record() -> impl Strategy<Value = MedicalRecord> {
    (new_record(), record_time(), any::<bool>()).prop_map(|(new, time, updated)| {
        let mut record = new.into_record(&time);
        if updated {
            record.record_type = RecordType::Update;
        }
        record
    })
}

pub fn record_patch() -> impl Strategy<Value = RecordPatch> {
    (
        proptest::option::of(text()),
        proptest::option::of(text()),
        proptest::option::of(text()),
        proptest::option::of(text()),
    )
        .prop_map(
            |(record_loc, chief_complaint, present_illness_history, past_history)| RecordPatch {
                record_loc,
                chief_complaint,
                present_illness_history,
                past_history,
            },
        )
}

/// Generate any signable content.
pub fn content() -> impl Strategy<Value = Content> {
    prop_oneof![
        patient().prop_map(Content::from),
        doctor().prop_map(Content::from),
        medical_record().prop_map(Content::from),
        (identifier(), tx_id()).prop_map(|(patient_id, record_tx_id)| {
            Content::from(PatientRecord {
                patient_id,
                record_tx_id,
            })
        }),
        (identifier(), tx_id()).prop_map(|(doctor_id, record_tx_id)| {
            Content::from(DoctorRecord {
                doctor_id,
                record_tx_id,
            })
        }),
        (identifier(), tx_id()).prop_map(|(patient_id, record_tx_id)| {
            Content::from(PatientLastRecord {
                patient_id,
                record_tx_id,
            })
        }),
        (identifier(), tx_id()).prop_map(|(doctor_id, record_tx_id)| {
            Content::from(DoctorLastRecord {
                doctor_id,
                record_tx_id,
            })
        }),
        (tx_id(), operator_type(), identifier(), identifier(), identifier()).prop_map(
            |(tx_id, operator_type, operator_id, patient_id, doctor_id)| {
                Content::from(MedicalRecordDel {
                    tx_id,
                    operator_type,
                    operator_id,
                    patient_id,
                    doctor_id,
                })
            }
        ),
        (tx_id(), tx_id(), operator_type(), identifier(), identifier(), identifier()).prop_map(
            |(old_tx_id, new_tx_id, operator_type, operator_id, old_patient_id, old_doctor_id)| {
                Content::from(MedicalRecordUpdate {
                    old_tx_id,
                    new_tx_id,
                    operator_type,
                    operator_id,
                    old_patient_id,
                    old_doctor_id,
                })
            }
        ),
        text().prop_map(Content::from),
    ]
}
