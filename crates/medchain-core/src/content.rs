//! Typed transaction content.
//!
//! Every transaction wraps exactly one [`Content`] variant. The variant tag
//! doubles as the transaction's `tx_type`, so the two can never disagree.
//! Untyped input (for example JSON from a presentation layer) enters through
//! [`Content::from_tagged`], which rejects unknown kinds up front.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::types::TxId;

/// Discriminator for transaction content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Patient,
    Doctor,
    MedicalRecord,
    PatientRecord,
    PatientLastRecord,
    DoctorRecord,
    DoctorLastRecord,
    MedicalRecordDel,
    MedicalRecordUpdate,
    #[serde(rename = "string")]
    PlainText,
    #[serde(rename = "none")]
    Empty,
}

impl TxType {
    /// All tags, in declaration order.
    pub const ALL: [TxType; 11] = [
        TxType::Patient,
        TxType::Doctor,
        TxType::MedicalRecord,
        TxType::PatientRecord,
        TxType::PatientLastRecord,
        TxType::DoctorRecord,
        TxType::DoctorLastRecord,
        TxType::MedicalRecordDel,
        TxType::MedicalRecordUpdate,
        TxType::PlainText,
        TxType::Empty,
    ];

    /// The stored tag string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Patient => "patient",
            TxType::Doctor => "doctor",
            TxType::MedicalRecord => "medical_record",
            TxType::PatientRecord => "patient_record",
            TxType::PatientLastRecord => "patient_last_record",
            TxType::DoctorRecord => "doctor_record",
            TxType::DoctorLastRecord => "doctor_last_record",
            TxType::MedicalRecordDel => "medical_record_del",
            TxType::MedicalRecordUpdate => "medical_record_update",
            TxType::PlainText => "string",
            TxType::Empty => "none",
        }
    }

    /// Whether this type is a subject-to-record index entry.
    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            TxType::PatientRecord
                | TxType::PatientLastRecord
                | TxType::DoctorRecord
                | TxType::DoctorLastRecord
        )
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        TxType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnsupportedContentType(s.to_string()))
    }
}

/// How a medical record entered the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Add,
    Update,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Add => "add",
            RecordType::Update => "update",
        }
    }
}

/// Role of whoever issued a delete or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorType {
    Doctor,
    Patient,
    Admin,
}

impl OperatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorType::Doctor => "doctor",
            OperatorType::Patient => "patient",
            OperatorType::Admin => "admin",
        }
    }
}

/// Field-level access used by canonical encoding and chain lookups.
///
/// `fields` lists every attribute in declaration order. Values are
/// borrowed where the struct stores text and owned where it stores ids.
pub trait Fields {
    fn fields(&self) -> Vec<(&'static str, Cow<'_, str>)>;

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.fields()
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Patient {
    pub identifier: String,
    pub name: String,
    pub gender: String,
    pub birth_date: String,
    pub phone: String,
}

impl Fields for Patient {
    fn fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("identifier", Cow::Borrowed(self.identifier.as_str())),
            ("name", Cow::Borrowed(self.name.as_str())),
            ("gender", Cow::Borrowed(self.gender.as_str())),
            ("birth_date", Cow::Borrowed(self.birth_date.as_str())),
            ("phone", Cow::Borrowed(self.phone.as_str())),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Doctor {
    pub identifier: String,
    pub name: String,
    pub department: String,
    /// Credential digest checked by the authentication layer.
    pub password_hash: String,
}

impl Fields for Doctor {
    fn fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("identifier", Cow::Borrowed(self.identifier.as_str())),
            ("name", Cow::Borrowed(self.name.as_str())),
            ("department", Cow::Borrowed(self.department.as_str())),
            ("password_hash", Cow::Borrowed(self.password_hash.as_str())),
        ]
    }
}

/// A single visit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MedicalRecord {
    /// `patient_id` followed by `record_time`.
    pub record_id: String,
    pub doctor_id: String,
    pub patient_id: String,
    /// Local time formatted as `YYYYmmddHHMMSS`.
    pub record_time: String,
    pub record_loc: String,
    pub chief_complaint: String,
    pub present_illness_history: String,
    pub past_history: String,
    pub record_type: RecordType,
}

/// Partial changes to the clinical fields of a [`MedicalRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub record_loc: Option<String>,
    pub chief_complaint: Option<String>,
    pub present_illness_history: Option<String>,
    pub past_history: Option<String>,
}

impl MedicalRecord {
    /// Overwrite each field the patch carries with a different value.
    ///
    /// Returns whether anything changed.
    pub fn apply_patch(&mut self, patch: &RecordPatch) -> bool {
        let mut changed = false;
        for (slot, value) in [
            (&mut self.record_loc, &patch.record_loc),
            (&mut self.chief_complaint, &patch.chief_complaint),
            (&mut self.present_illness_history, &patch.present_illness_history),
            (&mut self.past_history, &patch.past_history),
        ] {
            if let Some(value) = value {
                if *slot != *value {
                    slot.clone_from(value);
                    changed = true;
                }
            }
        }
        changed
    }
}

impl Fields for MedicalRecord {
    fn fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("record_id", Cow::Borrowed(self.record_id.as_str())),
            ("doctor_id", Cow::Borrowed(self.doctor_id.as_str())),
            ("patient_id", Cow::Borrowed(self.patient_id.as_str())),
            ("record_time", Cow::Borrowed(self.record_time.as_str())),
            ("record_loc", Cow::Borrowed(self.record_loc.as_str())),
            ("chief_complaint", Cow::Borrowed(self.chief_complaint.as_str())),
            (
                "present_illness_history",
                Cow::Borrowed(self.present_illness_history.as_str()),
            ),
            ("past_history", Cow::Borrowed(self.past_history.as_str())),
            ("record_type", Cow::Borrowed(self.record_type.as_str())),
        ]
    }
}

macro_rules! relation_entry {
    ($(#[$meta:meta])* $name:ident, $subject:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $name {
            pub $subject: String,
            pub record_tx_id: TxId,
        }

        impl Fields for $name {
            fn fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
                vec![
                    (stringify!($subject), Cow::Borrowed(self.$subject.as_str())),
                    ("record_tx_id", Cow::Owned(self.record_tx_id.to_hex())),
                ]
            }
        }
    };
}

relation_entry!(
    /// Index entry linking a patient to one of their records.
    PatientRecord,
    patient_id
);
relation_entry!(
    /// Pointer to a patient's most recent record.
    PatientLastRecord,
    patient_id
);
relation_entry!(
    /// Index entry linking a doctor to a record they wrote.
    DoctorRecord,
    doctor_id
);
relation_entry!(
    /// Pointer to a doctor's most recent record.
    DoctorLastRecord,
    doctor_id
);

/// Tombstone marking a medical record transaction as deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MedicalRecordDel {
    pub tx_id: TxId,
    pub operator_type: OperatorType,
    pub operator_id: String,
    pub patient_id: String,
    pub doctor_id: String,
}

impl Fields for MedicalRecordDel {
    fn fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("tx_id", Cow::Owned(self.tx_id.to_hex())),
            ("operator_type", Cow::Borrowed(self.operator_type.as_str())),
            ("operator_id", Cow::Borrowed(self.operator_id.as_str())),
            ("patient_id", Cow::Borrowed(self.patient_id.as_str())),
            ("doctor_id", Cow::Borrowed(self.doctor_id.as_str())),
        ]
    }
}

/// Supersession link from an old record transaction to its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MedicalRecordUpdate {
    pub old_tx_id: TxId,
    pub new_tx_id: TxId,
    pub operator_type: OperatorType,
    pub operator_id: String,
    pub old_patient_id: String,
    pub old_doctor_id: String,
}

impl Fields for MedicalRecordUpdate {
    fn fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("old_tx_id", Cow::Owned(self.old_tx_id.to_hex())),
            ("new_tx_id", Cow::Owned(self.new_tx_id.to_hex())),
            ("operator_type", Cow::Borrowed(self.operator_type.as_str())),
            ("operator_id", Cow::Borrowed(self.operator_id.as_str())),
            ("old_patient_id", Cow::Borrowed(self.old_patient_id.as_str())),
            ("old_doctor_id", Cow::Borrowed(self.old_doctor_id.as_str())),
        ]
    }
}

/// The closed set of things a transaction can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tx_type", content = "content", rename_all = "snake_case")]
pub enum Content {
    Patient(Patient),
    Doctor(Doctor),
    MedicalRecord(MedicalRecord),
    PatientRecord(PatientRecord),
    PatientLastRecord(PatientLastRecord),
    DoctorRecord(DoctorRecord),
    DoctorLastRecord(DoctorLastRecord),
    MedicalRecordDel(MedicalRecordDel),
    MedicalRecordUpdate(MedicalRecordUpdate),
    #[serde(rename = "string")]
    PlainText(String),
    /// The null content. Never signed.
    #[serde(rename = "none")]
    Empty,
}

impl Content {
    /// Parse untyped content under its tag.
    ///
    /// Unknown tags fail with `UnsupportedContentType`. A JSON null, a
    /// `none` tag, or fields that do not fit the variant fail with
    /// `InvalidContent`.
    pub fn from_tagged(tag: &str, value: serde_json::Value) -> Result<Self> {
        let tx_type: TxType = tag.parse()?;
        if value.is_null() {
            return Err(CoreError::InvalidContent(format!("{} content is null", tag)));
        }

        let content = match tx_type {
            TxType::Patient => Content::Patient(parse(value)?),
            TxType::Doctor => Content::Doctor(parse(value)?),
            TxType::MedicalRecord => Content::MedicalRecord(parse(value)?),
            TxType::PatientRecord => Content::PatientRecord(parse(value)?),
            TxType::PatientLastRecord => Content::PatientLastRecord(parse(value)?),
            TxType::DoctorRecord => Content::DoctorRecord(parse(value)?),
            TxType::DoctorLastRecord => Content::DoctorLastRecord(parse(value)?),
            TxType::MedicalRecordDel => Content::MedicalRecordDel(parse(value)?),
            TxType::MedicalRecordUpdate => Content::MedicalRecordUpdate(parse(value)?),
            TxType::PlainText => match value {
                serde_json::Value::String(text) => Content::PlainText(text),
                other => {
                    return Err(CoreError::InvalidContent(format!(
                        "string content must be text, got {}",
                        other
                    )))
                }
            },
            TxType::Empty => {
                return Err(CoreError::InvalidContent(
                    "none content carries no value".into(),
                ))
            }
        };
        Ok(content)
    }

    /// The variant tag.
    pub fn tx_type(&self) -> TxType {
        match self {
            Content::Patient(_) => TxType::Patient,
            Content::Doctor(_) => TxType::Doctor,
            Content::MedicalRecord(_) => TxType::MedicalRecord,
            Content::PatientRecord(_) => TxType::PatientRecord,
            Content::PatientLastRecord(_) => TxType::PatientLastRecord,
            Content::DoctorRecord(_) => TxType::DoctorRecord,
            Content::DoctorLastRecord(_) => TxType::DoctorLastRecord,
            Content::MedicalRecordDel(_) => TxType::MedicalRecordDel,
            Content::MedicalRecordUpdate(_) => TxType::MedicalRecordUpdate,
            Content::PlainText(_) => TxType::PlainText,
            Content::Empty => TxType::Empty,
        }
    }

    /// Attributes of structured content. Empty for text and the null content.
    pub fn fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        match self {
            Content::Patient(c) => c.fields(),
            Content::Doctor(c) => c.fields(),
            Content::MedicalRecord(c) => c.fields(),
            Content::PatientRecord(c) => c.fields(),
            Content::PatientLastRecord(c) => c.fields(),
            Content::DoctorRecord(c) => c.fields(),
            Content::DoctorLastRecord(c) => c.fields(),
            Content::MedicalRecordDel(c) => c.fields(),
            Content::MedicalRecordUpdate(c) => c.fields(),
            Content::PlainText(_) | Content::Empty => Vec::new(),
        }
    }

    /// Look up one attribute by name.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.fields()
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Whether `name` exists and equals `value`.
    pub fn field_equals(&self, name: &str, value: &str) -> bool {
        self.field(name).as_deref() == Some(value)
    }

    /// The record a relation index entry points at.
    pub fn record_pointer(&self) -> Option<TxId> {
        match self {
            Content::PatientRecord(c) => Some(c.record_tx_id),
            Content::PatientLastRecord(c) => Some(c.record_tx_id),
            Content::DoctorRecord(c) => Some(c.record_tx_id),
            Content::DoctorLastRecord(c) => Some(c.record_tx_id),
            _ => None,
        }
    }

    pub fn as_medical_record(&self) -> Option<&MedicalRecord> {
        match self {
            Content::MedicalRecord(record) => Some(record),
            _ => None,
        }
    }
}

fn parse<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CoreError::InvalidContent(e.to_string()))
}

macro_rules! content_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Content {
                fn from(c: $variant) -> Self {
                    Content::$variant(c)
                }
            }
        )*
    };
}

content_from!(
    Patient,
    Doctor,
    MedicalRecord,
    PatientRecord,
    PatientLastRecord,
    DoctorRecord,
    DoctorLastRecord,
    MedicalRecordDel,
    MedicalRecordUpdate,
);

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::PlainText(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::PlainText(text.to_string())
    }
}
