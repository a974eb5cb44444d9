//! Relation index resolution.
//!
//! A subject's current records are never stored as such. They are
//! recomputed by replaying the chain from the tip: index entries name
//! candidate records, tombstones and supersessions take them back out.
//!
//! One scan feeds three accumulators, and the [`QueryMode`] decides which
//! of them are gathered and how they are combined:
//!
//! | mode      | live | tombstones | supersessions | result                          |
//! |-----------|------|------------|---------------|---------------------------------|
//! | `Normal`  | yes  | yes        | yes           | live minus deleted and replaced |
//! | `All`     | yes  |            |               | raw live candidates             |
//! | `Deleted` |      | yes        |               | deleted targets and tombstones  |
//! | `Updated` | yes  |            | yes           | fails with `UnsupportedMode`    |
//!
//! `Updated` is a recognized mode that scans but has no resolution: the
//! query fails after the scan, never with a partial result.

use std::fmt;
use std::str::FromStr;

use medchain_core::{BlockId, Content, TxId, TxType};
use medchain_store::Store;
use tracing::{debug, trace, warn};

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;

/// Which view of a subject's records to compute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum QueryMode {
    /// Records still live: neither deleted nor replaced.
    #[default]
    Normal,
    /// Every record ever indexed for the subject.
    All,
    /// Deleted records and the tombstones that deleted them.
    Deleted,
    /// Gathers supersessions but has no resolution; resolving it fails.
    Updated,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Normal => "normal",
            QueryMode::All => "all",
            QueryMode::Deleted => "deleted",
            QueryMode::Updated => "updated",
        }
    }

    fn gathers_live(&self) -> bool {
        !matches!(self, QueryMode::Deleted)
    }

    fn gathers_tombstones(&self) -> bool {
        matches!(self, QueryMode::Normal | QueryMode::Deleted)
    }

    fn gathers_supersessions(&self) -> bool {
        matches!(self, QueryMode::Normal | QueryMode::Updated)
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(QueryMode::Normal),
            "all" => Ok(QueryMode::All),
            "deleted" => Ok(QueryMode::Deleted),
            "updated" => Ok(QueryMode::Updated),
            _ => Err(LedgerError::UnsupportedMode(s.to_string())),
        }
    }
}

/// A relation query: whose records, through which index, in which mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationQuery<'a> {
    /// The subject, for example a patient id.
    pub identifier: &'a str,
    /// Field holding the subject id on index entries and tombstones.
    /// Supersessions are matched on `old_<id_field>`.
    pub id_field: &'a str,
    /// Index entry type to collect.
    pub relation: TxType,
    pub mode: QueryMode,
}

impl<'a> RelationQuery<'a> {
    pub fn new(identifier: &'a str, id_field: &'a str, relation: TxType, mode: QueryMode) -> Self {
        Self {
            identifier,
            id_field,
            relation,
            mode,
        }
    }

    /// Records indexed under a patient.
    pub fn by_patient(patient_id: &'a str, mode: QueryMode) -> Self {
        Self::new(patient_id, "patient_id", TxType::PatientRecord, mode)
    }

    /// Records indexed under a doctor.
    pub fn by_doctor(doctor_id: &'a str, mode: QueryMode) -> Self {
        Self::new(doctor_id, "doctor_id", TxType::DoctorRecord, mode)
    }
}

/// Result of a relation query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationView {
    /// Record transaction ids, newest first.
    Live(Vec<TxId>),
    /// Deleted record ids, paired by position with the tombstones.
    Deleted {
        targets: Vec<TxId>,
        tombstones: Vec<TxId>,
    },
}

impl RelationView {
    /// The record ids, when this is a live view.
    pub fn as_live(&self) -> Option<&[TxId]> {
        match self {
            RelationView::Live(ids) => Some(ids),
            _ => None,
        }
    }
}

/// Accumulators filled by one tip-to-genesis scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationScan {
    pub live: Vec<TxId>,
    pub tombstone_targets: Vec<TxId>,
    pub tombstones: Vec<TxId>,
    pub superseded: Vec<TxId>,
    pub supersessions: Vec<TxId>,
}

impl RelationScan {
    /// Classify one transaction into the accumulators the mode gathers.
    pub fn observe(&mut self, query: &RelationQuery<'_>, tx_id: TxId, content: &Content) {
        match content {
            Content::MedicalRecordDel(del) => {
                if query.mode.gathers_tombstones()
                    && content.field_equals(query.id_field, query.identifier)
                {
                    self.tombstone_targets.push(del.tx_id);
                    self.tombstones.push(tx_id);
                }
            }
            Content::MedicalRecordUpdate(update) => {
                if query.mode.gathers_supersessions() && matches_old_field(query, content) {
                    self.superseded.push(update.old_tx_id);
                    self.supersessions.push(tx_id);
                }
            }
            _ => {
                if query.mode.gathers_live()
                    && content.tx_type() == query.relation
                    && content.field_equals(query.id_field, query.identifier)
                {
                    if let Some(record) = content.record_pointer() {
                        self.live.push(record);
                    }
                }
            }
        }
    }

    /// Combine the accumulators into the view the mode asks for.
    ///
    /// `Updated` has no view and fails with `UnsupportedMode`.
    pub fn resolve(self, mode: QueryMode) -> Result<RelationView> {
        match mode {
            QueryMode::Normal => {
                let mut live = self.live;
                for id in &self.tombstone_targets {
                    remove_one(&mut live, id, "deleted")?;
                }
                for id in &self.superseded {
                    remove_one(&mut live, id, "superseded")?;
                }
                Ok(RelationView::Live(live))
            }
            QueryMode::All => Ok(RelationView::Live(self.live)),
            QueryMode::Deleted => Ok(RelationView::Deleted {
                targets: self.tombstone_targets,
                tombstones: self.tombstones,
            }),
            QueryMode::Updated => Err(LedgerError::UnsupportedMode(mode.to_string())),
        }
    }
}

fn matches_old_field(query: &RelationQuery<'_>, content: &Content) -> bool {
    content.fields().into_iter().any(|(name, value)| {
        name.strip_prefix("old_") == Some(query.id_field) && value == query.identifier
    })
}

fn remove_one(live: &mut Vec<TxId>, id: &TxId, context: &str) -> Result<()> {
    match live.iter().position(|candidate| candidate == id) {
        Some(index) => {
            live.remove(index);
            Ok(())
        }
        None => Err(LedgerError::InvariantViolation {
            id: *id,
            context: format!("{} record was never live", context),
        }),
    }
}

impl<S: Store> Ledger<S> {
    /// Resolve a relation query by replaying the chain from the tip.
    pub async fn resolve(&self, query: &RelationQuery<'_>) -> Result<RelationView> {
        if !query.relation.is_relation() {
            return Err(LedgerError::UnsupportedRelation(query.relation));
        }

        let tip = self.require_tip().await?;
        if let Some(view) = self.cache.as_ref().and_then(|c| c.get(&tip, query)) {
            debug!(identifier = query.identifier, mode = %query.mode, %tip, "relation cache hit");
            return Ok(view);
        }

        let scan = self.scan_relation(tip, query).await?;
        let view = scan.resolve(query.mode).map_err(|err| {
            if let LedgerError::InvariantViolation { id, context } = &err {
                warn!(identifier = query.identifier, %id, context, "relation filtering failed");
            }
            err
        })?;

        if let Some(cache) = &self.cache {
            cache.insert(tip, query, view.clone());
        }
        Ok(view)
    }

    pub(crate) async fn scan_relation(
        &self,
        tip: BlockId,
        query: &RelationQuery<'_>,
    ) -> Result<RelationScan> {
        let mut scan = RelationScan::default();
        let mut walker = self.walk_from(tip);

        while let Some(block) = walker.next_block().await? {
            for tx_id in &block.tx_list {
                let tx = self.load_transaction(tx_id).await?;
                trace!(tx = %tx.id, tx_type = %tx.tx_type(), "relation scan");
                scan.observe(query, tx.id, &tx.content);
            }
        }

        debug!(
            identifier = query.identifier,
            relation = %query.relation,
            mode = %query.mode,
            live = scan.live.len(),
            tombstones = scan.tombstones.len(),
            supersessions = scan.supersessions.len(),
            "relation scan complete"
        );
        Ok(scan)
    }
}
