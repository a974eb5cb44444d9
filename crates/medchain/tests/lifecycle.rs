//! End-to-end record lifecycle: add, find, delete, update.

use medchain::core::{Content, RecordPatch, TxType};
use medchain::store::{MemoryStore, Store};
use medchain::{
    Ledger, LedgerConfig, LedgerError, NewRecord, Operator, QueryMode, RelationQuery,
    RelationView, StoredContent,
};

fn new_record(patient_id: &str, doctor_id: &str) -> NewRecord {
    NewRecord {
        patient_id: patient_id.into(),
        doctor_id: doctor_id.into(),
        record_loc: "outpatient 3".into(),
        chief_complaint: "cough".into(),
        present_illness_history: "three days".into(),
        past_history: "none".into(),
    }
}

async fn ledger() -> Ledger<MemoryStore> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Ledger::new(MemoryStore::new(), LedgerConfig::default())
}

#[tokio::test]
async fn test_add_find_delete_scenario() {
    let ledger = ledger().await;

    // init creates genesis G
    let g = ledger.init().await.unwrap();
    assert_eq!(ledger.tip().await.unwrap(), Some(g));
    let genesis = ledger.store().get_block(&g).await.unwrap().unwrap();
    assert_eq!(genesis.pre_id.to_hex(), "0".repeat(64));

    // addRecord creates B1 with three transactions on top of G
    let added = ledger.add_record(new_record("101", "001")).await.unwrap();
    let b1 = ledger.store().get_block(&added.block_id).await.unwrap().unwrap();
    assert_eq!(b1.tx_list.len(), 3);
    assert_eq!(b1.pre_id, g);
    assert_eq!(ledger.tip().await.unwrap(), Some(added.block_id));

    let live = ledger
        .find_by_doctor_id("001", QueryMode::Normal)
        .await
        .unwrap();
    assert_eq!(live, RelationView::Live(vec![added.tx_id]));

    // deleteRecord creates B2 with one tombstone
    let deleted = ledger
        .delete_record(&added.tx_id, &Operator::doctor("001"))
        .await
        .unwrap();
    let b2 = ledger
        .store()
        .get_block(&deleted.block_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(b2.tx_list, vec![deleted.tx_id]);
    assert_eq!(b2.pre_id, added.block_id);
    assert_eq!(ledger.tip().await.unwrap(), Some(deleted.block_id));

    let live = ledger
        .find_by_doctor_id("001", QueryMode::Normal)
        .await
        .unwrap();
    assert_eq!(live, RelationView::Live(vec![]));

    let gone = ledger
        .find_by_doctor_id("001", QueryMode::Deleted)
        .await
        .unwrap();
    assert_eq!(
        gone,
        RelationView::Deleted {
            targets: vec![added.tx_id],
            tombstones: vec![deleted.tx_id],
        }
    );

    // ALL still reports the record
    let all = ledger.find_by_patient_id("101", QueryMode::All).await.unwrap();
    assert_eq!(all, RelationView::Live(vec![added.tx_id]));
}

#[tokio::test]
async fn test_update_replaces_record() {
    let ledger = ledger().await;
    ledger.init().await.unwrap();

    let first = ledger.add_record(new_record("101", "001")).await.unwrap();
    let other = ledger.add_record(new_record("102", "001")).await.unwrap();

    let old: StoredContent = ledger.transaction(&first.tx_id).await.unwrap().into();
    let mut new = old.content.as_medical_record().unwrap().clone();
    assert!(new.apply_patch(&RecordPatch {
        chief_complaint: Some("fever".into()),
        ..Default::default()
    }));

    let updated = ledger
        .update_record(&old, new, &Operator::doctor("001"))
        .await
        .unwrap();
    let block = ledger
        .store()
        .get_block(&updated.block_id)
        .await
        .unwrap()
        .unwrap();
    let types: Vec<TxType> = ledger
        .block_transactions(&block)
        .await
        .unwrap()
        .iter()
        .map(|tx| tx.tx_type())
        .collect();
    assert_eq!(
        types,
        vec![
            TxType::MedicalRecord,
            TxType::PatientRecord,
            TxType::DoctorRecord,
            TxType::MedicalRecordUpdate,
        ]
    );

    // Newest first: the replacement, then the untouched record
    let live = ledger
        .find_by_doctor_id("001", QueryMode::Normal)
        .await
        .unwrap();
    assert_eq!(live, RelationView::Live(vec![updated.tx_id, other.tx_id]));

    let patient = ledger
        .find_by_patient_id("101", QueryMode::Normal)
        .await
        .unwrap();
    assert_eq!(patient, RelationView::Live(vec![updated.tx_id]));

    // The supersession links the replaced record to its replacement
    let link = ledger.transaction(&block.tx_list[3]).await.unwrap();
    match link.content {
        Content::MedicalRecordUpdate(update) => {
            assert_eq!(update.old_tx_id, first.tx_id);
            assert_eq!(update.new_tx_id, updated.tx_id);
        }
        other => panic!("expected supersession, got {:?}", other),
    }
}

#[tokio::test]
async fn test_updated_mode_fails_after_scan() {
    let ledger = ledger().await;
    ledger.init().await.unwrap();

    let first = ledger.add_record(new_record("101", "001")).await.unwrap();
    let old: StoredContent = ledger.transaction(&first.tx_id).await.unwrap().into();
    let new = old.content.as_medical_record().unwrap().clone();
    ledger
        .update_record(&old, new, &Operator::doctor("001"))
        .await
        .unwrap();

    // Fails whether or not the subject has supersessions on the chain
    for subject in ["101", "999"] {
        let err = ledger
            .find_by_patient_id(subject, QueryMode::Updated)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnsupportedMode(m) if m == "updated"));
    }
    let err = ledger
        .find_by_doctor_id("001", QueryMode::Updated)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnsupportedMode(_)));

    // A recognized mode, so parsing still succeeds
    assert_eq!("UPDATED".parse::<QueryMode>().unwrap(), QueryMode::Updated);
}

#[tokio::test]
async fn test_deleting_superseded_record_breaks_normal_view() {
    let ledger = ledger().await;
    ledger.init().await.unwrap();

    let first = ledger.add_record(new_record("101", "001")).await.unwrap();
    let old: StoredContent = ledger.transaction(&first.tx_id).await.unwrap().into();
    let new = old.content.as_medical_record().unwrap().clone();
    ledger
        .update_record(&old, new, &Operator::doctor("001"))
        .await
        .unwrap();

    // The old record is already superseded; deleting it too means two
    // removals of one live entry
    ledger
        .delete_record(&first.tx_id, &Operator::admin("root"))
        .await
        .unwrap();

    let err = ledger
        .find_by_patient_id("101", QueryMode::Normal)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvariantViolation { id, .. } if id == first.tx_id));

    // Other modes still answer
    assert!(ledger
        .find_by_patient_id("101", QueryMode::All)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_deleted_without_tombstones_is_empty() {
    let ledger = ledger().await;
    ledger.init().await.unwrap();
    ledger.add_record(new_record("101", "001")).await.unwrap();

    let view = ledger
        .find_by_patient_id("101", QueryMode::Deleted)
        .await
        .unwrap();
    assert_eq!(
        view,
        RelationView::Deleted {
            targets: vec![],
            tombstones: vec![],
        }
    );
}

#[tokio::test]
async fn test_subjects_are_isolated() {
    let ledger = ledger().await;
    ledger.init().await.unwrap();

    let a = ledger.add_record(new_record("101", "001")).await.unwrap();
    let b = ledger.add_record(new_record("102", "002")).await.unwrap();
    ledger
        .delete_record(&b.tx_id, &Operator::patient("102"))
        .await
        .unwrap();

    let view = ledger
        .find_by_patient_id("101", QueryMode::Normal)
        .await
        .unwrap();
    assert_eq!(view, RelationView::Live(vec![a.tx_id]));
    let view = ledger
        .find_by_doctor_id("002", QueryMode::Normal)
        .await
        .unwrap();
    assert_eq!(view, RelationView::Live(vec![]));
    let view = ledger
        .find_by_doctor_id("001", QueryMode::Deleted)
        .await
        .unwrap();
    assert_eq!(
        view,
        RelationView::Deleted {
            targets: vec![],
            tombstones: vec![],
        }
    );
}

#[tokio::test]
async fn test_deleted_records_by_doctor() {
    let ledger = ledger().await;
    ledger.init().await.unwrap();

    let a = ledger.add_record(new_record("101", "001")).await.unwrap();
    let b = ledger.add_record(new_record("102", "001")).await.unwrap();
    let del_a = ledger
        .delete_record(&a.tx_id, &Operator::doctor("001"))
        .await
        .unwrap();
    let del_b = ledger
        .delete_record(&b.tx_id, &Operator::doctor("001"))
        .await
        .unwrap();

    assert!(ledger.deleted_records_by_doctor("002").await.unwrap().is_empty());

    let deleted = ledger.deleted_records_by_doctor("001").await.unwrap();
    let pairs: Vec<_> = deleted
        .iter()
        .map(|d| (d.record.tx_id, d.tombstone.tx_id))
        .collect();
    assert_eq!(pairs, vec![(b.tx_id, del_b.tx_id), (a.tx_id, del_a.tx_id)]);

    let record = deleted[1].record.content.as_medical_record().unwrap();
    assert_eq!(record.patient_id, "101");
    assert!(matches!(deleted[1].tombstone.content, Content::MedicalRecordDel(_)));
}

#[tokio::test]
async fn test_query_errors() {
    let ledger = ledger().await;

    // Reads before init
    let err = ledger
        .find_by_patient_id("101", QueryMode::Normal)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotInitialized));
    let err = ledger.deleted_records_by_doctor("001").await.unwrap_err();
    assert!(matches!(err, LedgerError::NotInitialized));

    ledger.init().await.unwrap();

    let err = "latest".parse::<QueryMode>().unwrap_err();
    assert!(matches!(err, LedgerError::UnsupportedMode(_)));

    let query = RelationQuery::new("101", "patient_id", TxType::MedicalRecord, QueryMode::All);
    let err = ledger.resolve(&query).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::UnsupportedRelation(TxType::MedicalRecord)
    ));

    let err = ledger
        .delete_record(&medchain::TxId::from_bytes([4; 32]), &Operator::admin("root"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn test_last_record_index_is_queryable() {
    use medchain::core::PatientLastRecord;

    let ledger = ledger().await;
    ledger.init().await.unwrap();
    let added = ledger.add_record(new_record("101", "001")).await.unwrap();

    let pointer = ledger
        .sign(PatientLastRecord {
            patient_id: "101".into(),
            record_tx_id: added.tx_id,
        })
        .unwrap();
    ledger.append(&[pointer]).await.unwrap();

    let query = RelationQuery::new(
        "101",
        "patient_id",
        TxType::PatientLastRecord,
        QueryMode::All,
    );
    let view = ledger.resolve(&query).await.unwrap();
    assert_eq!(view, RelationView::Live(vec![added.tx_id]));
}

#[tokio::test]
async fn test_fixed_key_rejects_repeated_record() {
    use medchain::{KeyPolicy, Keypair};

    let ledger = Ledger::new(
        MemoryStore::new(),
        LedgerConfig {
            key_policy: KeyPolicy::Fixed(Keypair::from_seed(&[1; 32])),
            ..Default::default()
        },
    );
    ledger.init().await.unwrap();

    let added = ledger
        .add_record_at(new_record("101", "001"), "20240101080000")
        .await
        .unwrap();
    let tip = ledger.tip().await.unwrap();

    // Same key, same content: same id, so the second add is refused whole
    let err = ledger
        .add_record_at(new_record("101", "001"), "20240101080000")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateTransaction(id) if id == added.tx_id));
    assert_eq!(ledger.tip().await.unwrap(), tip);
    assert_eq!(ledger.store().transaction_count().await.unwrap(), 3);

    ledger
        .delete_record(&added.tx_id, &Operator::doctor("001"))
        .await
        .unwrap();
    let live = ledger
        .find_by_patient_id("101", QueryMode::Normal)
        .await
        .unwrap();
    assert_eq!(live, RelationView::Live(vec![]));

    // A different visit time is a different record
    ledger
        .add_record_at(new_record("101", "001"), "20240101090000")
        .await
        .unwrap();
}
