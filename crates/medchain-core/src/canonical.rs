//! Canonical encoding of transaction content.
//!
//! The signed message for a transaction is a deterministic encoding of its
//! content:
//! - Plain text is signed as its UTF-8 bytes, unchanged.
//! - Structured content is a CBOR map of text keys to text values, using
//!   RFC 8949 core deterministic rules (keys sorted by encoded bytes,
//!   shortest-form lengths, definite lengths only).
//!
//! Two equal contents always produce identical bytes, so a stored
//! transaction can be re-verified long after the signing key is gone.

use std::borrow::Cow;

use crate::content::Content;

/// Encode content to the exact bytes that get signed.
pub fn canonical_bytes(content: &Content) -> Vec<u8> {
    match content {
        Content::PlainText(text) => text.as_bytes().to_vec(),
        Content::Empty => Vec::new(),
        structured => encode_text_map(&structured.fields()),
    }
}

/// Encode a text-to-text map canonically (major type 5).
fn encode_text_map(entries: &[(&'static str, Cow<'_, str>)]) -> Vec<u8> {
    // Encode all keys first to sort by encoded bytes
    let mut pairs: Vec<(Vec<u8>, &str)> = entries
        .iter()
        .map(|(key, value)| {
            let mut key_buf = Vec::with_capacity(key.len() + 1);
            encode_text(&mut key_buf, key);
            (key_buf, &**value)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut buf = Vec::new();
    encode_uint(&mut buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_text(&mut buf, value);
    }
    buf
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{MedicalRecord, PatientRecord, RecordType};
    use crate::types::TxId;
    use ciborium::value::Value;

    fn record(chief_complaint: &str) -> Content {
        Content::MedicalRecord(MedicalRecord {
            record_id: "10120171026170032".into(),
            doctor_id: "001".into(),
            patient_id: "101".into(),
            record_time: "20171026170032".into(),
            record_loc: "ward 2".into(),
            chief_complaint: chief_complaint.into(),
            present_illness_history: "".into(),
            past_history: "".into(),
            record_type: RecordType::Add,
        })
    }

    #[test]
    fn test_plain_text_is_verbatim() {
        assert_eq!(canonical_bytes(&Content::from("héllo")), "héllo".as_bytes());
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(canonical_bytes(&record("cough")), canonical_bytes(&record("cough")));
        assert_ne!(canonical_bytes(&record("cough")), canonical_bytes(&record("fever")));
    }

    #[test]
    fn test_is_valid_cbor_with_sorted_keys() {
        let content = Content::PatientRecord(PatientRecord {
            patient_id: "101".into(),
            record_tx_id: TxId::from_bytes([1; 32]),
        });
        let bytes = canonical_bytes(&content);
        let value: Value = ciborium::from_reader(bytes.as_slice()).unwrap();

        let Value::Map(entries) = value else {
            panic!("expected map");
        };
        let keys: Vec<String> = entries
            .iter()
            .map(|(k, _)| k.as_text().unwrap().to_string())
            .collect();
        // Encoded-byte order puts shorter keys first
        assert_eq!(keys, vec!["patient_id", "record_tx_id"]);
        assert_eq!(entries[1].1.as_text().unwrap(), TxId::from_bytes([1; 32]).to_hex());
    }

    #[test]
    fn test_long_values_use_wide_lengths() {
        let long = "x".repeat(300);
        let bytes = canonical_bytes(&record(&long));
        let value: Value = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert!(value.is_map());
    }
}
