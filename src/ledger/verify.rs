//! Chain Verification
//!
//! Walks a chain from index 0 and checks every record's position, content
//! hash, signature and linkage. Violations are findings, not errors.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::ledger::auth::Authenticator;
use crate::ledger::record::{Record, SENTINEL_HASH};

/// A single broken invariant, located by chain position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Stored index disagrees with the record's position
    IndexMismatch { index: usize, found: u64 },
    HashMismatch { index: usize },
    SignatureMismatch { index: usize },
    /// Sentinel missing at 0, or predecessor hash not matched
    PrevHashMismatch { index: usize },
}

impl Violation {
    pub fn index(&self) -> usize {
        match self {
            Violation::IndexMismatch { index, .. }
            | Violation::HashMismatch { index }
            | Violation::SignatureMismatch { index }
            | Violation::PrevHashMismatch { index } => *index,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::IndexMismatch { index, .. } => write!(f, "index mismatch at {}", index),
            Violation::HashMismatch { index } => write!(f, "hash mismatch at {}", index),
            Violation::SignatureMismatch { index } => write!(f, "signature mismatch at {}", index),
            Violation::PrevHashMismatch { index } => write!(f, "prev_hash mismatch at {}", index),
        }
    }
}

/// Outcome of a full-chain verification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub entry_count: usize,
    pub violation: Option<Violation>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.violation.is_none()
    }

    /// `"ok"`, or the first violation, e.g. `"hash mismatch at 0"`
    pub fn message(&self) -> String {
        match &self.violation {
            None => "ok".to_string(),
            Some(violation) => violation.to_string(),
        }
    }

    pub fn as_tuple(&self) -> (bool, String) {
        (self.is_valid(), self.message())
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        if self.is_valid() {
            format!("✅ Chain is valid ({} entries)", self.entry_count)
        } else {
            format!(
                "❌ Chain is invalid ({} entries): {}",
                self.entry_count,
                self.message()
            )
        }
    }
}

/// Check one record against its position and predecessor; first failure wins
fn check_record(
    position: usize,
    record: &Record,
    prev: Option<&Record>,
    auth: &Authenticator,
) -> Option<Violation> {
    if record.index != position as u64 {
        return Some(Violation::IndexMismatch {
            index: position,
            found: record.index,
        });
    }

    if !record.verify_hash() {
        return Some(Violation::HashMismatch { index: position });
    }

    if !auth.verify(&record.hash, &record.signature) {
        return Some(Violation::SignatureMismatch { index: position });
    }

    let expected_prev = prev.map(|p| p.hash.as_str()).unwrap_or(SENTINEL_HASH);
    if record.prev_hash != expected_prev {
        return Some(Violation::PrevHashMismatch { index: position });
    }

    None
}

/// Verify a chain, stopping at the first violation
pub fn verify_chain(records: &[Record], auth: &Authenticator) -> VerificationReport {
    let mut prev = None;
    for (position, record) in records.iter().enumerate() {
        if let Some(violation) = check_record(position, record, prev, auth) {
            warn!("Chain verification failed: {}", violation);
            return VerificationReport {
                entry_count: records.len(),
                violation: Some(violation),
            };
        }
        prev = Some(record);
    }

    info!("Chain verification successful: {} entries", records.len());
    VerificationReport {
        entry_count: records.len(),
        violation: None,
    }
}

/// Every violation in the chain, at most one per record
pub fn find_violations(records: &[Record], auth: &Authenticator) -> Vec<Violation> {
    let violations: Vec<Violation> = records
        .iter()
        .enumerate()
        .filter_map(|(position, record)| {
            let prev = position.checked_sub(1).map(|p| &records[p]);
            check_record(position, record, prev, auth)
        })
        .collect();

    debug!(
        "Scanned {} entries, {} violation(s)",
        records.len(),
        violations.len()
    );
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::auth::SecretKey;
    use serde_json::{json, Number, Value};

    fn auth(key: &str) -> Authenticator {
        Authenticator::new(SecretKey::new(key.as_bytes().to_vec()).unwrap()).unwrap()
    }

    fn chain(auth: &Authenticator, len: usize) -> Vec<Record> {
        let mut records: Vec<Record> = Vec::new();
        for i in 0..len {
            let prev_hash = records
                .last()
                .map(|r| r.hash.clone())
                .unwrap_or_else(|| SENTINEL_HASH.to_string());
            let data = match json!({"resident_id": format!("r{}", i), "success": true}) {
                Value::Object(map) => map,
                _ => unreachable!(),
            };
            let timestamp = Number::from_f64(1000.0 + i as f64).unwrap();
            records.push(Record::build(i as u64, prev_hash, data, timestamp, auth));
        }
        records
    }

    #[test]
    fn test_valid_chain() {
        let auth = auth("k");
        let records = chain(&auth, 4);
        let report = verify_chain(&records, &auth);
        assert_eq!(report.as_tuple(), (true, "ok".to_string()));
        assert_eq!(report.entry_count, 4);
        assert!(report.summary().contains("✅"));
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let report = verify_chain(&[], &auth("k"));
        assert!(report.is_valid());
        assert_eq!(report.entry_count, 0);
    }

    #[test]
    fn test_tampered_payload_detected_at_index() {
        let auth = auth("k");
        let mut records = chain(&auth, 3);
        records[1].data.insert("success".to_string(), json!(false));

        let report = verify_chain(&records, &auth);
        assert_eq!(report.violation, Some(Violation::HashMismatch { index: 1 }));
        assert_eq!(report.message(), "hash mismatch at 1");
    }

    #[test]
    fn test_tampered_timestamp_and_prev_hash() {
        let auth = auth("k");

        let mut records = chain(&auth, 3);
        records[2].timestamp = Number::from_f64(1003.0).unwrap();
        assert_eq!(
            verify_chain(&records, &auth).violation,
            Some(Violation::HashMismatch { index: 2 })
        );

        let mut records = chain(&auth, 3);
        records[0].prev_hash = "f".repeat(64);
        assert_eq!(
            verify_chain(&records, &auth).violation,
            Some(Violation::HashMismatch { index: 0 })
        );
    }

    #[test]
    fn test_rehashed_record_without_key_fails_signature() {
        let auth_key = auth("k");
        let mut records = chain(&auth_key, 2);
        records[0].data.insert("success".to_string(), json!(false));
        records[0].hash = records[0].calculate_hash();

        let report = verify_chain(&records, &auth_key);
        assert_eq!(report.violation, Some(Violation::SignatureMismatch { index: 0 }));
    }

    #[test]
    fn test_rehashed_and_resigned_record_breaks_linkage() {
        let auth = auth("k");
        let mut records = chain(&auth, 3);
        records[1].data.insert("success".to_string(), json!(false));
        records[1].hash = records[1].calculate_hash();
        records[1].signature = auth.sign(&records[1].hash);

        let report = verify_chain(&records, &auth);
        assert_eq!(report.violation, Some(Violation::PrevHashMismatch { index: 2 }));
    }

    #[test]
    fn test_genesis_must_carry_sentinel() {
        let auth = auth("k");
        let data = match json!({"n": 0}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let records = vec![Record::build(0, "ab".repeat(32), data, Number::from_f64(1.0).unwrap(), &auth)];
        assert_eq!(
            verify_chain(&records, &auth).violation,
            Some(Violation::PrevHashMismatch { index: 0 })
        );
    }

    #[test]
    fn test_reordered_records_fail_on_index() {
        let auth = auth("k");
        let mut records = chain(&auth, 3);
        records.swap(1, 2);
        assert_eq!(
            verify_chain(&records, &auth).violation,
            Some(Violation::IndexMismatch { index: 1, found: 2 })
        );
    }

    #[test]
    fn test_wrong_key_fails_every_signature() {
        let records = chain(&auth("right"), 3);
        let wrong = auth("wrong");

        assert_eq!(
            verify_chain(&records, &wrong).message(),
            "signature mismatch at 0"
        );
        let all = find_violations(&records, &wrong);
        assert_eq!(all.len(), 3);
        assert!(all
            .iter()
            .all(|v| matches!(v, Violation::SignatureMismatch { .. })));
    }

    #[test]
    fn test_find_violations_continues_past_first() {
        let auth = auth("k");
        let mut records = chain(&auth, 5);
        records[1].timestamp = Number::from(0);
        records[3].signature = "00".repeat(32);

        let indices: Vec<usize> = find_violations(&records, &auth)
            .iter()
            .map(Violation::index)
            .collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_verification_is_idempotent() {
        let auth = auth("k");
        let records = chain(&auth, 3);
        let first = verify_chain(&records, &auth);
        let second = verify_chain(&records, &auth);
        assert_eq!(first, second);
    }
}
