//! Record content hashing

use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use crate::ledger::canonical;

/// Canonical form of the hashed record fields, keys already in sorted order
pub fn canonical_record(
    index: u64,
    timestamp: &Number,
    data: &Map<String, Value>,
    prev_hash: &str,
) -> String {
    let mut out = String::from("{\"data\": ");
    canonical::write_object(&mut out, data);
    out.push_str(&format!(", \"index\": {}, \"prev_hash\": ", index));
    canonical::write_value(&mut out, &Value::String(prev_hash.to_string()));
    out.push_str(", \"timestamp\": ");
    canonical::write_number(&mut out, timestamp);
    out.push('}');
    out
}

/// SHA-256 over the canonical record, hex encoded
pub fn content_hash(
    index: u64,
    timestamp: &Number,
    data: &Map<String, Value>,
    prev_hash: &str,
) -> String {
    let canonical = canonical_record(index, timestamp, data, prev_hash);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
