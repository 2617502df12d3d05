//! Ledger Record
//!
//! One hash-linked, signed scan event. Records are built only by the
//! ledger's append path and never change afterwards.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{LedgerError, Result};
use crate::ledger::auth::Authenticator;
use crate::ledger::hasher;

/// `prev_hash` of the first record: 64 zero hex digits
pub const SENTINEL_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Caller-defined event fields, e.g. resident id, scan mode and outcome
pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub index: u64,
    /// Seconds since the Unix epoch, integer or fractional as written
    pub timestamp: Number,
    pub data: Payload,
    pub prev_hash: String,
    pub hash: String,
    pub signature: String,
}

impl Record {
    /// Build, hash and sign the record at `index`
    pub(crate) fn build(
        index: u64,
        prev_hash: String,
        data: Payload,
        timestamp: Number,
        auth: &Authenticator,
    ) -> Self {
        let mut record = Self {
            index,
            timestamp,
            data,
            prev_hash,
            hash: String::new(),
            signature: String::new(),
        };
        record.hash = record.calculate_hash();
        record.signature = auth.sign(&record.hash);
        record
    }

    /// Recompute the content hash from the hashed fields
    pub fn calculate_hash(&self) -> String {
        hasher::content_hash(self.index, &self.timestamp, &self.data, &self.prev_hash)
    }

    pub fn verify_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    pub fn timestamp_secs(&self) -> Option<f64> {
        self.timestamp.as_f64()
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        let field = |key: &str| {
            self.data
                .get(key)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "-".to_string())
        };
        format!(
            "#{} resident={} mode={} success={} hash={}",
            self.index,
            field("resident_id"),
            field("mode"),
            field("success"),
            self.hash.chars().take(12).collect::<String>()
        )
    }
}

/// Current time as fractional seconds since the Unix epoch
pub fn now_timestamp() -> Number {
    let now = Utc::now();
    Number::from_f64(now.timestamp_micros() as f64 / 1_000_000.0)
        .unwrap_or_else(|| Number::from(now.timestamp()))
}

/// Convert a typed event into a payload; anything but a JSON object is rejected
pub fn payload_from<T: Serialize + ?Sized>(event: &T) -> Result<Payload> {
    let value = serde_json::to_value(event)
        .map_err(|e| LedgerError::InvalidPayload(format!("Event is not serializable: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(LedgerError::InvalidPayload(format!(
            "Event must serialize to a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
