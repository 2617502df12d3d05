//! Ledger Store
//!
//! Owns the chain of scan-event records: loads it at startup, appends one
//! signed record at a time, and verifies the whole chain on demand.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};
use crate::ledger::auth::{Authenticator, SecretKey};
use crate::ledger::persist;
use crate::ledger::record::{self, Payload, Record, SENTINEL_HASH};
use crate::ledger::verify::{self, VerificationReport, Violation};

/// How an existing chain file was handled when the ledger was opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// No chain file yet; the ledger starts empty
    Created,
    Loaded { entries: usize },
    /// The file could not be parsed and was moved aside
    Quarantined { moved_to: PathBuf },
}

/// Append-only, HMAC-signed event ledger backed by a single JSON file
pub struct Ledger {
    path: PathBuf,
    auth: Authenticator,
    chain: RwLock<Vec<Record>>,
}

impl Ledger {
    /// Open the ledger at `path`, refusing to start over a corrupt file
    pub fn open(path: impl AsRef<Path>, secret: SecretKey) -> Result<Self> {
        let (ledger, _) = Self::open_inner(path.as_ref(), secret, false)?;
        Ok(ledger)
    }

    /// Open the ledger, moving a corrupt chain file aside instead of failing
    pub fn open_or_quarantine(
        path: impl AsRef<Path>,
        secret: SecretKey,
    ) -> Result<(Self, OpenOutcome)> {
        Self::open_inner(path.as_ref(), secret, true)
    }

    fn open_inner(path: &Path, secret: SecretKey, quarantine: bool) -> Result<(Self, OpenOutcome)> {
        let auth = Authenticator::new(secret)?;

        let (records, outcome) = match persist::load_chain_file(path) {
            Ok(Some(records)) => {
                let entries = records.len();
                (records, OpenOutcome::Loaded { entries })
            }
            Ok(None) => (Vec::new(), OpenOutcome::Created),
            Err(LedgerError::CorruptChain { path: bad, reason }) if quarantine => {
                warn!("Chain file {:?} is corrupt: {}", bad, reason);
                let moved_to = persist::quarantine_chain_file(&bad)?;
                (Vec::new(), OpenOutcome::Quarantined { moved_to })
            }
            Err(e) => return Err(e),
        };

        info!("Opened ledger at {:?} ({} entries)", path, records.len());

        let ledger = Self {
            path: path.to_path_buf(),
            auth,
            chain: RwLock::new(records),
        };
        Ok((ledger, outcome))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new record; it is visible only once the chain file is written
    pub async fn append(&self, payload: Payload) -> Result<Record> {
        let mut chain = self.chain.write().await;

        let prev_hash = chain
            .last()
            .map(|r| r.hash.clone())
            .unwrap_or_else(|| SENTINEL_HASH.to_string());
        let record = Record::build(
            chain.len() as u64,
            prev_hash,
            payload,
            record::now_timestamp(),
            &self.auth,
        );

        chain.push(record.clone());
        if let Err(e) = persist::write_chain_file(&self.path, &chain) {
            chain.pop();
            warn!("Append of record {} rolled back: {}", record.index, e);
            return Err(e);
        }

        debug!("Appended ledger record: {}", record.summary());
        Ok(record)
    }

    /// Serialize `event` into a payload and append it
    pub async fn append_event<T: Serialize + ?Sized>(&self, event: &T) -> Result<Record> {
        let payload = record::payload_from(event)?;
        self.append(payload).await
    }

    /// Snapshot of the full chain
    pub async fn load_chain(&self) -> Vec<Record> {
        self.chain.read().await.clone()
    }

    /// Verify invariants for every record, stopping at the first violation
    pub async fn verify(&self) -> VerificationReport {
        let chain = self.chain.read().await;
        verify::verify_chain(&chain, &self.auth)
    }

    /// Every violation in the chain rather than just the first
    pub async fn find_violations(&self) -> Vec<Violation> {
        let chain = self.chain.read().await;
        verify::find_violations(&chain, &self.auth)
    }

    pub async fn len(&self) -> usize {
        self.chain.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chain.read().await.is_empty()
    }

    /// Hash of the newest record, or the sentinel for an empty chain
    pub async fn head_hash(&self) -> String {
        self.chain
            .read()
            .await
            .last()
            .map(|r| r.hash.clone())
            .unwrap_or_else(|| SENTINEL_HASH.to_string())
    }
}
