//! Chain file persistence
//!
//! The whole chain is stored as one pretty-printed JSON array and rewritten
//! on every append: written to a sibling temp file, fsynced, then renamed
//! over the target so readers only ever see a complete chain.

use chrono::Utc;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{LedgerError, Result};
use crate::ledger::record::Record;

/// Read a chain file; `Ok(None)` when no file exists yet
pub fn load_chain_file(path: &Path) -> Result<Option<Vec<Record>>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No chain file at {:?}", path);
            return Ok(None);
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            return Err(LedgerError::CorruptChain {
                path: path.to_path_buf(),
                reason: format!("not valid UTF-8: {}", e),
            });
        }
        Err(e) => return Err(LedgerError::io(path, e)),
    };

    let records: Vec<Record> =
        serde_json::from_str(&contents).map_err(|e| LedgerError::CorruptChain {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!("Loaded {} records from {:?}", records.len(), path);
    Ok(Some(records))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Atomically replace the chain file with `records`
pub fn write_chain_file(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(records)?;
    let tmp_path = temp_path(path);

    if let Err(e) = write_synced(&tmp_path, json.as_bytes()) {
        let _ = fs::remove_file(&tmp_path);
        return Err(LedgerError::io(&tmp_path, e));
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(LedgerError::io(path, e));
    }

    debug!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}

/// Move a corrupt chain file aside, returning where it went
pub fn quarantine_chain_file(path: &Path) -> Result<PathBuf> {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".corrupt-{}", Utc::now().timestamp()));
    let target = path.with_file_name(name);

    fs::rename(path, &target).map_err(|e| LedgerError::io(path, e))?;
    warn!("Quarantined corrupt chain file {:?} -> {:?}", path, target);
    Ok(target)
}
