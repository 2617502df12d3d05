#![allow(dead_code)]

use entry_ledger::ledger::{Ledger, SecretKey};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TEST_KEY: &[u8] = b"super-secret-demo-key";

pub fn test_key() -> SecretKey {
    SecretKey::new(TEST_KEY.to_vec()).expect("test key is non-empty")
}

/// Fresh ledger in its own temp directory; keep the dir alive for the test
pub fn setup_ledger() -> (TempDir, PathBuf, Ledger) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("chain.json");
    let ledger = Ledger::open(&path, test_key()).expect("Failed to open ledger");
    (dir, path, ledger)
}

/// Path of a checked-in fixture
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
