use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{LedgerError, Result};
use crate::ledger::SecretKey;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "ENTRY_LEDGER_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub ledger: LedgerSettings,
}

#[derive(Clone, Deserialize)]
pub struct LedgerSettings {
    pub chain_path: PathBuf,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub secret_key_path: Option<PathBuf>,
    pub quarantine_corrupt: bool,
    pub verify_on_startup: bool,
}

impl fmt::Debug for LedgerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerSettings")
            .field("chain_path", &self.chain_path)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("secret_key_path", &self.secret_key_path)
            .field("quarantine_corrupt", &self.quarantine_corrupt)
            .field("verify_on_startup", &self.verify_on_startup)
            .finish()
    }
}

impl AppConfig {
    /// Defaults, then `entry-ledger.toml` (or `$ENTRY_LEDGER_CONFIG`), then
    /// `ENTRY_LEDGER__*` environment variables
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 3000)?
            .set_default("ledger.chain_path", "data/chain.json")?
            .set_default("ledger.quarantine_corrupt", true)?
            .set_default("ledger.verify_on_startup", true)?;

        builder = match file {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                builder.add_source(config::File::from(path).required(true))
            }
            None => builder.add_source(config::File::with_name("entry-ledger").required(false)),
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix("ENTRY_LEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl LedgerSettings {
    /// Resolve the signing key from exactly one configured source
    pub fn secret_key(&self) -> Result<SecretKey> {
        match (&self.secret_key, &self.secret_key_path) {
            (Some(_), Some(_)) => Err(LedgerError::Config(
                "Set either ledger.secret_key or ledger.secret_key_path, not both".to_string(),
            )),
            (Some(inline), None) => SecretKey::new(inline.as_bytes().to_vec()),
            (None, Some(path)) => read_key_file(path),
            (None, None) => Err(LedgerError::Config(
                "No ledger secret key configured (ledger.secret_key or ledger.secret_key_path)"
                    .to_string(),
            )),
        }
    }
}

/// Read key bytes from a file, ignoring a trailing newline
pub fn read_key_file(path: &Path) -> Result<SecretKey> {
    let mut bytes = fs::read(path).map_err(|e| LedgerError::io(path, e))?;
    while matches!(bytes.last(), Some(b'\n') | Some(b'\r')) {
        bytes.pop();
    }
    SecretKey::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entry-ledger.toml");
        fs::write(
            &path,
            r#"
server_port = 8080

[ledger]
chain_path = "/var/lib/entry-ledger/chain.json"
secret_key = "super-secret-demo-key"
quarantine_corrupt = false
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(
            config.ledger.chain_path,
            PathBuf::from("/var/lib/entry-ledger/chain.json")
        );
        assert!(!config.ledger.quarantine_corrupt);
        assert!(config.ledger.verify_on_startup);
        assert_eq!(
            config.ledger.secret_key().unwrap().as_bytes(),
            b"super-secret-demo-key"
        );
    }

    #[test]
    fn test_defaults_start_over_corrupt_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entry-ledger.toml");
        fs::write(&path, "[ledger]\nsecret_key = \"k\"\n").unwrap();

        let config = AppConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.ledger.chain_path, PathBuf::from("data/chain.json"));
        assert!(config.ledger.quarantine_corrupt);
        assert!(config.ledger.verify_on_startup);
    }

    #[test]
    fn test_debug_hides_secret() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entry-ledger.toml");
        fs::write(&path, "[ledger]\nsecret_key = \"hunter2\"\n").unwrap();

        let config = AppConfig::load_from(Some(&path)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_key_file_trims_newline() {
        let dir = tempdir().unwrap();
        let key_path = dir.path().join("ledger.key");
        fs::write(&key_path, "abc123\n").unwrap();

        let key = read_key_file(&key_path).unwrap();
        assert_eq!(key.as_bytes(), b"abc123");
    }

    #[test]
    fn test_key_source_must_be_unique() {
        let settings = LedgerSettings {
            chain_path: PathBuf::from("chain.json"),
            secret_key: Some("a".to_string()),
            secret_key_path: Some(PathBuf::from("b")),
            quarantine_corrupt: false,
            verify_on_startup: true,
        };
        assert!(matches!(settings.secret_key(), Err(LedgerError::Config(_))));

        let settings = LedgerSettings {
            secret_key: None,
            secret_key_path: None,
            ..settings
        };
        assert!(matches!(settings.secret_key(), Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_empty_key_rejected() {
        let dir = tempdir().unwrap();
        let key_path = dir.path().join("ledger.key");
        fs::write(&key_path, "\n").unwrap();
        assert!(matches!(read_key_file(&key_path), Err(LedgerError::Config(_))));
    }
}
