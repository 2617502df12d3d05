use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::RngCore;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use entry_ledger::config::read_key_file;
use entry_ledger::ledger::persist::load_chain_file;
use entry_ledger::ledger::{Ledger, Record, SecretKey, SENTINEL_HASH};

/// Environment variable holding the key when `--key-file` is not given
const KEY_ENV: &str = "ENTRY_LEDGER_SECRET_KEY";

#[derive(Parser)]
#[command(name = "ledger-admin", version, about = "Inspect and verify entry ledger chain files")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check hash linkage and signatures of every record
    Verify(VerifyArgs),
    /// Print the records of a chain file
    Show(ShowArgs),
    /// Generate a random signing key, hex encoded
    Keygen {
        /// Key length in bytes
        #[arg(long, default_value_t = 32)]
        bytes: usize,
    },
}

#[derive(Args)]
struct VerifyArgs {
    /// Path to the chain file
    #[arg(short, long, value_name = "PATH")]
    chain: PathBuf,

    /// File containing the signing key
    #[arg(short, long, value_name = "PATH")]
    key_file: Option<PathBuf>,

    /// Report every violation instead of stopping at the first
    #[arg(long)]
    all: bool,
}

#[derive(Args)]
struct ShowArgs {
    /// Path to the chain file
    #[arg(short, long, value_name = "PATH")]
    chain: PathBuf,

    /// Only print the newest N records
    #[arg(long, value_name = "N")]
    tail: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        tracing::Level::ERROR
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Verify(args) => {
            if !verify(&args, cli.verbose, cli.quiet).await? {
                std::process::exit(1);
            }
        }
        Commands::Show(args) => show(&args)?,
        Commands::Keygen { bytes } => keygen(bytes)?,
    }

    Ok(())
}

fn resolve_key(key_file: Option<&Path>) -> Result<SecretKey> {
    match key_file {
        Some(path) => Ok(read_key_file(path)?),
        None => {
            let inline = std::env::var(KEY_ENV)
                .map_err(|_| anyhow!("Provide --key-file or set {}", KEY_ENV))?;
            Ok(SecretKey::new(inline.into_bytes())?)
        }
    }
}

fn open_existing(path: &Path, key: SecretKey) -> Result<Ledger> {
    if !path.exists() {
        return Err(anyhow!("Chain file not found: {}", path.display()));
    }
    Ledger::open(path, key).with_context(|| format!("Failed to load {}", path.display()))
}

async fn verify(args: &VerifyArgs, verbose: bool, quiet: bool) -> Result<bool> {
    info!("Verifying chain file: {}", args.chain.display());
    let key = resolve_key(args.key_file.as_deref())?;
    let ledger = open_existing(&args.chain, key)?;

    if args.all {
        let violations = ledger.find_violations().await;
        let entries = ledger.len().await;
        if violations.is_empty() {
            if !quiet {
                println!("✓ Chain is valid ({} entries)", entries);
            }
            return Ok(true);
        }
        error!("{} violation(s) in {} entries", violations.len(), entries);
        for violation in &violations {
            println!("✗ {}", violation);
        }
        return Ok(false);
    }

    let report = ledger.verify().await;
    if report.is_valid() {
        if !quiet {
            println!("{}", report.summary());
        }
        if verbose {
            println!("  Head hash: {}", ledger.head_hash().await);
        }
    } else {
        println!("{}", report.summary());
    }
    Ok(report.is_valid())
}

fn show(args: &ShowArgs) -> Result<()> {
    let records = load_chain_file(&args.chain)?
        .ok_or_else(|| anyhow!("Chain file not found: {}", args.chain.display()))?;
    let head = records
        .last()
        .map(|r| r.hash.as_str())
        .unwrap_or(SENTINEL_HASH);

    println!("Entries:   {}", records.len());
    println!("Head hash: {}", head);

    for record in records.iter().skip(tail_start(records.len(), args.tail)) {
        println!("{}  {}", format_timestamp(record), record.summary());
    }
    Ok(())
}

/// First position printed when only the newest `tail` records are wanted
fn tail_start(len: usize, tail: Option<usize>) -> usize {
    tail.map(|n| len.saturating_sub(n)).unwrap_or(0)
}

fn format_timestamp(record: &Record) -> String {
    record
        .timestamp_secs()
        .and_then(|secs| {
            chrono::DateTime::<chrono::Utc>::from_timestamp_micros((secs * 1e6).round() as i64)
        })
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| record.timestamp.to_string())
}

fn keygen(bytes: usize) -> Result<()> {
    println!("{}", generate_key(bytes)?);
    Ok(())
}

fn generate_key(bytes: usize) -> Result<String> {
    if bytes < 16 {
        return Err(anyhow!("Refusing to generate a key shorter than 16 bytes"));
    }
    let mut key = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut key);
    Ok(hex::encode(key))
}
