pub mod api;
pub mod config;
pub mod error;
pub mod ledger;

pub use error::{LedgerError, Result};
pub use ledger::{Ledger, Record, SecretKey, VerificationReport};
