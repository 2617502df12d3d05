//! Tamper-Evident Event Ledger
//!
//! Hash-linked, HMAC-signed scan events persisted as a single JSON chain
//! file, with end-to-end verification.

pub mod auth;
pub mod canonical;
pub mod hasher;
pub mod persist;
pub mod record;
pub mod store;
pub mod verify;

pub use auth::{Authenticator, SecretKey};
pub use record::{payload_from, Payload, Record, SENTINEL_HASH};
pub use store::{Ledger, OpenOutcome};
pub use verify::{find_violations, verify_chain, VerificationReport, Violation};
