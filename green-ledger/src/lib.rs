//! Green Ledger Core
//!
//! Credit ledger and transaction accounting engine for tradable
//! environmental credits (green-hydrogen production units). Three actor
//! roles — producer, buyer, regulator — issue, transfer, and retire credits
//! against an append-only transaction log.
//!
//! # Architecture
//!
//! - **Single Writer**: all mutations flow through one actor task, so
//!   concurrent operations on the same credit are serialized
//! - **Atomic pairs**: every credit update commits in one write batch with
//!   its log entry; either both land or neither is observable
//! - **Append-only log**: transactions are never modified or deleted; any
//!   credit's ownership history replays from the log alone
//!
//! # Invariants
//!
//! - Unit conservation: every log entry for a credit carries the credit's
//!   immutable unit count
//! - `producer_id` never changes after mint; `owner_id` only changes
//!   through a recorded transfer
//! - Retirement is one-way: `is_retired` transitions false to true, never
//!   back, and a retired credit rejects further transfers

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod registry;
pub mod reporting;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use ledger::Ledger;
pub use types::{
    AuditRecord, Credit, CreditListing, CreditSummary, Health, Identity, LoginRequest,
    MintRequest, Party, ProvenanceToken, RetireRequest, Role, Transaction, TransactionFilter,
    TransactionKind, TransferRequest,
};
