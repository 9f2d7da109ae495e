//! Core types for the credit ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for credit units)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Actor role, fixed at identity creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Role {
    /// Mints new credits
    Producer = 1,
    /// Purchases credits on the marketplace
    Buyer = 2,
    /// Audits the full transaction log
    Regulator = 3,
}

impl Role {
    /// Wire name for the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Buyer => "buyer",
            Role::Regulator => "regulator",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "producer" => Some(Role::Producer),
            "buyer" => Some(Role::Buyer),
            "regulator" => Some(Role::Regulator),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named actor with a fixed role
///
/// Created on first login for a given name, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identity ID
    pub id: Uuid,

    /// Human-supplied name (globally unique)
    pub name: String,

    /// Role, immutable after creation
    pub role: Role,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Create a new identity record
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

/// Opaque chain-of-custody token attached to every unit movement
///
/// Stands in for a verifiable proof; not independently verifiable in this
/// design. Format: `0x` followed by 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProvenanceToken(String);

impl ProvenanceToken {
    /// Generate a fresh token
    pub fn generate() -> Self {
        Self(format!(
            "0x{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProvenanceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit-denominated credit record
///
/// `producer_id` is the original minter and never changes; `owner_id` is the
/// current holder and only changes through a recorded transfer. `units` is
/// immutable once minted (whole-credit transfer only, no splitting).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    /// Unique credit ID
    pub id: Uuid,

    /// Producer-supplied batch label (not required unique)
    pub batch_id: String,

    /// Original minter (immutable)
    pub producer_id: Uuid,

    /// Current holder (mutable via transfer only)
    pub owner_id: Uuid,

    /// Credit size (positive, immutable once minted)
    pub units: Decimal,

    /// Production date supplied at mint
    pub production_date: DateTime<Utc>,

    /// Mint timestamp
    pub created_at: DateTime<Utc>,

    /// Retirement flag (monotonic false -> true)
    pub is_retired: bool,

    /// Token assigned at mint (immutable)
    pub provenance_token: ProvenanceToken,
}

/// Transaction endpoint: an identity or one of the two sentinels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    /// Mint source sentinel
    System,
    /// Retirement sink sentinel
    Retired,
    /// A registered identity
    Identity(Uuid),
}

impl Party {
    /// Identity ID if this endpoint is a registered identity
    pub fn identity_id(&self) -> Option<Uuid> {
        match self {
            Party::Identity(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::System => write!(f, "system"),
            Party::Retired => write!(f, "retired"),
            Party::Identity(id) => write!(f, "{}", id),
        }
    }
}

/// Kind of unit movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    /// Genesis record, created atomically with its credit
    Mint = 1,
    /// Ownership change
    Transfer = 2,
    /// Removal from circulation
    Retire = 3,
}

impl TransactionKind {
    /// Wire name for the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Mint => "mint",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Retire => "retire",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only record of a single unit movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: Uuid,

    /// Insertion sequence, assigned by the store (timestamp tie-breaker)
    pub seq: u64,

    /// Credit this movement belongs to
    pub credit_id: Uuid,

    /// Source endpoint (`System` for mint)
    pub from: Party,

    /// Destination endpoint (`Retired` for retirement)
    pub to: Party,

    /// Units moved (always equal to the credit's units)
    pub units: Decimal,

    /// Movement kind
    pub kind: TransactionKind,

    /// Token generated for this operation
    pub provenance_token: ProvenanceToken,

    /// Movement timestamp
    pub timestamp: DateTime<Utc>,
}

/// Filter for transaction log queries
///
/// Unset fields match everything. Results are ordered by timestamp
/// ascending, ties broken by insertion sequence.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Match a single credit's history
    pub credit_id: Option<Uuid>,

    /// Match the source endpoint
    pub from: Option<Party>,

    /// Match the destination endpoint
    pub to: Option<Party>,

    /// Match the movement kind
    pub kind: Option<TransactionKind>,
}

impl TransactionFilter {
    /// Does `tx` satisfy every set field?
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.credit_id.map_or(true, |id| tx.credit_id == id)
            && self.from.map_or(true, |p| tx.from == p)
            && self.to.map_or(true, |p| tx.to == p)
            && self.kind.map_or(true, |k| tx.kind == k)
    }
}

/// Marketplace entry: a credit with its producer's display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditListing {
    /// The listed credit
    pub credit: Credit,

    /// Producer display name ("Unknown" when unresolvable)
    pub producer_name: String,
}

/// Audit feed entry: a transaction with display names resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// The underlying log entry
    pub transaction: Transaction,

    /// Source display name ("System" for sentinel/unresolvable sources)
    pub from_name: String,

    /// Destination display name ("Unknown" when unresolvable)
    pub to_name: String,
}

/// Regulator's aggregate credit counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSummary {
    /// All credits ever minted
    pub total: u64,

    /// Credits still in circulation (`total - retired`)
    pub active: u64,

    /// Credits removed from circulation
    pub retired: u64,
}

/// Liveness probe payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Fixed "healthy" marker
    pub status: String,

    /// Probe timestamp
    pub timestamp: DateTime<Utc>,
}

impl Health {
    /// Healthy status at the current instant
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

// Request structs, validated at the boundary before reaching the ledger.

/// Identity resolution input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Human-supplied name
    pub name: String,

    /// Requested role (wire string, validated)
    pub role: String,
}

impl LoginRequest {
    /// Validate the request and parse the requested role
    pub fn validate(&self) -> crate::Result<Role> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::Validation("name must not be empty".to_string()));
        }
        Role::from_str(&self.role).ok_or_else(|| {
            crate::Error::Validation(format!("unrecognized role: {:?}", self.role))
        })
    }
}

/// Mint input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintRequest {
    /// Producer-supplied batch label
    pub batch_id: String,

    /// Credit size
    pub units: Decimal,

    /// Production date
    pub production_date: DateTime<Utc>,
}

impl MintRequest {
    /// Check input-level invariants
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_id.trim().is_empty() {
            return Err(crate::Error::Validation(
                "batch_id must not be empty".to_string(),
            ));
        }
        if self.units <= Decimal::ZERO {
            return Err(crate::Error::Validation(
                "units must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Transfer input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Credit to move
    pub credit_id: Uuid,

    /// Destination identity
    pub buyer_id: Uuid,

    /// Units to move (must equal the credit's units)
    pub units: Decimal,
}

impl TransferRequest {
    /// Check input-level invariants
    pub fn validate(&self) -> crate::Result<()> {
        if self.units <= Decimal::ZERO {
            return Err(crate::Error::Validation(
                "units must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retirement input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetireRequest {
    /// Credit to retire
    pub credit_id: Uuid,

    /// Identity requesting retirement (owner or regulator)
    pub requester_id: Uuid,
}
