//! Read-only projections for the role dashboards
//!
//! Everything here is computed from canonical credit state plus the
//! append-only transaction log; nothing in this module mutates either.

use crate::{
    storage::Storage,
    types::{
        AuditRecord, Credit, CreditListing, CreditSummary, Party, Transaction, TransactionFilter,
        TransactionKind,
    },
    Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Display label for the mint source and unresolvable senders
const LABEL_SYSTEM: &str = "System";
/// Display label for the retirement sink
const LABEL_RETIRED: &str = "Retired";
/// Display label for unresolvable receivers
const LABEL_UNKNOWN: &str = "Unknown";

/// Dashboard projections over ledger state and log history
pub struct Reporting {
    storage: Arc<Storage>,
}

impl Reporting {
    /// Create a reporting view over the shared store
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// All credits currently owned by `producer_id`, regardless of origin
    pub fn producer_holdings(&self, producer_id: Uuid) -> Result<Vec<Credit>> {
        self.storage.credits_owned_by(producer_id)
    }

    /// All non-retired credits with their producer's display name
    ///
    /// Independent of current owner; a buyer's own holdings are not excluded.
    pub fn marketplace_listing(&self) -> Result<Vec<CreditListing>> {
        let mut names: HashMap<Uuid, String> = HashMap::new();

        let listings = self
            .storage
            .active_credits()?
            .into_iter()
            .map(|credit| {
                let producer_name = self
                    .display_name(&mut names, credit.producer_id, LABEL_UNKNOWN)
                    .to_string();
                CreditListing {
                    credit,
                    producer_name,
                }
            })
            .collect();

        Ok(listings)
    }

    /// Transfers received by `buyer_id`, in log order
    pub fn buyer_purchase_history(&self, buyer_id: Uuid) -> Result<Vec<Transaction>> {
        self.storage.query_transactions(&TransactionFilter {
            to: Some(Party::Identity(buyer_id)),
            kind: Some(TransactionKind::Transfer),
            ..Default::default()
        })
    }

    /// The full audit feed with human-readable actor names
    ///
    /// Sentinel and unresolvable endpoints render as labels rather than
    /// failing: a missing sender shows as "System", a missing receiver as
    /// "Unknown".
    pub fn global_audit(&self) -> Result<Vec<AuditRecord>> {
        let transactions = self.storage.query_transactions(&TransactionFilter::default())?;

        let mut names: HashMap<Uuid, String> = HashMap::new();
        let records = transactions
            .into_iter()
            .map(|tx| {
                let from_name = self.party_name(&mut names, tx.from, LABEL_SYSTEM);
                let to_name = self.party_name(&mut names, tx.to, LABEL_UNKNOWN);
                AuditRecord {
                    transaction: tx,
                    from_name,
                    to_name,
                }
            })
            .collect();

        Ok(records)
    }

    /// Aggregate credit counts for the regulator dashboard
    pub fn credit_summary(&self) -> Result<CreditSummary> {
        self.storage.credit_summary()
    }

    fn party_name(
        &self,
        cache: &mut HashMap<Uuid, String>,
        party: Party,
        fallback: &str,
    ) -> String {
        match party {
            Party::System => LABEL_SYSTEM.to_string(),
            Party::Retired => LABEL_RETIRED.to_string(),
            Party::Identity(id) => self.display_name(cache, id, fallback).to_string(),
        }
    }

    fn display_name<'a>(
        &self,
        cache: &'a mut HashMap<Uuid, String>,
        id: Uuid,
        fallback: &str,
    ) -> &'a str {
        cache.entry(id).or_insert_with(|| {
            self.storage
                .get_identity(id)
                .map(|identity| identity.name)
                .unwrap_or_else(|_| fallback.to_string())
        })
    }
}
