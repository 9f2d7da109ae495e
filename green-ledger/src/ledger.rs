//! Main ledger orchestration layer
//!
//! This module ties together storage, the identity registry, and the
//! single-writer actor into a high-level API for credit accounting.
//!
//! # Example
//!
//! ```no_run
//! use green_ledger::{Config, Ledger, LoginRequest};
//!
//! #[tokio::main]
//! async fn main() -> green_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config).await?;
//!
//!     let producer = ledger
//!         .login(LoginRequest {
//!             name: "producer1".to_string(),
//!             role: "producer".to_string(),
//!         })
//!         .await?;
//!
//!     // let credit = ledger.mint(producer.id, ...).await?;
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    metrics::Metrics,
    reporting::Reporting,
    storage::{Storage, StorageStats},
    types::{
        AuditRecord, Credit, CreditListing, CreditSummary, Health, Identity, LoginRequest,
        MintRequest, RetireRequest, Transaction, TransactionFilter, TransferRequest,
    },
    Config, Error, Result,
};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Main ledger interface
///
/// Mutations go through the actor handle and are serialized; reads hit
/// storage directly.
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Dashboard projections
    reporting: Reporting,

    /// Prometheus collectors
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let handle = spawn_ledger_actor(storage.clone());
        let reporting = Reporting::new(storage.clone());
        let metrics =
            Metrics::new().map_err(|e| Error::Config(format!("metrics setup failed: {}", e)))?;

        Ok(Self {
            handle,
            storage,
            reporting,
            metrics,
            config,
        })
    }

    /// Configuration this ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Prometheus collectors for scraping by a transport shell
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // Mutations

    /// Resolve an identity by name, creating it on first login
    pub async fn login(&self, request: LoginRequest) -> Result<Identity> {
        let timer = Instant::now();
        let identity = self.handle.resolve_identity(request).await?;

        self.metrics.logins_total.inc();
        self.metrics
            .mutation_duration
            .observe(timer.elapsed().as_secs_f64());

        Ok(identity)
    }

    /// Mint a new credit for `producer_id`
    ///
    /// The credit and its genesis transaction are committed atomically; a
    /// failed mint leaves no trace in either collection.
    pub async fn mint(&self, producer_id: Uuid, request: MintRequest) -> Result<Credit> {
        let timer = Instant::now();
        let credit = self.handle.mint(producer_id, request).await?;

        self.metrics.mints_total.inc();
        self.metrics
            .mutation_duration
            .observe(timer.elapsed().as_secs_f64());

        Ok(credit)
    }

    /// Transfer a whole credit to a new owner
    pub async fn transfer(&self, request: TransferRequest) -> Result<Transaction> {
        let timer = Instant::now();
        let tx = self.handle.transfer(request).await?;

        self.metrics.transfers_total.inc();
        self.metrics
            .mutation_duration
            .observe(timer.elapsed().as_secs_f64());

        Ok(tx)
    }

    /// Retire a credit from circulation (one-way)
    pub async fn retire(&self, request: RetireRequest) -> Result<Credit> {
        let timer = Instant::now();
        let credit = self.handle.retire(request).await?;

        self.metrics.retires_total.inc();
        self.metrics
            .mutation_duration
            .observe(timer.elapsed().as_secs_f64());

        Ok(credit)
    }

    // Reads

    /// Get credit by ID
    pub fn get_credit(&self, credit_id: Uuid) -> Result<Credit> {
        self.storage.get_credit(credit_id)
    }

    /// Get identity by ID
    pub fn get_identity(&self, identity_id: Uuid) -> Result<Identity> {
        self.storage.get_identity(identity_id)
    }

    /// Full movement history of one credit, oldest first
    pub fn credit_history(&self, credit_id: Uuid) -> Result<Vec<Transaction>> {
        self.storage.credit_history(credit_id)
    }

    /// Query the transaction log
    pub fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        self.storage.query_transactions(filter)
    }

    /// Producer dashboard: credits currently owned by `owner_id`
    pub fn producer_holdings(&self, owner_id: Uuid) -> Result<Vec<Credit>> {
        self.reporting.producer_holdings(owner_id)
    }

    /// Buyer dashboard: all non-retired credits with producer names
    pub fn marketplace_listing(&self) -> Result<Vec<CreditListing>> {
        self.reporting.marketplace_listing()
    }

    /// Buyer dashboard: transfers received by `buyer_id`
    pub fn buyer_purchase_history(&self, buyer_id: Uuid) -> Result<Vec<Transaction>> {
        self.reporting.buyer_purchase_history(buyer_id)
    }

    /// Regulator dashboard: the full audit feed with display names
    pub fn global_audit(&self) -> Result<Vec<AuditRecord>> {
        self.reporting.global_audit()
    }

    /// Regulator dashboard: aggregate credit counts
    pub fn credit_summary(&self) -> Result<CreditSummary> {
        self.reporting.credit_summary()
    }

    /// Liveness probe payload
    pub fn health(&self) -> Health {
        Health::healthy()
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
