//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! every mutation (identity creation, mint, transfer, retire) flows through
//! one actor task, so concurrent requests against the same credit are
//! serialized and the credit-update-plus-log-append pair commits as a single
//! atomic unit. Reads never go through the mailbox; they hit storage
//! directly from the [`Ledger`](crate::Ledger) facade.

use crate::{
    registry::IdentityRegistry,
    storage::Storage,
    types::{
        Credit, Identity, LoginRequest, MintRequest, Party, ProvenanceToken, RetireRequest, Role,
        Transaction, TransactionKind, TransferRequest,
    },
    Error, Result,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Resolve or create an identity by name
    ResolveIdentity {
        /// Login input
        request: LoginRequest,
        /// Reply channel
        response: oneshot::Sender<Result<Identity>>,
    },

    /// Mint a new credit for a producer
    Mint {
        /// Authenticated producer identity ID
        producer_id: Uuid,
        /// Mint input
        request: MintRequest,
        /// Reply channel
        response: oneshot::Sender<Result<Credit>>,
    },

    /// Transfer a credit to a new owner
    Transfer {
        /// Transfer input
        request: TransferRequest,
        /// Reply channel
        response: oneshot::Sender<Result<Transaction>>,
    },

    /// Retire a credit from circulation
    Retire {
        /// Retirement input
        request: RetireRequest,
        /// Reply channel
        response: oneshot::Sender<Result<Credit>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger mutations
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Identity registry
    registry: IdentityRegistry,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(storage: Arc<Storage>, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        let registry = IdentityRegistry::new(storage.clone());
        Self {
            storage,
            registry,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                _ => self.handle_message(msg),
            }
        }
        tracing::debug!("Ledger actor stopped");
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::ResolveIdentity { request, response } => {
                let _ = response.send(self.registry.resolve_or_create(&request));
            }

            LedgerMessage::Mint {
                producer_id,
                request,
                response,
            } => {
                let _ = response.send(self.mint(producer_id, request));
            }

            LedgerMessage::Transfer { request, response } => {
                let _ = response.send(self.transfer(request));
            }

            LedgerMessage::Retire { request, response } => {
                let _ = response.send(self.retire(request));
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Mint a credit plus its genesis transaction, atomically
    fn mint(&self, producer_id: Uuid, request: MintRequest) -> Result<Credit> {
        request.validate()?;

        let producer = self.storage.get_identity(producer_id)?;
        if producer.role != Role::Producer {
            return Err(Error::Authorization(format!(
                "role {} may not mint credits",
                producer.role
            )));
        }

        let now = Utc::now();
        let token = ProvenanceToken::generate();

        let credit = Credit {
            id: Uuid::new_v4(),
            batch_id: request.batch_id,
            producer_id: producer.id,
            owner_id: producer.id,
            units: request.units,
            production_date: request.production_date,
            created_at: now,
            is_retired: false,
            provenance_token: token.clone(),
        };

        let tx = Transaction {
            id: Uuid::new_v4(),
            seq: self.storage.next_seq(),
            credit_id: credit.id,
            from: Party::System,
            to: Party::Identity(producer.id),
            units: credit.units,
            kind: TransactionKind::Mint,
            provenance_token: token,
            timestamp: now,
        };

        self.storage.record_mint(&credit, &tx)?;

        tracing::info!(
            credit_id = %credit.id,
            producer_id = %producer.id,
            batch_id = %credit.batch_id,
            units = %credit.units,
            "Credit minted"
        );

        Ok(credit)
    }

    /// Move ownership of a whole credit, appending the transfer record
    fn transfer(&self, request: TransferRequest) -> Result<Transaction> {
        request.validate()?;

        let mut credit = self.storage.get_credit(request.credit_id)?;
        let buyer = self.storage.get_identity(request.buyer_id)?;

        if credit.is_retired {
            return Err(Error::Conflict(format!(
                "credit {} is retired and cannot be transferred",
                credit.id
            )));
        }
        if request.units != credit.units {
            return Err(Error::Validation(format!(
                "whole-credit transfer only: credit holds {} units, got {}",
                credit.units, request.units
            )));
        }

        // The log records the holder before this call, not the producer
        let previous_owner = credit.owner_id;
        credit.owner_id = buyer.id;

        let tx = Transaction {
            id: Uuid::new_v4(),
            seq: self.storage.next_seq(),
            credit_id: credit.id,
            from: Party::Identity(previous_owner),
            to: Party::Identity(buyer.id),
            units: credit.units,
            kind: TransactionKind::Transfer,
            provenance_token: ProvenanceToken::generate(),
            timestamp: Utc::now(),
        };

        self.storage.record_transfer(&credit, previous_owner, &tx)?;

        tracing::info!(
            credit_id = %credit.id,
            from = %previous_owner,
            to = %buyer.id,
            units = %tx.units,
            "Credit transferred"
        );

        Ok(tx)
    }

    /// Flip the one-way retirement flag, appending the retire record
    fn retire(&self, request: RetireRequest) -> Result<Credit> {
        let mut credit = self.storage.get_credit(request.credit_id)?;
        let requester = self.storage.get_identity(request.requester_id)?;

        if credit.is_retired {
            return Err(Error::Conflict(format!(
                "credit {} is already retired",
                credit.id
            )));
        }
        if requester.id != credit.owner_id && requester.role != Role::Regulator {
            return Err(Error::Authorization(
                "only the current owner or a regulator may retire a credit".to_string(),
            ));
        }

        let owner = credit.owner_id;
        credit.is_retired = true;

        let tx = Transaction {
            id: Uuid::new_v4(),
            seq: self.storage.next_seq(),
            credit_id: credit.id,
            from: Party::Identity(owner),
            to: Party::Retired,
            units: credit.units,
            kind: TransactionKind::Retire,
            provenance_token: ProvenanceToken::generate(),
            timestamp: Utc::now(),
        };

        self.storage.record_retire(&credit, &tx)?;

        tracing::info!(
            credit_id = %credit.id,
            requested_by = %requester.id,
            "Credit retired"
        );

        Ok(credit)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Resolve or create an identity
    pub async fn resolve_identity(&self, request: LoginRequest) -> Result<Identity> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::ResolveIdentity {
                request,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Mint a credit
    pub async fn mint(&self, producer_id: Uuid, request: MintRequest) -> Result<Credit> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Mint {
                producer_id,
                request,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Transfer a credit
    pub async fn transfer(&self, request: TransferRequest) -> Result<Transaction> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Transfer {
                request,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Retire a credit
    pub async fn retire(&self, request: RetireRequest) -> Result<Credit> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Retire {
                request,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(storage: Arc<Storage>) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
