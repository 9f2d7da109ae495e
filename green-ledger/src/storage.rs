//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `identities` - Identity records (key: identity_id)
//! - `credits` - Canonical credit state (key: credit_id)
//! - `transactions` - Append-only transaction log (key: big-endian seq)
//! - `indices` - Secondary indices (name uniqueness, ownership, credit history)
//!
//! The transaction log has no update or delete path: entries are written once
//! inside a mutation batch and only ever read back. Each of `record_mint`,
//! `record_transfer`, and `record_retire` commits the credit update and the
//! log append in a single `WriteBatch`, so either both land or neither does.

use crate::{
    error::{Error, Result},
    types::{Credit, CreditSummary, Identity, Transaction, TransactionFilter},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_IDENTITIES: &str = "identities";
const CF_CREDITS: &str = "credits";
const CF_TRANSACTIONS: &str = "transactions";
const CF_INDICES: &str = "indices";

/// Index key prefixes
const IDX_NAME: &[u8] = b"name|";
const IDX_OWNER: &[u8] = b"own|";
const IDX_CREDIT_TX: &[u8] = b"ct|";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,

    /// Next log insertion sequence, recovered from the log tail at open
    next_seq: AtomicU64,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_IDENTITIES, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_CREDITS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let storage = Self {
            db: Arc::new(db),
            next_seq: AtomicU64::new(0),
        };
        storage.recover_next_seq()?;

        tracing::info!(path = %path.display(), "Opened RocksDB");

        Ok(storage)
    }

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        // Current state is frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Recover the sequence counter from the last log key
    fn recover_next_seq(&self) -> Result<()> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let mut iter = self.db.iterator_cf(cf, IteratorMode::End);

        if let Some(item) = iter.next() {
            let (key, _) = item?;
            let seq_bytes: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Malformed transaction key".to_string()))?;
            self.next_seq
                .store(u64::from_be_bytes(seq_bytes) + 1, Ordering::SeqCst);
        }

        Ok(())
    }

    /// Claim the next log insertion sequence
    pub fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    // Identity operations

    /// Persist a new identity together with its name-uniqueness index entry
    pub fn create_identity(&self, identity: &Identity) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_identities = self.cf_handle(CF_IDENTITIES)?;
        batch.put_cf(
            cf_identities,
            identity.id.as_bytes(),
            bincode::serialize(identity)?,
        );

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            cf_indices,
            Self::index_key_name(&identity.name),
            identity.id.as_bytes(),
        );

        self.db.write(batch)?;

        tracing::debug!(
            identity_id = %identity.id,
            name = %identity.name,
            role = %identity.role,
            "Identity created"
        );

        Ok(())
    }

    /// Get identity by ID
    pub fn get_identity(&self, identity_id: Uuid) -> Result<Identity> {
        let cf = self.cf_handle(CF_IDENTITIES)?;

        let value = self
            .db
            .get_cf(cf, identity_id.as_bytes())?
            .ok_or_else(|| Error::IdentityNotFound(identity_id.to_string()))?;

        Ok(bincode::deserialize(&value)?)
    }

    /// Look up an identity by its unique name
    pub fn find_identity_by_name(&self, name: &str) -> Result<Option<Identity>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let id_bytes = match self.db.get_cf(cf_indices, Self::index_key_name(name))? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let id_bytes: [u8; 16] = id_bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::Storage("Malformed name index entry".to_string()))?;

        self.get_identity(Uuid::from_bytes(id_bytes)).map(Some)
    }

    // Credit operations

    /// Get credit by ID
    pub fn get_credit(&self, credit_id: Uuid) -> Result<Credit> {
        let cf = self.cf_handle(CF_CREDITS)?;

        let value = self
            .db
            .get_cf(cf, credit_id.as_bytes())?
            .ok_or_else(|| Error::CreditNotFound(credit_id.to_string()))?;

        Ok(bincode::deserialize(&value)?)
    }

    /// Credits currently owned by `owner_id`, regardless of origin
    pub fn credits_owned_by(&self, owner_id: Uuid) -> Result<Vec<Credit>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::index_key_owner(owner_id, None);
        let iter = self.db.prefix_iterator_cf(cf_indices, &prefix);

        let mut credits = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }

            let credit_id_bytes: [u8; 16] = key[prefix.len()..]
                .try_into()
                .map_err(|_| Error::Storage("Malformed owner index entry".to_string()))?;
            credits.push(self.get_credit(Uuid::from_bytes(credit_id_bytes))?);
        }

        Ok(credits)
    }

    /// All credits still in circulation
    pub fn active_credits(&self) -> Result<Vec<Credit>> {
        let cf = self.cf_handle(CF_CREDITS)?;

        let mut credits = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let credit: Credit = bincode::deserialize(&value)?;
            if !credit.is_retired {
                credits.push(credit);
            }
        }

        Ok(credits)
    }

    /// Aggregate counts over all credits ever minted
    pub fn credit_summary(&self) -> Result<CreditSummary> {
        let cf = self.cf_handle(CF_CREDITS)?;

        let mut total = 0u64;
        let mut retired = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let credit: Credit = bincode::deserialize(&value)?;
            total += 1;
            if credit.is_retired {
                retired += 1;
            }
        }

        Ok(CreditSummary {
            total,
            active: total - retired,
            retired,
        })
    }

    // Mutation batches (atomic)

    /// Persist a freshly minted credit with its genesis transaction
    pub fn record_mint(&self, credit: &Credit, tx: &Transaction) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_credits = self.cf_handle(CF_CREDITS)?;
        batch.put_cf(cf_credits, credit.id.as_bytes(), bincode::serialize(credit)?);

        self.stage_transaction(&mut batch, tx)?;

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            cf_indices,
            Self::index_key_owner(credit.owner_id, Some(credit.id)),
            b"",
        );

        self.db.write(batch)?;

        tracing::debug!(
            credit_id = %credit.id,
            owner_id = %credit.owner_id,
            units = %credit.units,
            "Mint recorded"
        );

        Ok(())
    }

    /// Persist an ownership change with its transfer transaction
    pub fn record_transfer(
        &self,
        credit: &Credit,
        previous_owner: Uuid,
        tx: &Transaction,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_credits = self.cf_handle(CF_CREDITS)?;
        batch.put_cf(cf_credits, credit.id.as_bytes(), bincode::serialize(credit)?);

        self.stage_transaction(&mut batch, tx)?;

        // Move the ownership index entry
        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.delete_cf(
            cf_indices,
            Self::index_key_owner(previous_owner, Some(credit.id)),
        );
        batch.put_cf(
            cf_indices,
            Self::index_key_owner(credit.owner_id, Some(credit.id)),
            b"",
        );

        self.db.write(batch)?;

        tracing::debug!(
            credit_id = %credit.id,
            from = %previous_owner,
            to = %credit.owner_id,
            "Transfer recorded"
        );

        Ok(())
    }

    /// Persist a retirement flag flip with its retire transaction
    pub fn record_retire(&self, credit: &Credit, tx: &Transaction) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_credits = self.cf_handle(CF_CREDITS)?;
        batch.put_cf(cf_credits, credit.id.as_bytes(), bincode::serialize(credit)?);

        self.stage_transaction(&mut batch, tx)?;

        self.db.write(batch)?;

        tracing::debug!(credit_id = %credit.id, "Retirement recorded");

        Ok(())
    }

    /// Stage a log append plus its credit-history index entry
    fn stage_transaction(&self, batch: &mut WriteBatch, tx: &Transaction) -> Result<()> {
        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;
        batch.put_cf(cf_transactions, tx.seq.to_be_bytes(), bincode::serialize(tx)?);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(cf_indices, Self::index_key_credit_tx(tx.credit_id, tx.seq), b"");

        Ok(())
    }

    // Log queries

    /// Get a single log entry by insertion sequence
    pub fn get_transaction(&self, seq: u64) -> Result<Transaction> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let value = self
            .db
            .get_cf(cf, seq.to_be_bytes())?
            .ok_or_else(|| Error::Storage(format!("Transaction seq {} not found", seq)))?;

        Ok(bincode::deserialize(&value)?)
    }

    /// Full movement history of one credit, in log order
    pub fn credit_history(&self, credit_id: Uuid) -> Result<Vec<Transaction>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::index_key_credit_tx_prefix(credit_id);
        let iter = self.db.prefix_iterator_cf(cf_indices, &prefix);

        let mut history = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }

            let seq_bytes: [u8; 8] = key[prefix.len()..]
                .try_into()
                .map_err(|_| Error::Storage("Malformed history index entry".to_string()))?;
            history.push(self.get_transaction(u64::from_be_bytes(seq_bytes))?);
        }

        Ok(history)
    }

    /// Query the log with a filter
    ///
    /// Results are ordered by timestamp ascending; the scan walks keys in
    /// insertion order and the sort is stable, so ties keep insertion order.
    pub fn query_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let mut matches = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let tx: Transaction = bincode::deserialize(&value)?;
            if filter.matches(&tx) {
                matches.push(tx);
            }
        }

        matches.sort_by_key(|tx| tx.timestamp);

        Ok(matches)
    }

    // Index key helpers

    fn index_key_name(name: &str) -> Vec<u8> {
        let mut key = IDX_NAME.to_vec();
        key.extend_from_slice(name.as_bytes());
        key
    }

    fn index_key_owner(owner_id: Uuid, credit_id: Option<Uuid>) -> Vec<u8> {
        let mut key = IDX_OWNER.to_vec();
        key.extend_from_slice(owner_id.as_bytes());
        if let Some(cid) = credit_id {
            key.extend_from_slice(cid.as_bytes());
        }
        key
    }

    fn index_key_credit_tx_prefix(credit_id: Uuid) -> Vec<u8> {
        let mut key = IDX_CREDIT_TX.to_vec();
        key.extend_from_slice(credit_id.as_bytes());
        key
    }

    fn index_key_credit_tx(credit_id: Uuid, seq: u64) -> Vec<u8> {
        let mut key = Self::index_key_credit_tx_prefix(credit_id);
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let mut stats = StorageStats {
            total_identities: 0,
            total_credits: 0,
            total_transactions: 0,
        };

        let cf = self.cf_handle(CF_IDENTITIES)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            stats.total_identities += 1;
        }

        let cf = self.cf_handle(CF_CREDITS)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            stats.total_credits += 1;
        }

        stats.total_transactions = self.next_seq.load(Ordering::SeqCst);

        Ok(stats)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Identities ever created
    pub total_identities: u64,
    /// Credits ever minted
    pub total_credits: u64,
    /// Log entries ever appended
    pub total_transactions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Party, ProvenanceToken, Role, TransactionKind};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_credit(owner: Uuid) -> Credit {
        Credit {
            id: Uuid::new_v4(),
            batch_id: "B1".to_string(),
            producer_id: owner,
            owner_id: owner,
            units: Decimal::new(1005, 1), // 100.5
            production_date: Utc::now(),
            created_at: Utc::now(),
            is_retired: false,
            provenance_token: ProvenanceToken::generate(),
        }
    }

    fn test_transaction(storage: &Storage, credit: &Credit, to: Uuid) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            seq: storage.next_seq(),
            credit_id: credit.id,
            from: Party::System,
            to: Party::Identity(to),
            units: credit.units,
            kind: TransactionKind::Mint,
            provenance_token: credit.provenance_token.clone(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_storage_open() {
        let (storage, _temp) = test_storage();
        assert!(storage.db.cf_handle(CF_IDENTITIES).is_some());
        assert!(storage.db.cf_handle(CF_CREDITS).is_some());
        assert!(storage.db.cf_handle(CF_TRANSACTIONS).is_some());
        assert!(storage.db.cf_handle(CF_INDICES).is_some());
    }

    #[test]
    fn test_identity_roundtrip_and_name_lookup() {
        let (storage, _temp) = test_storage();

        let identity = Identity::new("producer1", Role::Producer);
        storage.create_identity(&identity).unwrap();

        let by_id = storage.get_identity(identity.id).unwrap();
        assert_eq!(by_id, identity);

        let by_name = storage.find_identity_by_name("producer1").unwrap();
        assert_eq!(by_name, Some(identity));

        assert!(storage.find_identity_by_name("nobody").unwrap().is_none());
    }

    #[test]
    fn test_record_mint_atomic_pair() {
        let (storage, _temp) = test_storage();
        let producer = Uuid::new_v4();

        let credit = test_credit(producer);
        let tx = test_transaction(&storage, &credit, producer);

        storage.record_mint(&credit, &tx).unwrap();

        assert_eq!(storage.get_credit(credit.id).unwrap(), credit);
        assert_eq!(storage.get_transaction(tx.seq).unwrap(), tx);

        let owned = storage.credits_owned_by(producer).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, credit.id);
    }

    #[test]
    fn test_record_transfer_moves_ownership_index() {
        let (storage, _temp) = test_storage();
        let producer = Uuid::new_v4();
        let buyer = Uuid::new_v4();

        let mut credit = test_credit(producer);
        let mint_tx = test_transaction(&storage, &credit, producer);
        storage.record_mint(&credit, &mint_tx).unwrap();

        credit.owner_id = buyer;
        let transfer_tx = Transaction {
            id: Uuid::new_v4(),
            seq: storage.next_seq(),
            credit_id: credit.id,
            from: Party::Identity(producer),
            to: Party::Identity(buyer),
            units: credit.units,
            kind: TransactionKind::Transfer,
            provenance_token: ProvenanceToken::generate(),
            timestamp: Utc::now(),
        };
        storage
            .record_transfer(&credit, producer, &transfer_tx)
            .unwrap();

        assert!(storage.credits_owned_by(producer).unwrap().is_empty());
        let owned = storage.credits_owned_by(buyer).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].owner_id, buyer);
    }

    #[test]
    fn test_credit_history_in_log_order() {
        let (storage, _temp) = test_storage();
        let producer = Uuid::new_v4();
        let buyer = Uuid::new_v4();

        let mut credit = test_credit(producer);
        let mint_tx = test_transaction(&storage, &credit, producer);
        storage.record_mint(&credit, &mint_tx).unwrap();

        credit.owner_id = buyer;
        let transfer_tx = Transaction {
            id: Uuid::new_v4(),
            seq: storage.next_seq(),
            credit_id: credit.id,
            from: Party::Identity(producer),
            to: Party::Identity(buyer),
            units: credit.units,
            kind: TransactionKind::Transfer,
            provenance_token: ProvenanceToken::generate(),
            timestamp: Utc::now(),
        };
        storage
            .record_transfer(&credit, producer, &transfer_tx)
            .unwrap();

        // Unrelated credit does not pollute the history
        let other = test_credit(producer);
        let other_tx = test_transaction(&storage, &other, producer);
        storage.record_mint(&other, &other_tx).unwrap();

        let history = storage.credit_history(credit.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TransactionKind::Mint);
        assert_eq!(history[1].kind, TransactionKind::Transfer);
    }

    #[test]
    fn test_query_transactions_filters() {
        let (storage, _temp) = test_storage();
        let producer = Uuid::new_v4();
        let buyer = Uuid::new_v4();

        let credit = test_credit(producer);
        let mint_tx = test_transaction(&storage, &credit, producer);
        storage.record_mint(&credit, &mint_tx).unwrap();

        let mut moved = credit.clone();
        moved.owner_id = buyer;
        let transfer_tx = Transaction {
            id: Uuid::new_v4(),
            seq: storage.next_seq(),
            credit_id: credit.id,
            from: Party::Identity(producer),
            to: Party::Identity(buyer),
            units: credit.units,
            kind: TransactionKind::Transfer,
            provenance_token: ProvenanceToken::generate(),
            timestamp: Utc::now(),
        };
        storage
            .record_transfer(&moved, producer, &transfer_tx)
            .unwrap();

        let all = storage
            .query_transactions(&TransactionFilter::default())
            .unwrap();
        assert_eq!(all.len(), 2);

        let purchases = storage
            .query_transactions(&TransactionFilter {
                to: Some(Party::Identity(buyer)),
                kind: Some(TransactionKind::Transfer),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].id, transfer_tx.id);

        let mints = storage
            .query_transactions(&TransactionFilter {
                kind: Some(TransactionKind::Mint),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(mints.len(), 1);
        assert_eq!(mints[0].from, Party::System);
    }

    #[test]
    fn test_seq_recovered_after_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let first_seq;
        {
            let storage = Storage::open(&config).unwrap();
            let producer = Uuid::new_v4();
            let credit = test_credit(producer);
            let tx = test_transaction(&storage, &credit, producer);
            first_seq = tx.seq;
            storage.record_mint(&credit, &tx).unwrap();
            storage.close().unwrap();
        }

        let storage = Storage::open(&config).unwrap();
        assert_eq!(storage.next_seq(), first_seq + 1);
    }

    #[test]
    fn test_summary_counts() {
        let (storage, _temp) = test_storage();
        let producer = Uuid::new_v4();

        for retired in [false, false, true] {
            let mut credit = test_credit(producer);
            credit.is_retired = retired;
            let tx = test_transaction(&storage, &credit, producer);
            storage.record_mint(&credit, &tx).unwrap();
        }

        let summary = storage.credit_summary().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.retired, 1);

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.total_credits, 3);
        assert_eq!(stats.total_transactions, 3);
    }
}
