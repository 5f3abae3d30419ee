//! Persistence interfaces for entries and off-ledger metadata
//!
//! The document store itself is an external collaborator; the ledger only
//! talks to these traits. The in-memory implementations provide exact
//! single-process semantics for tests and tooling.
//!
//! Atomicity: all postings of one entry land together or not at all, and a
//! persisted entry is never modified afterwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::accounts::LedgerAccountId;
use crate::entry::{EntryDirection, LedgerEntry, TxMetadata};
use crate::types::WalletCurrency;
use crate::{Error, Result};

/// Metadata keys the facade stamps on every posting
pub mod metadata_keys {
    /// Satoshi leg of the entry amount
    pub const SATS_AMOUNT: &str = "sats_amount";
    /// Cents leg of the entry amount
    pub const CENTS_AMOUNT: &str = "cents_amount";
    /// Satoshi leg of the entry fee
    pub const SATS_FEE: &str = "sats_fee";
    /// Cents leg of the entry fee
    pub const CENTS_FEE: &str = "cents_fee";
    /// True while the entry awaits settlement
    pub const PENDING: &str = "pending";
    /// Ledger transaction type
    pub const TX_TYPE: &str = "type";
}

/// One persisted posting, as read back from the store.
///
/// The currency tag is optional because rows written before tagging was
/// introduced lack it; readers must treat such rows as satoshi-denominated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Row id
    pub id: Uuid,
    /// Entry this row belongs to
    pub entry_id: Uuid,
    /// Account the row is against
    pub account_id: LedgerAccountId,
    /// Currency tag; `None` on legacy rows
    pub currency: Option<WalletCurrency>,
    /// Debited quantity in minor units, zero for credit rows
    pub debit: u64,
    /// Credited quantity in minor units, zero for debit rows
    pub credit: u64,
    /// Satoshi leg of the entry amount
    pub sats_amount: u64,
    /// Cents leg of the entry amount
    pub cents_amount: u64,
    /// Satoshi leg of the entry fee
    pub sats_fee: u64,
    /// Cents leg of the entry fee
    pub cents_fee: u64,
    /// True while the entry awaits settlement
    pub pending: bool,
    /// Entry description
    pub description: String,
    /// Posting metadata
    pub metadata: TxMetadata,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

fn metadata_u64(metadata: &TxMetadata, key: &str) -> u64 {
    metadata.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
}

impl LedgerTransaction {
    fn from_entry(entry: &LedgerEntry, posting_index: usize) -> Self {
        let posting = &entry.postings()[posting_index];
        let (debit, credit) = match posting.direction {
            EntryDirection::Debit => (posting.amount, 0),
            EntryDirection::Credit => (0, posting.amount),
        };
        Self {
            id: Uuid::new_v4(),
            entry_id: entry.id,
            account_id: posting.account_id,
            currency: Some(posting.currency),
            debit,
            credit,
            sats_amount: metadata_u64(&posting.metadata, metadata_keys::SATS_AMOUNT),
            cents_amount: metadata_u64(&posting.metadata, metadata_keys::CENTS_AMOUNT),
            sats_fee: metadata_u64(&posting.metadata, metadata_keys::SATS_FEE),
            cents_fee: metadata_u64(&posting.metadata, metadata_keys::CENTS_FEE),
            pending: posting
                .metadata
                .get(metadata_keys::PENDING)
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            description: entry.description.clone(),
            metadata: posting.metadata.clone(),
            created_at: entry.created_at,
        }
    }
}

/// Writer and reader of ledger entries
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist an entry atomically, returning its rows.
    ///
    /// Rejects unbalanced entries and duplicate entry ids.
    async fn persist_entry(&self, entry: LedgerEntry) -> Result<Vec<LedgerTransaction>>;

    /// Fetch an entry by id
    async fn find_entry(&self, id: Uuid) -> Result<LedgerEntry>;

    /// All rows against one account, oldest first
    async fn transactions_for_account(
        &self,
        account_id: LedgerAccountId,
    ) -> Result<Vec<LedgerTransaction>>;
}

/// Off-ledger correlation record for one ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadataRecord {
    /// Ledger row id the record belongs to
    pub id: Uuid,
    /// Payment hash or on-chain tx hash, when the row has one
    pub hash: Option<String>,
}

/// Repository of off-ledger transaction metadata keyed by correlation hash
#[async_trait]
pub trait TransactionMetadataRepository: Send + Sync {
    /// Persist records, tolerating replays of already-persisted ones
    async fn persist_all(&self, records: Vec<TransactionMetadataRecord>) -> Result<()>;

    /// Find a record by its correlation hash
    async fn find_by_hash(&self, hash: &str) -> Result<Option<TransactionMetadataRecord>>;

    /// Find a record by its row id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionMetadataRecord>>;
}

#[derive(Default)]
struct MemoryLedgerInner {
    entries: HashMap<Uuid, LedgerEntry>,
    transactions: Vec<LedgerTransaction>,
}

/// In-memory [`LedgerStore`]
#[derive(Default)]
pub struct MemoryLedgerStore {
    inner: RwLock<MemoryLedgerInner>,
}

impl MemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn persist_entry(&self, entry: LedgerEntry) -> Result<Vec<LedgerTransaction>> {
        if let Some((currency, debits, credits)) = entry.first_imbalance() {
            return Err(Error::UnbalancedEntry {
                currency,
                debits,
                credits,
            });
        }

        let rows: Vec<LedgerTransaction> = (0..entry.postings().len())
            .map(|i| LedgerTransaction::from_entry(&entry, i))
            .collect();

        let mut inner = self.inner.write();
        if inner.entries.contains_key(&entry.id) {
            return Err(Error::Storage(format!(
                "entry {} already persisted",
                entry.id
            )));
        }
        inner.entries.insert(entry.id, entry);
        inner.transactions.extend(rows.clone());
        Ok(rows)
    }

    async fn find_entry(&self, id: Uuid) -> Result<LedgerEntry> {
        self.inner
            .read()
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::EntryNotFound(id.to_string()))
    }

    async fn transactions_for_account(
        &self,
        account_id: LedgerAccountId,
    ) -> Result<Vec<LedgerTransaction>> {
        Ok(self
            .inner
            .read()
            .transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct MemoryMetadataInner {
    by_id: HashMap<Uuid, TransactionMetadataRecord>,
    by_hash: HashMap<String, Uuid>,
}

/// In-memory [`TransactionMetadataRepository`]
#[derive(Default)]
pub struct MemoryTransactionMetadataRepository {
    inner: RwLock<MemoryMetadataInner>,
}

impl MemoryTransactionMetadataRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionMetadataRepository for MemoryTransactionMetadataRepository {
    async fn persist_all(&self, records: Vec<TransactionMetadataRecord>) -> Result<()> {
        let mut inner = self.inner.write();
        for record in records {
            if inner.by_id.contains_key(&record.id) {
                debug!(id = %record.id, "transaction metadata already persisted");
                continue;
            }
            if let Some(hash) = &record.hash {
                if inner.by_hash.contains_key(hash) {
                    // a replayed write for the same hash is a benign conflict
                    debug!(hash = %hash, "transaction metadata hash already mapped");
                    continue;
                }
                inner.by_hash.insert(hash.clone(), record.id);
            }
            inner.by_id.insert(record.id, record);
        }
        Ok(())
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<TransactionMetadataRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .by_hash
            .get(hash)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionMetadataRecord>> {
        Ok(self.inner.read().by_id.get(&id).cloned())
    }
}
