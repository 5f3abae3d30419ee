//! Ledger entries and postings
//!
//! One entry is the complete double-entry record of a single business event.
//! Postings are only ever added through the entry builders, and an entry must
//! satisfy, for every currency it touches, sum(debits) == sum(credits)
//! before the store will accept it. Persisted entries are immutable;
//! corrections are new entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::accounts::LedgerAccountId;
use crate::types::WalletCurrency;

/// Free-form metadata attached to a posting
pub type TxMetadata = serde_json::Map<String, serde_json::Value>;

/// Merge two metadata maps; keys in `extra` win.
pub fn merged_metadata(base: &TxMetadata, extra: &TxMetadata) -> TxMetadata {
    let mut out = base.clone();
    for (key, value) in extra {
        out.insert(key.clone(), value.clone());
    }
    out
}

/// Direction of a posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryDirection {
    /// Value flowing out of the account
    Debit,
    /// Value flowing into the account
    Credit,
}

/// One debit or credit line within an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Account the posting is against
    pub account_id: LedgerAccountId,
    /// Currency of the posting
    pub currency: WalletCurrency,
    /// Direction of the posting
    pub direction: EntryDirection,
    /// Quantity in minor units
    pub amount: u64,
    /// Posting metadata
    pub metadata: TxMetadata,
}

/// A balanced set of postings representing one business event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry id
    pub id: Uuid,
    /// Human-readable description
    pub description: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    postings: Vec<Posting>,
}

impl LedgerEntry {
    /// Create an empty entry scaffold
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            created_at: Utc::now(),
            postings: Vec::new(),
        }
    }

    pub(crate) fn debit(
        &mut self,
        account_id: LedgerAccountId,
        currency: WalletCurrency,
        amount: u64,
        metadata: TxMetadata,
    ) {
        self.postings.push(Posting {
            account_id,
            currency,
            direction: EntryDirection::Debit,
            amount,
            metadata,
        });
    }

    pub(crate) fn credit(
        &mut self,
        account_id: LedgerAccountId,
        currency: WalletCurrency,
        amount: u64,
        metadata: TxMetadata,
    ) {
        self.postings.push(Posting {
            account_id,
            currency,
            direction: EntryDirection::Credit,
            amount,
            metadata,
        });
    }

    /// Postings of this entry, in the order they were added
    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Per-currency (debits, credits) totals
    pub fn totals(&self) -> HashMap<WalletCurrency, (u64, u64)> {
        let mut totals: HashMap<WalletCurrency, (u64, u64)> = HashMap::new();
        for posting in &self.postings {
            let entry = totals.entry(posting.currency).or_default();
            match posting.direction {
                EntryDirection::Debit => entry.0 += posting.amount,
                EntryDirection::Credit => entry.1 += posting.amount,
            }
        }
        totals
    }

    /// True when, for every currency present, debits equal credits
    pub fn is_balanced(&self) -> bool {
        self.totals()
            .values()
            .all(|(debits, credits)| debits == credits)
    }

    /// First currency for which debits do not equal credits
    pub fn first_imbalance(&self) -> Option<(WalletCurrency, u64, u64)> {
        self.totals()
            .into_iter()
            .find(|(_, (debits, credits))| debits != credits)
            .map(|(currency, (debits, credits))| (currency, debits, credits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_entry_is_balanced() {
        assert!(LedgerEntry::new("empty").is_balanced());
    }

    #[test]
    fn detects_imbalance_per_currency() {
        let account = LedgerAccountId::new();
        let mut entry = LedgerEntry::new("test");
        entry.debit(account, WalletCurrency::Btc, 100, TxMetadata::new());
        entry.credit(account, WalletCurrency::Btc, 100, TxMetadata::new());
        assert!(entry.is_balanced());

        // balanced in BTC, unbalanced in USD
        entry.debit(account, WalletCurrency::Usd, 5, TxMetadata::new());
        assert!(!entry.is_balanced());
        assert_eq!(
            entry.first_imbalance(),
            Some((WalletCurrency::Usd, 5, 0))
        );
    }

    #[test]
    fn merged_metadata_prefers_extra_keys() {
        let mut base = TxMetadata::new();
        base.insert("memo".to_string(), "base".into());
        base.insert("pending".to_string(), true.into());

        let mut extra = TxMetadata::new();
        extra.insert("memo".to_string(), "extra".into());

        let merged = merged_metadata(&base, &extra);
        assert_eq!(merged["memo"], "extra");
        assert_eq!(merged["pending"], true);
    }
}
