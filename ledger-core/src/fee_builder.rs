//! Two-stage builder for fee-reconciliation entries
//!
//! Carries no principal, only a BTC fee delta between the bank owner and the
//! on-chain rail. Like the full builder, the stages are distinct types, so
//! the only possible output is one balanced two-posting entry.

use crate::accounts::{LedgerAccountId, StaticAccountIds};
use crate::entry::{LedgerEntry, TxMetadata};
use crate::types::{BtcPaymentAmount, WalletCurrency};

/// Inputs to the fee-only builder
#[derive(Debug)]
pub struct FeeOnlyEntryBuilderConfig {
    /// Resolved static system accounts
    pub static_account_ids: StaticAccountIds,
    /// Entry scaffold the postings are added to
    pub entry: LedgerEntry,
    /// Metadata stamped on both postings
    pub metadata: TxMetadata,
    /// Fee delta being booked
    pub btc_fee: BtcPaymentAmount,
}

/// Fee-only builder, debit stage
pub struct FeeOnlyEntryBuilder {
    accounts: StaticAccountIds,
    entry: LedgerEntry,
    metadata: TxMetadata,
    btc_fee: BtcPaymentAmount,
}

impl FeeOnlyEntryBuilder {
    /// Start building a fee-only entry
    pub fn new(config: FeeOnlyEntryBuilderConfig) -> Self {
        Self {
            accounts: config.static_account_ids,
            entry: config.entry,
            metadata: config.metadata,
            btc_fee: config.btc_fee,
        }
    }

    /// Debit the bank owner (actual fee exceeded the estimate)
    pub fn debit_bank_owner(self) -> FeeOnlyEntryBuilderCredit {
        let account = self.accounts.bank_owner;
        self.debit(account)
    }

    /// Debit the on-chain rail (estimate exceeded the actual fee)
    pub fn debit_on_chain(self) -> FeeOnlyEntryBuilderCredit {
        let account = self.accounts.on_chain;
        self.debit(account)
    }

    fn debit(mut self, account: LedgerAccountId) -> FeeOnlyEntryBuilderCredit {
        self.entry.debit(
            account,
            WalletCurrency::Btc,
            self.btc_fee.amount(),
            self.metadata.clone(),
        );
        FeeOnlyEntryBuilderCredit {
            accounts: self.accounts,
            entry: self.entry,
            metadata: self.metadata,
            btc_fee: self.btc_fee,
        }
    }
}

/// Fee-only builder, credit stage
pub struct FeeOnlyEntryBuilderCredit {
    accounts: StaticAccountIds,
    entry: LedgerEntry,
    metadata: TxMetadata,
    btc_fee: BtcPaymentAmount,
}

impl FeeOnlyEntryBuilderCredit {
    /// Credit the bank owner
    pub fn credit_bank_owner(self) -> LedgerEntry {
        let account = self.accounts.bank_owner;
        self.credit(account)
    }

    /// Credit the on-chain rail
    pub fn credit_on_chain(self) -> LedgerEntry {
        let account = self.accounts.on_chain;
        self.credit(account)
    }

    fn credit(mut self, account: LedgerAccountId) -> LedgerEntry {
        self.entry.credit(
            account,
            WalletCurrency::Btc,
            self.btc_fee.amount(),
            self.metadata,
        );
        self.entry
    }
}
