//! SatBank Ledger Core
//!
//! Double-entry accounting core for a custodial Bitcoin/Lightning wallet
//! platform.
//!
//! # Architecture
//!
//! - **Currency-tagged amounts**: integer minor units with the currency in
//!   the type; cross-currency arithmetic does not compile
//! - **Staged entry builder**: each builder stage is its own type, so the
//!   only reachable output is one balanced entry
//! - **Facade over repositories**: persistence is behind traits; the store
//!   accepts an entry atomically or not at all
//!
//! # Invariants
//!
//! - Money conservation: per currency, Σ(debits) == Σ(credits) in every entry
//! - Append-only: entries are never modified; corrections are new entries
//! - No floating point touches a monetary amount

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod accounts;
pub mod amount;
pub mod builder;
pub mod config;
pub mod entry;
pub mod error;
pub mod fee_builder;
pub mod ledger;
pub mod price_ratio;
pub mod storage;
pub mod types;

// Re-exports
pub use accounts::{
    resolve_static_account_ids, AccountResolver, LedgerAccountDescriptor, LedgerAccountId,
    StaticAccountIds, StaticAccountNames, WalletDescriptor,
};
pub use amount::AmountCalculator;
pub use builder::{AmountsWithFees, BankFee, EntryBuilder, EntryBuilderConfig};
pub use config::LedgerConfig;
pub use entry::{EntryDirection, LedgerEntry, Posting, TxMetadata};
pub use error::{Error, Result};
pub use fee_builder::{FeeOnlyEntryBuilder, FeeOnlyEntryBuilderConfig};
pub use ledger::{
    Ledger, PaymentRail, RecordFeeReconciliationArgs, RecordIntraledgerArgs, RecordReceiveArgs,
    RecordSendArgs,
};
pub use price_ratio::{DisplayPriceRatio, PriceRatio, WalletPriceRatio, RATIO_PRECISION};
pub use storage::{
    LedgerStore, LedgerTransaction, MemoryLedgerStore, MemoryTransactionMetadataRepository,
    TransactionMetadataRecord, TransactionMetadataRepository,
};
pub use types::{
    AccountId, BalanceAmount, BitcoinNetwork, BtcPaymentAmount, Currency, OnChainAddress,
    OnChainTxHash, OnChainTxVout, PaymentAmount, PaymentAmounts, PaymentHash, PayoutId,
    UsdPaymentAmount, WalletCurrency, WalletId, ZERO_CENTS, ZERO_SATS,
};
