//! Error types for the ledger

use thiserror::Error;

use crate::types::WalletCurrency;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Price ratio constructed from a zero numerator or denominator
    #[error("Invalid zero amount in price ratio input")]
    InvalidZeroAmountPriceRatioInput,

    /// Amount outside the valid range for its currency
    #[error("Invalid {currency} amount: {amount}")]
    InvalidAmount {
        /// Currency of the rejected amount
        currency: WalletCurrency,
        /// Raw quantity that was rejected
        amount: u64,
    },

    /// Arithmetic overflow on a monetary amount
    #[error("Amount overflow: {0}")]
    AmountOverflow(&'static str),

    /// Subtraction would produce a negative monetary amount
    #[error("Amount underflow: {0}")]
    AmountUnderflow(&'static str),

    /// Division of an amount by zero
    #[error("Division of an amount by zero")]
    DivisionByZero,

    /// Bank fee exceeds the total amount it would be taken from
    #[error("Bank fee exceeds total {currency} amount")]
    FeeExceedsTotal {
        /// Currency in which the fee exceeded the total
        currency: WalletCurrency,
    },

    /// Entry failed the per-currency debits == credits check
    #[error("Unbalanced {currency} entry: debits {debits}, credits {credits}")]
    UnbalancedEntry {
        /// Currency that failed the check
        currency: WalletCurrency,
        /// Sum of debit postings
        debits: u64,
        /// Sum of credit postings
        credits: u64,
    },

    /// A static system account could not be resolved at startup
    #[error("Could not resolve static account: {0}")]
    StaticAccountResolution(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Entry not found
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
