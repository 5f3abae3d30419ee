//! Error types for payment flows

use thiserror::Error;

use ledger_core::WalletCurrency;

/// Result type for payment-flow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Payment-flow errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Balance presented in a currency other than the sender wallet's
    #[error("Invalid currency for wallet: expected {expected}, got {actual}")]
    InvalidCurrencyForWallet {
        /// The sender wallet's currency
        expected: WalletCurrency,
        /// Currency of the presented balance
        actual: WalletCurrency,
    },

    /// Balance cannot cover the amount plus fees
    #[error("Insufficient balance: {balance} available, {required} required")]
    InsufficientBalance {
        /// Available balance in minor units
        balance: u64,
        /// Amount plus fees in minor units
        required: u64,
    },

    /// Amount plus fees overflows the minor-unit range
    #[error("Amount overflow computing total send amount")]
    AmountOverflow,
}
