//! SatBank Payment Flows
//!
//! The in-flight representation of a payment attempt: amounts and fees in
//! the settlement currency and its shadow, balance-sufficiency checks, and
//! recovery of the original input amount from persisted ledger rows.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod flow;
pub mod types;

pub use error::{Error, Result};
pub use flow::{input_amount_from_ledger_transaction, PaymentFlow};
pub use types::{PaymentInitiationMethod, SettlementMethod};
