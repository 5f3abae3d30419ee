//! Payment method classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a payment was technically delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementMethod {
    /// Settled inside the ledger, no network involved
    IntraLedger,
    /// Settled on the Bitcoin blockchain
    OnChain,
    /// Settled over the Lightning network
    Lightning,
}

impl fmt::Display for SettlementMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SettlementMethod::IntraLedger => "intraledger",
            SettlementMethod::OnChain => "onchain",
            SettlementMethod::Lightning => "lightning",
        };
        write!(f, "{}", s)
    }
}

/// How a payment was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentInitiationMethod {
    /// Addressed to another wallet on the platform
    IntraLedger,
    /// Addressed to an on-chain address
    OnChain,
    /// Addressed to a Lightning invoice
    Lightning,
}

impl fmt::Display for PaymentInitiationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentInitiationMethod::IntraLedger => "intraledger",
            PaymentInitiationMethod::OnChain => "onchain",
            PaymentInitiationMethod::Lightning => "lightning",
        };
        write!(f, "{}", s)
    }
}
