//! In-flight representation of a single payment attempt
//!
//! A [`PaymentFlow`] is built when a send is initiated, carries the amounts
//! and fees in both the settlement currency and its shadow, and is discarded
//! once settlement or failure has been recorded to the ledger. The flow is
//! where balance sufficiency is decided, before the ledger facade is ever
//! invoked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledger_core::{
    AccountId, BalanceAmount, BtcPaymentAmount, LedgerTransaction, OnChainAddress, PaymentAmounts,
    PaymentHash, UsdPaymentAmount, WalletCurrency, WalletId,
};

use crate::types::{PaymentInitiationMethod, SettlementMethod};
use crate::{Error, Result};

/// One payment attempt, prior to ledger commitment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFlow {
    /// Wallet the payment is debited from
    pub sender_wallet_id: WalletId,
    /// Account owning the sender wallet
    pub sender_account_id: AccountId,
    /// How the payment will settle
    pub settlement_method: SettlementMethod,
    /// How the payment was requested
    pub initiation_method: PaymentInitiationMethod,

    /// Invoice payment hash, for Lightning flows
    pub payment_hash: Option<PaymentHash>,
    /// Destination address, for on-chain flows
    pub address: Option<OnChainAddress>,

    /// Satoshi leg of the principal
    pub btc_payment_amount: BtcPaymentAmount,
    /// Cents shadow leg of the principal
    pub usd_payment_amount: UsdPaymentAmount,
    /// Satoshi leg of the protocol (network) fee
    pub btc_protocol_fee: BtcPaymentAmount,
    /// Cents leg of the protocol fee
    pub usd_protocol_fee: UsdPaymentAmount,
    /// Satoshi leg of the bank fee
    pub btc_bank_fee: BtcPaymentAmount,
    /// Cents leg of the bank fee
    pub usd_bank_fee: UsdPaymentAmount,

    /// Principal in the sender wallet's own currency
    pub input_amount: u64,
    /// Currency of the sender wallet
    pub sender_wallet_currency: WalletCurrency,

    /// When the attempt was created
    pub created_at: DateTime<Utc>,
    /// True while the payment is out on the network awaiting settlement
    pub payment_sent_and_pending: bool,
}

impl PaymentFlow {
    /// Principal in both currencies
    pub fn payment_amounts(&self) -> PaymentAmounts {
        PaymentAmounts {
            btc: self.btc_payment_amount,
            usd: self.usd_payment_amount,
        }
    }

    /// Protocol fee in both currencies
    pub fn protocol_fees(&self) -> PaymentAmounts {
        PaymentAmounts {
            btc: self.btc_protocol_fee,
            usd: self.usd_protocol_fee,
        }
    }

    /// Bank fee in both currencies
    pub fn bank_fees(&self) -> PaymentAmounts {
        PaymentAmounts {
            btc: self.btc_bank_fee,
            usd: self.usd_bank_fee,
        }
    }

    /// Amount the sender must cover, in the sender wallet's currency
    pub fn total_send_amount(&self) -> Result<u64> {
        let (protocol_fee, bank_fee) = match self.sender_wallet_currency {
            WalletCurrency::Btc => (
                self.btc_protocol_fee.amount(),
                self.btc_bank_fee.amount(),
            ),
            WalletCurrency::Usd => (
                self.usd_protocol_fee.amount(),
                self.usd_bank_fee.amount(),
            ),
        };
        self.input_amount
            .checked_add(protocol_fee)
            .and_then(|total| total.checked_add(bank_fee))
            .ok_or(Error::AmountOverflow)
    }

    /// Check that a balance can cover the principal plus fees.
    ///
    /// The balance must be denominated in the sender wallet's currency;
    /// anything else is a validation error regardless of its magnitude.
    pub fn check_balance_for_send(&self, balance: BalanceAmount) -> Result<()> {
        if balance.currency != self.sender_wallet_currency {
            return Err(Error::InvalidCurrencyForWallet {
                expected: self.sender_wallet_currency,
                actual: balance.currency,
            });
        }

        let required = self.total_send_amount()?;
        if balance.amount < required {
            return Err(Error::InsufficientBalance {
                balance: balance.amount,
                required,
            });
        }
        Ok(())
    }
}

/// Recover the original input amount from a persisted ledger row.
///
/// Total over every row shape the ledger has ever produced: USD-tagged rows
/// read the cents column, BTC-tagged rows the sats column, and legacy rows
/// without a currency tag predate USD wallets and are satoshi-denominated.
pub fn input_amount_from_ledger_transaction(tx: &LedgerTransaction) -> u64 {
    match tx.currency {
        Some(WalletCurrency::Usd) => tx.cents_amount,
        Some(WalletCurrency::Btc) | None => tx.sats_amount,
    }
}
