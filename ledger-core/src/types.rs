//! Core domain primitives
//!
//! All types are designed for:
//! - Exact arithmetic (integer minor units, never floating point)
//! - Compile-time currency safety (phantom-tagged amounts)
//! - Memory safety (no unsafe code)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::{Error, Result};

/// Wallet currency of a ledger amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletCurrency {
    /// Bitcoin, denominated in satoshis
    Btc,
    /// US dollar, denominated in cents
    Usd,
}

impl WalletCurrency {
    /// Currency code
    pub fn code(&self) -> &'static str {
        match self {
            WalletCurrency::Btc => "BTC",
            WalletCurrency::Usd => "USD",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BTC" => Some(WalletCurrency::Btc),
            "USD" => Some(WalletCurrency::Usd),
            _ => None,
        }
    }
}

impl fmt::Display for WalletCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::BTC {}
    impl Sealed for super::USD {}
}

/// Compile-time currency marker for [`PaymentAmount`]
pub trait Currency:
    sealed::Sealed + fmt::Debug + Copy + Clone + PartialEq + Eq + Send + Sync + 'static
{
    /// Runtime currency tag
    const CURRENCY: WalletCurrency;

    /// Upper bound on a plausible quantity of minor units.
    ///
    /// Quantities from untrusted inputs are rejected above this bound.
    const MAX_UNITS: u64;
}

/// Bitcoin marker (satoshis)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BTC;

/// US dollar marker (cents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct USD;

impl Currency for BTC {
    const CURRENCY: WalletCurrency = WalletCurrency::Btc;
    // 21M BTC in satoshis
    const MAX_UNITS: u64 = 2_100_000_000_000_000;
}

impl Currency for USD {
    const CURRENCY: WalletCurrency = WalletCurrency::Usd;
    // $10T in cents
    const MAX_UNITS: u64 = 1_000_000_000_000_000;
}

/// A non-negative quantity of minor units tagged with its currency.
///
/// The currency lives in the type, so adding satoshis to cents is a compile
/// error rather than a runtime check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PaymentAmount<C: Currency> {
    amount: u64,
    _currency: PhantomData<C>,
}

impl<C: Currency> PaymentAmount<C> {
    /// Zero units of this currency
    pub const ZERO: Self = Self::new(0);

    /// Create from a trusted quantity of minor units
    pub const fn new(amount: u64) -> Self {
        Self {
            amount,
            _currency: PhantomData,
        }
    }

    /// Create from an untrusted quantity, rejecting implausible magnitudes
    pub fn checked(amount: u64) -> Result<Self> {
        if amount > C::MAX_UNITS {
            return Err(Error::InvalidAmount {
                currency: C::CURRENCY,
                amount,
            });
        }
        Ok(Self::new(amount))
    }

    /// Quantity of minor units
    pub const fn amount(&self) -> u64 {
        self.amount
    }

    /// Runtime currency tag
    pub const fn currency(&self) -> WalletCurrency {
        C::CURRENCY
    }

    /// True when the quantity is zero
    pub const fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Runtime-tagged view of this amount
    pub const fn to_balance(&self) -> BalanceAmount {
        BalanceAmount {
            amount: self.amount,
            currency: C::CURRENCY,
        }
    }
}

impl<C: Currency> fmt::Display for PaymentAmount<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, C::CURRENCY)
    }
}

// the currency lives in the type, so only the quantity crosses serde
impl<C: Currency> Serialize for PaymentAmount<C> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.amount)
    }
}

impl<'de, C: Currency> Deserialize<'de> for PaymentAmount<C> {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Self::new)
    }
}

/// A Bitcoin amount in satoshis
pub type BtcPaymentAmount = PaymentAmount<BTC>;
/// A US dollar amount in cents
pub type UsdPaymentAmount = PaymentAmount<USD>;

/// Zero satoshis
pub const ZERO_SATS: BtcPaymentAmount = BtcPaymentAmount::ZERO;
/// Zero cents
pub const ZERO_CENTS: UsdPaymentAmount = UsdPaymentAmount::ZERO;

/// A BTC/USD amount pair carried wherever value crosses a currency boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentAmounts {
    /// Satoshi leg
    pub btc: BtcPaymentAmount,
    /// Cents leg
    pub usd: UsdPaymentAmount,
}

impl PaymentAmounts {
    /// Zero in both currencies
    pub const ZERO: Self = Self {
        btc: ZERO_SATS,
        usd: ZERO_CENTS,
    };
}

/// An amount whose currency is data rather than a type parameter.
///
/// Used at boundaries where the currency depends on the wallet being
/// operated on (balances, persisted rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAmount {
    /// Quantity of minor units
    pub amount: u64,
    /// Currency of the quantity
    pub currency: WalletCurrency,
}

/// Wallet identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletId(Uuid);

impl WalletId {
    /// Create a new random wallet id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WalletId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for WalletId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account identifier (the owner of one or more wallets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Create a new random account id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AccountId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lightning payment hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentHash(String);

impl PaymentHash {
    /// Create from a hex-encoded hash
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-chain transaction hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OnChainTxHash(String);

impl OnChainTxHash {
    /// Create from a hex-encoded txid
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OnChainTxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output index within an on-chain transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OnChainTxVout(pub u32);

impl fmt::Display for OnChainTxVout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-chain receive address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OnChainAddress(String);

impl OnChainAddress {
    /// Create from an encoded address
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OnChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a payout queued with the on-chain payment processor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayoutId(String);

impl PayoutId {
    /// Create from the processor-assigned id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bitcoin network the platform runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitcoinNetwork {
    /// Production network
    Mainnet,
    /// Public test network
    Testnet,
    /// Signet test network
    Signet,
    /// Local regression-test network
    Regtest,
}
