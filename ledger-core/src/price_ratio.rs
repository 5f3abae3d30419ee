//! Currency conversion via integer price ratios
//!
//! A price ratio is a pair of integer quantities known to be worth the same:
//! `other` units of the counter currency per `wallet_amount` of the wallet
//! currency. Conversions multiply first and divide last, in 128-bit
//! intermediates, so no precision is lost before rounding.
//!
//! Dust protection: a non-zero input never converts to zero. Whenever a
//! conversion of a non-zero quantity would round to zero, one minor unit is
//! returned instead, in every rounding mode.

use crate::types::{BtcPaymentAmount, Currency, PaymentAmount, UsdPaymentAmount, BTC};
use crate::{Error, Result};

/// Precision used when materializing a ratio from an external float price
pub const RATIO_PRECISION: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rounding {
    Nearest,
    Floor,
    Ceil,
}

/// Multiply then divide in 128 bits, rounding the quotient as requested.
fn mul_div(value: u64, numerator: u64, denominator: u64, rounding: Rounding) -> Result<u64> {
    debug_assert!(denominator != 0, "ratio constructors reject zero");
    let product = value as u128 * numerator as u128;
    let denominator = denominator as u128;
    let quotient = product / denominator;
    let remainder = product % denominator;
    let rounded = match rounding {
        Rounding::Floor => quotient,
        Rounding::Ceil => quotient + u128::from(remainder > 0),
        Rounding::Nearest => quotient + u128::from(remainder * 2 >= denominator),
    };
    u64::try_from(rounded).map_err(|_| Error::AmountOverflow("price ratio conversion"))
}

/// Conversion factor between a wallet currency and a counter quantity.
///
/// Construction fails if either side is zero: a zero ratio is meaningless
/// and would divide by zero downstream.
#[derive(Debug, Clone, Copy)]
pub struct PriceRatio<C: Currency> {
    other: u64,
    wallet_amount: PaymentAmount<C>,
}

impl<C: Currency> PriceRatio<C> {
    /// Create a ratio of `other` counter units per `wallet_amount`
    pub fn new(other: u64, wallet_amount: PaymentAmount<C>) -> Result<Self> {
        if other == 0 || wallet_amount.is_zero() {
            return Err(Error::InvalidZeroAmountPriceRatioInput);
        }
        Ok(Self {
            other,
            wallet_amount,
        })
    }

    fn from_other(&self, other_amount: u64, rounding: Rounding) -> Result<PaymentAmount<C>> {
        if other_amount == 0 {
            return Ok(PaymentAmount::ZERO);
        }
        let converted = mul_div(
            other_amount,
            self.wallet_amount.amount(),
            self.other,
            rounding,
        )?;
        Ok(PaymentAmount::new(converted.max(1)))
    }

    fn from_wallet(&self, wallet_amount: PaymentAmount<C>, rounding: Rounding) -> Result<u64> {
        if wallet_amount.is_zero() {
            return Ok(0);
        }
        let converted = mul_div(
            wallet_amount.amount(),
            self.other,
            self.wallet_amount.amount(),
            rounding,
        )?;
        Ok(converted.max(1))
    }

    /// Convert a counter quantity into the wallet currency, rounding to nearest
    pub fn convert_from_other(&self, other_amount: u64) -> Result<PaymentAmount<C>> {
        self.from_other(other_amount, Rounding::Nearest)
    }

    /// Convert a counter quantity into the wallet currency, rounding down
    pub fn convert_from_other_floor(&self, other_amount: u64) -> Result<PaymentAmount<C>> {
        self.from_other(other_amount, Rounding::Floor)
    }

    /// Convert a counter quantity into the wallet currency, rounding up
    pub fn convert_from_other_ceil(&self, other_amount: u64) -> Result<PaymentAmount<C>> {
        self.from_other(other_amount, Rounding::Ceil)
    }

    /// Convert a wallet amount into the counter quantity, rounding to nearest
    pub fn convert_from_wallet(&self, wallet_amount: PaymentAmount<C>) -> Result<u64> {
        self.from_wallet(wallet_amount, Rounding::Nearest)
    }

    /// Convert a wallet amount into the counter quantity, rounding down
    pub fn convert_from_wallet_floor(&self, wallet_amount: PaymentAmount<C>) -> Result<u64> {
        self.from_wallet(wallet_amount, Rounding::Floor)
    }

    /// Convert a wallet amount into the counter quantity, rounding up
    pub fn convert_from_wallet_ceil(&self, wallet_amount: PaymentAmount<C>) -> Result<u64> {
        self.from_wallet(wallet_amount, Rounding::Ceil)
    }

    /// Counter units per single wallet unit, for display only
    pub fn other_unit_per_wallet_unit(&self) -> f64 {
        self.other as f64 / self.wallet_amount.amount() as f64
    }
}

/// BTC/USD ratio between a wallet's satoshi leg and its cents shadow leg
#[derive(Debug, Clone, Copy)]
pub struct WalletPriceRatio {
    inner: PriceRatio<BTC>,
}

impl WalletPriceRatio {
    /// Create from a pair of quantities known to be equal in value
    pub fn new(usd: UsdPaymentAmount, btc: BtcPaymentAmount) -> Result<Self> {
        Ok(Self {
            inner: PriceRatio::new(usd.amount(), btc)?,
        })
    }

    /// Materialize a ratio from an external float price (USD cents per sat).
    ///
    /// The float crosses into integer space exactly once, at a fixed
    /// precision; all subsequent conversion math is integral.
    pub fn from_price(cents_per_sat: f64) -> Result<Self> {
        if !cents_per_sat.is_finite() || cents_per_sat <= 0.0 {
            return Err(Error::InvalidZeroAmountPriceRatioInput);
        }
        let usd = UsdPaymentAmount::new((cents_per_sat * RATIO_PRECISION as f64).floor() as u64);
        let btc = BtcPaymentAmount::new(RATIO_PRECISION);
        Self::new(usd, btc)
    }

    /// Cents to satoshis, rounding to nearest
    pub fn convert_from_usd(&self, usd: UsdPaymentAmount) -> Result<BtcPaymentAmount> {
        self.inner.convert_from_other(usd.amount())
    }

    /// Satoshis to cents, rounding to nearest
    pub fn convert_from_btc(&self, btc: BtcPaymentAmount) -> Result<UsdPaymentAmount> {
        self.inner.convert_from_wallet(btc).map(UsdPaymentAmount::new)
    }

    /// Satoshis to cents, rounding in the customer's favor
    pub fn convert_from_btc_floor(&self, btc: BtcPaymentAmount) -> Result<UsdPaymentAmount> {
        self.inner
            .convert_from_wallet_floor(btc)
            .map(UsdPaymentAmount::new)
    }

    /// Satoshis to cents, rounding in the platform's favor
    pub fn convert_from_btc_ceil(&self, btc: BtcPaymentAmount) -> Result<UsdPaymentAmount> {
        self.inner
            .convert_from_wallet_ceil(btc)
            .map(UsdPaymentAmount::new)
    }

    /// Cents per satoshi, for display only
    pub fn usd_per_sat(&self) -> f64 {
        self.inner.other_unit_per_wallet_unit()
    }
}

/// A display amount in the minor units of an arbitrary display currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayAmount {
    /// Quantity in minor units
    pub amount_in_minor: u64,
    /// Display currency code
    pub currency: String,
    /// Major-unit rendering, e.g. `"12.34"` for 1234 minor units at exponent 2
    pub display_in_major: String,
}

/// Ratio between a wallet currency and a minor-unit display currency.
///
/// Carries the currency's major-unit exponent so converted quantities can be
/// rendered without floating point.
#[derive(Debug, Clone)]
pub struct DisplayPriceRatio<C: Currency> {
    inner: PriceRatio<C>,
    display_currency: String,
    major_exponent: u8,
}

impl<C: Currency> DisplayPriceRatio<C> {
    /// Create from a display quantity and the wallet quantity it buys
    pub fn new(
        display_amount_in_minor: u64,
        display_currency: impl Into<String>,
        major_exponent: u8,
        wallet_amount: PaymentAmount<C>,
    ) -> Result<Self> {
        Ok(Self {
            inner: PriceRatio::new(display_amount_in_minor, wallet_amount)?,
            display_currency: display_currency.into(),
            major_exponent,
        })
    }

    fn display_amount(&self, amount_in_minor: u64) -> DisplayAmount {
        let scale = 10u64.pow(self.major_exponent as u32);
        let display_in_major = if self.major_exponent == 0 {
            format!("{amount_in_minor}")
        } else {
            format!(
                "{}.{:0width$}",
                amount_in_minor / scale,
                amount_in_minor % scale,
                width = self.major_exponent as usize,
            )
        };
        DisplayAmount {
            amount_in_minor,
            currency: self.display_currency.clone(),
            display_in_major,
        }
    }

    /// Display minor units to the wallet currency, rounding to nearest
    pub fn convert_from_display(&self, amount_in_minor: u64) -> Result<PaymentAmount<C>> {
        self.inner.convert_from_other(amount_in_minor)
    }

    /// Wallet amount to a display amount, rounding to nearest
    pub fn convert_from_wallet(&self, wallet_amount: PaymentAmount<C>) -> Result<DisplayAmount> {
        self.inner
            .convert_from_wallet(wallet_amount)
            .map(|minor| self.display_amount(minor))
    }

    /// Wallet amount to a display amount, rounding down
    pub fn convert_from_wallet_floor(
        &self,
        wallet_amount: PaymentAmount<C>,
    ) -> Result<DisplayAmount> {
        self.inner
            .convert_from_wallet_floor(wallet_amount)
            .map(|minor| self.display_amount(minor))
    }

    /// Wallet amount to a display amount, rounding up
    pub fn convert_from_wallet_ceil(
        &self,
        wallet_amount: PaymentAmount<C>,
    ) -> Result<DisplayAmount> {
        self.inner
            .convert_from_wallet_ceil(wallet_amount)
            .map(|minor| self.display_amount(minor))
    }

    /// Display minor units per single wallet unit, for display only
    pub fn display_minor_unit_per_wallet_unit(&self) -> f64 {
        self.inner.other_unit_per_wallet_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ZERO_CENTS, ZERO_SATS};

    fn ratio(usd: u64, btc: u64) -> WalletPriceRatio {
        WalletPriceRatio::new(UsdPaymentAmount::new(usd), BtcPaymentAmount::new(btc)).unwrap()
    }

    #[test]
    fn zero_inputs_are_rejected() {
        let zero_other = WalletPriceRatio::new(ZERO_CENTS, BtcPaymentAmount::new(1_000));
        assert!(matches!(
            zero_other,
            Err(Error::InvalidZeroAmountPriceRatioInput)
        ));

        let zero_wallet = WalletPriceRatio::new(UsdPaymentAmount::new(50), ZERO_SATS);
        assert!(matches!(
            zero_wallet,
            Err(Error::InvalidZeroAmountPriceRatioInput)
        ));
    }

    #[test]
    fn converts_with_nearest_rounding() {
        // 1 cent per 50 sats
        let ratio = ratio(2, 100);

        assert_eq!(
            ratio.convert_from_usd(UsdPaymentAmount::new(10)).unwrap(),
            BtcPaymentAmount::new(500)
        );
        assert_eq!(
            ratio.convert_from_btc(BtcPaymentAmount::new(500)).unwrap(),
            UsdPaymentAmount::new(10)
        );
        // 125 sats = 2.5 cents, half rounds up
        assert_eq!(
            ratio.convert_from_btc(BtcPaymentAmount::new(125)).unwrap(),
            UsdPaymentAmount::new(3)
        );
    }

    #[test]
    fn floor_and_ceil_round_directionally() {
        let ratio = ratio(2, 100);

        let amount = BtcPaymentAmount::new(125); // 2.5 cents
        assert_eq!(
            ratio.convert_from_btc_floor(amount).unwrap(),
            UsdPaymentAmount::new(2)
        );
        assert_eq!(
            ratio.convert_from_btc_ceil(amount).unwrap(),
            UsdPaymentAmount::new(3)
        );
    }

    #[test]
    fn non_zero_never_converts_to_zero() {
        // 1 cent per 10,000 sats
        let ratio = ratio(1, 10_000);

        let dust = BtcPaymentAmount::new(3);
        assert_eq!(
            ratio.convert_from_btc(dust).unwrap(),
            UsdPaymentAmount::new(1)
        );
        assert_eq!(
            ratio.convert_from_btc_floor(dust).unwrap(),
            UsdPaymentAmount::new(1)
        );
        assert_eq!(
            ratio.convert_from_btc_ceil(dust).unwrap(),
            UsdPaymentAmount::new(1)
        );
    }

    #[test]
    fn zero_input_converts_to_zero() {
        let ratio = ratio(1, 10_000);
        assert_eq!(ratio.convert_from_btc(ZERO_SATS).unwrap(), ZERO_CENTS);
        assert_eq!(ratio.convert_from_usd(ZERO_CENTS).unwrap(), ZERO_SATS);
    }

    #[test]
    fn from_price_builds_integer_ratio() {
        // 0.05 cents per sat == 1 cent per 20 sats
        let ratio = WalletPriceRatio::from_price(0.05).unwrap();
        assert_eq!(
            ratio.convert_from_btc(BtcPaymentAmount::new(20)).unwrap(),
            UsdPaymentAmount::new(1)
        );
        assert!(WalletPriceRatio::from_price(0.0).is_err());
        assert!(WalletPriceRatio::from_price(f64::NAN).is_err());
    }

    #[test]
    fn display_ratio_formats_major_units() {
        // 150 display-minor (EUR cents) per 100,000 sats
        let ratio = DisplayPriceRatio::new(150, "EUR", 2, BtcPaymentAmount::new(100_000)).unwrap();

        let display = ratio
            .convert_from_wallet(BtcPaymentAmount::new(820_000))
            .unwrap();
        assert_eq!(display.amount_in_minor, 1_230);
        assert_eq!(display.currency, "EUR");
        assert_eq!(display.display_in_major, "12.30");
    }

    proptest::proptest! {
        #[test]
        fn conversion_of_non_zero_is_non_zero(
            other in 1u64..1_000_000,
            wallet in 1u64..1_000_000_000,
            input in 1u64..1_000_000_000,
        ) {
            let ratio = PriceRatio::<BTC>::new(other, BtcPaymentAmount::new(wallet)).unwrap();
            proptest::prop_assert!(ratio.convert_from_other(input).unwrap().amount() > 0);
            proptest::prop_assert!(
                ratio.convert_from_wallet(BtcPaymentAmount::new(input)).unwrap() > 0
            );
            proptest::prop_assert!(
                ratio.convert_from_wallet_floor(BtcPaymentAmount::new(input)).unwrap() > 0
            );
        }
    }
}
