//! Exact integer arithmetic over currency-tagged amounts
//!
//! All monetary math goes through [`AmountCalculator`]. Operands of `add` and
//! `sub` must share a currency (enforced by the type system); the division
//! family takes a unitless divisor and offers floor, ceiling, and
//! round-half-up variants. Intermediate products are computed in 128 bits so
//! ratio math cannot overflow the 64-bit minor-unit range.

use crate::types::{Currency, PaymentAmount};
use crate::{Error, Result};

/// Calculator for currency-tagged amounts
#[derive(Debug, Clone, Copy, Default)]
pub struct AmountCalculator;

impl AmountCalculator {
    /// Create a calculator
    pub const fn new() -> Self {
        Self
    }

    /// `a + b`, rejecting overflow
    pub fn add<C: Currency>(
        &self,
        a: PaymentAmount<C>,
        b: PaymentAmount<C>,
    ) -> Result<PaymentAmount<C>> {
        a.amount()
            .checked_add(b.amount())
            .map(PaymentAmount::new)
            .ok_or(Error::AmountOverflow("add"))
    }

    /// `a - b`, rejecting results below zero
    pub fn sub<C: Currency>(
        &self,
        a: PaymentAmount<C>,
        b: PaymentAmount<C>,
    ) -> Result<PaymentAmount<C>> {
        a.amount()
            .checked_sub(b.amount())
            .map(PaymentAmount::new)
            .ok_or(Error::AmountUnderflow("sub"))
    }

    /// `a / divisor`, rounded toward zero
    pub fn div_floor<C: Currency>(
        &self,
        a: PaymentAmount<C>,
        divisor: u64,
    ) -> Result<PaymentAmount<C>> {
        if divisor == 0 {
            return Err(Error::DivisionByZero);
        }
        Ok(PaymentAmount::new(a.amount() / divisor))
    }

    /// `a / divisor`, rounded away from zero
    pub fn div_ceil<C: Currency>(
        &self,
        a: PaymentAmount<C>,
        divisor: u64,
    ) -> Result<PaymentAmount<C>> {
        if divisor == 0 {
            return Err(Error::DivisionByZero);
        }
        let quotient = a.amount() / divisor;
        let remainder = a.amount() % divisor;
        Ok(PaymentAmount::new(if remainder > 0 {
            quotient + 1
        } else {
            quotient
        }))
    }

    /// `a / divisor`, rounded to nearest with halves away from zero
    pub fn div_round<C: Currency>(
        &self,
        a: PaymentAmount<C>,
        divisor: u64,
    ) -> Result<PaymentAmount<C>> {
        if divisor == 0 {
            return Err(Error::DivisionByZero);
        }
        let quotient = a.amount() / divisor;
        let remainder = a.amount() % divisor;
        // r * 2 stays in u128 even at the top of the u64 range
        let round_up = (remainder as u128) * 2 >= divisor as u128;
        Ok(PaymentAmount::new(if round_up {
            quotient + 1
        } else {
            quotient
        }))
    }
}
