//! Decimal money arithmetic.
//!
//! All prices and totals are `rust_decimal::Decimal`; binary floating point never
//! touches an amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Non-negative unit price of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

/// Exclusive upper bound of a unit price (`NUMERIC(10, 2)`).
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Exclusive upper bound of an order total (`NUMERIC(12, 2)`).
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    /// Prices are whole cents in `0..MAX_PRICE`.
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation("price cannot be negative"));
        }
        if amount.round_dp(2) != amount {
            return Err(DomainError::validation("price cannot have more than 2 decimal places"));
        }
        if amount >= MAX_PRICE {
            return Err(DomainError::validation("price must be less than 100000000"));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// `price × quantity`, exact.
    pub fn line_total(&self, quantity: u32) -> DomainResult<Decimal> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(too_large)
    }
}

impl ValueObject for Price {}

impl TryFrom<Decimal> for Price {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Sum `(price, quantity)` pairs without leaving decimal arithmetic.
///
/// Fails with a validation error once the sum reaches [`MAX_ORDER_TOTAL`].
pub fn total<I>(lines: I) -> DomainResult<Decimal>
where
    I: IntoIterator<Item = (Price, u32)>,
{
    let mut sum = Decimal::ZERO;
    for (price, qty) in lines {
        sum = sum.checked_add(price.line_total(qty)?).ok_or_else(too_large)?;
        if sum >= MAX_ORDER_TOTAL {
            return Err(too_large());
        }
    }
    Ok(sum)
}

fn too_large() -> DomainError {
    DomainError::validation("order total is too large")
}
