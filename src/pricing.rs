// Pricing calculator: nights, subtotal, tax and total for a stay, plus the
// split of the total between the platform commission and the hotelier.
// Pure functions of their inputs; overflow surfaces as a typed error.

use crate::error::BookingError;
use crate::money::Money;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const BASIS_POINTS: u32 = 10_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid rate: {0}")]
pub struct InvalidRate(pub String);

// Fraction of an amount held in basis points (1300 = 13%), between 0 and 100%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(u32);

impl Rate {
    pub const DEFAULT_TAX: Rate = Rate(1300);
    pub const DEFAULT_COMMISSION: Rate = Rate(1000);

    pub fn from_basis_points(bps: u32) -> Result<Self, InvalidRate> {
        if bps > BASIS_POINTS {
            return Err(InvalidRate(format!("{} basis points", bps)));
        }
        Ok(Rate(bps))
    }

    pub fn basis_points(&self) -> u32 {
        self.0
    }

    pub fn fraction(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }

    // Rounded half-up to the cent; None when the product leaves the decimal range
    pub fn apply(&self, amount: Money) -> Option<Money> {
        amount.checked_mul(self.fraction())
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = InvalidRate;

    fn try_from(fraction: Decimal) -> Result<Self, Self::Error> {
        if (fraction.is_sign_negative() && !fraction.is_zero()) || fraction > Decimal::ONE {
            return Err(InvalidRate(fraction.to_string()));
        }
        let bps = (fraction * Decimal::from(BASIS_POINTS))
            .round()
            .to_u32()
            .ok_or_else(|| InvalidRate(fraction.to_string()))?;
        Rate::from_basis_points(bps)
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Self {
        rate.fraction()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// Accepts a fraction ("0.13")
impl FromStr for Rate {
    type Err = InvalidRate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fraction = Decimal::from_str(s.trim()).map_err(|_| InvalidRate(s.to_string()))?;
        Rate::try_from(fraction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub nights: u32,
    pub nightly_rate: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

// How a booking total is divided; the two parts always add up to the total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayoutSplit {
    pub admin_commission: Money,
    pub hotelier_amount: Money,
}

fn out_of_range() -> BookingError {
    BookingError::invalid_input("Booking amount out of range")
}

// Whole days between the two dates; fails unless check-out is after check-in
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> Result<u32, BookingError> {
    let days = (check_out - check_in).num_days();
    if days < 1 {
        return Err(BookingError::invalid_input("Invalid date range"));
    }
    u32::try_from(days).map_err(|_| BookingError::invalid_input("Invalid date range"))
}

pub fn quote(
    check_in: NaiveDate,
    check_out: NaiveDate,
    nightly_rate: Money,
    tax_rate: Rate,
) -> Result<PriceQuote, BookingError> {
    if nightly_rate.is_negative() {
        return Err(BookingError::invalid_input("Nightly rate cannot be negative"));
    }
    let nights = nights_between(check_in, check_out)?;

    let subtotal = nightly_rate
        .checked_mul(Decimal::from(nights))
        .ok_or_else(out_of_range)?;
    let tax = tax_rate.apply(subtotal).ok_or_else(out_of_range)?;
    let total = subtotal.checked_add(tax).ok_or_else(out_of_range)?;

    tracing::debug!(
        nights,
        subtotal = %subtotal,
        tax = %tax,
        total = %total,
        "priced stay"
    );

    Ok(PriceQuote {
        nights,
        nightly_rate,
        subtotal,
        tax,
        total,
    })
}

// The commission is rounded; the hotelier receives the exact remainder
pub fn split_payout(total: Money, commission_rate: Rate) -> Result<PayoutSplit, BookingError> {
    let admin_commission = commission_rate.apply(total).ok_or_else(out_of_range)?;
    let hotelier_amount = total.checked_sub(admin_commission).ok_or_else(out_of_range)?;

    Ok(PayoutSplit {
        admin_commission,
        hotelier_amount,
    })
}
