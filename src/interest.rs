use rust_decimal::Decimal;
use tracing::warn;

use crate::decimal::{Money, Rate};

/// trait for total-return calculations
pub trait InterestModel {
    /// total amount the borrower repays over the life of the loan
    fn total_return(&self, principal: Money, rate: Rate) -> Money;

    /// interest portion of the total return
    fn total_interest(&self, principal: Money, rate: Rate) -> Money {
        self.total_return(principal, rate).saturating_sub(principal)
    }
}

/// flat fee over the whole loan: the rate is applied once, never per period
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatRate;

impl InterestModel for FlatRate {
    fn total_return(&self, principal: Money, rate: Rate) -> Money {
        if !principal.is_positive() || rate.is_negative() {
            return Money::ZERO;
        }
        match Decimal::ONE
            .checked_add(rate.as_decimal())
            .and_then(|factor| principal.as_decimal().checked_mul(factor))
        {
            Some(total) => Money::from_decimal(total),
            None => {
                warn!(principal = %principal, rate = %rate, "total return out of range");
                Money::ZERO
            }
        }
    }
}

/// principal × (1 + rate), zero for non-positive principal, negative rate or overflow
pub fn compute_total_return(principal: Money, rate: Rate) -> Money {
    FlatRate.total_return(principal, rate)
}
