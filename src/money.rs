//! Currency arithmetic. Amounts are persisted as `i64` minor units (two
//! decimal places); API models carry major units as [`Decimal`].

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::error::{AppError, AppResult};

pub const MINOR_UNIT_SCALE: u32 = 2;

/// Minor units to a two-decimal major amount, e.g. `2550 -> 25.50`.
pub fn to_major(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}

/// Major amount to minor units, rounding half away from zero first.
pub fn to_minor(major: Decimal) -> AppResult<i64> {
    let rounded = round_currency(major);
    (rounded * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| AppError::InvalidState(format!("amount {major} is out of range")))
}

pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Σ(quantity × unit price), rounded to two decimals and returned in minor units.
pub fn order_total<I>(lines: I) -> AppResult<i64>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    let mut total = Decimal::ZERO;
    for (unit_price_minor, quantity) in lines {
        let line = to_major(unit_price_minor)
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| AppError::InvalidState("line total overflow".into()))?;
        total = total
            .checked_add(line)
            .ok_or_else(|| AppError::InvalidState("order total overflow".into()))?;
    }
    to_minor(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_quantity_times_price() {
        let total = order_total([(1000, 2), (550, 1)]).unwrap();
        assert_eq!(total, 2550);
        assert_eq!(to_major(total), Decimal::new(2550, 2));
        assert_eq!(to_major(total).to_string(), "25.50");
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(order_total(std::iter::empty()).unwrap(), 0);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_currency(Decimal::new(10005, 3)), Decimal::new(1001, 2));
        assert_eq!(round_currency(Decimal::new(-10005, 3)), Decimal::new(-1001, 2));
        assert_eq!(to_minor(Decimal::new(12344, 3)).unwrap(), 1234);
    }
}
