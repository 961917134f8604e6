//! Platform application fee arithmetic.
//!
//! A vendor sale is a destination charge: the customer pays the full order
//! total, Stripe transfers it to the vendor's connected account, and the
//! platform keeps `application_fee_amount`. Both amounts are integer cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Smallest charge Stripe accepts for USD, in cents.
pub const MIN_CHARGE_CENTS: i64 = 50;

/// Errors from fee calculation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    /// The configured percentage is negative.
    #[error("fee percent must not be negative (got {0})")]
    InvalidPercent(Decimal),
    /// The fee would consume the whole charge.
    #[error("application fee {fee} is not less than order total {total}")]
    ExceedsTotal {
        /// Computed fee in cents.
        fee: i64,
        /// Order total in cents.
        total: i64,
    },
    /// The intermediate product does not fit in `i64`.
    #[error("fee calculation overflowed")]
    Overflow,
}

/// Convert a major-unit amount (e.g. dollars) to minor units.
///
/// Rounds half away from zero, so `10.505` becomes `1051`. Returns `None` if
/// the result does not fit in `i64`.
///
/// ```
/// use rust_decimal::Decimal;
/// use sellor_core::cents_from_major;
///
/// assert_eq!(cents_from_major(Decimal::new(1999, 2)), Some(1999));
/// assert_eq!(cents_from_major(Decimal::new(10505, 3)), Some(1051));
/// ```
#[must_use]
pub fn cents_from_major(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Compute the platform's cut of an order.
///
/// `fee = round(total_cents * fee_percent / 100)`, rounding half away from
/// zero. `fee_percent` is a percentage, so `2` means two percent.
///
/// # Errors
///
/// - [`FeeError::InvalidPercent`] if `fee_percent` is negative
/// - [`FeeError::ExceedsTotal`] if the fee is greater than or equal to the
///   total, which also covers non-positive totals
/// - [`FeeError::Overflow`] if the arithmetic overflows
pub fn application_fee(total_cents: i64, fee_percent: Decimal) -> Result<i64, FeeError> {
    if fee_percent.is_sign_negative() && !fee_percent.is_zero() {
        return Err(FeeError::InvalidPercent(fee_percent));
    }

    let fee = Decimal::from(total_cents)
        .checked_mul(fee_percent)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or(FeeError::Overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(FeeError::Overflow)?;

    if fee >= total_cents {
        return Err(FeeError::ExceedsTotal {
            fee,
            total: total_cents,
        });
    }

    Ok(fee)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pct(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_two_percent() {
        assert_eq!(application_fee(10_000, pct("2.0")), Ok(200));
        assert_eq!(application_fee(1999, pct("2.0")), Ok(40));
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        // 2.5% of 100 cents is exactly 2.5
        assert_eq!(application_fee(100, pct("2.5")), Ok(3));
        // 2% of 75 cents is 1.5
        assert_eq!(application_fee(75, pct("2")), Ok(2));
        // 2% of 74 cents is 1.48
        assert_eq!(application_fee(74, pct("2")), Ok(1));
    }

    #[test]
    fn test_zero_percent() {
        assert_eq!(application_fee(5000, Decimal::ZERO), Ok(0));
    }

    #[test]
    fn test_fee_equal_to_total_rejected() {
        assert_eq!(
            application_fee(50, pct("100")),
            Err(FeeError::ExceedsTotal { fee: 50, total: 50 })
        );
        assert!(matches!(
            application_fee(50, pct("150")),
            Err(FeeError::ExceedsTotal { fee: 75, .. })
        ));
    }

    #[test]
    fn test_zero_total_rejected() {
        assert!(matches!(
            application_fee(0, pct("2")),
            Err(FeeError::ExceedsTotal { fee: 0, total: 0 })
        ));
    }

    #[test]
    fn test_negative_percent_rejected() {
        assert!(matches!(
            application_fee(1000, pct("-1")),
            Err(FeeError::InvalidPercent(_))
        ));
    }

    #[test]
    fn test_cents_from_major() {
        assert_eq!(cents_from_major(pct("0")), Some(0));
        assert_eq!(cents_from_major(pct("0.5")), Some(50));
        assert_eq!(cents_from_major(pct("19.99")), Some(1999));
        assert_eq!(cents_from_major(pct("0.125")), Some(13));
        assert_eq!(cents_from_major(pct("1000000")), Some(100_000_000));
    }
}
