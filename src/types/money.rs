//! Fixed-point money helpers
//!
//! Every monetary value in the ledger carries exactly four fractional
//! digits. These helpers keep that scale consistent across arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits stored for every amount and balance
pub const MONEY_SCALE: u32 = 4;

/// Round to four fractional digits (half away from zero) and pin the scale
///
/// Pinning the scale keeps `Display` output stable, e.g. `898.5` is always
/// rendered as `898.5000`.
pub fn to_scale(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Whether `value` can be represented without rounding at four digits
pub fn fits_scale(value: Decimal) -> bool {
    value.normalize().scale() <= MONEY_SCALE
}

/// Commission on a gross amount, rounded once to four digits
///
/// Returns `None` on overflow.
pub fn commission_for(amount: Decimal, rate: Decimal) -> Option<Decimal> {
    amount.checked_mul(rate).map(to_scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[rstest]
    #[case::scenario_a("100.00", "0.015", "1.5000")]
    #[case::small_amount("0.01", "0.015", "0.0002")]
    #[case::midpoint_rounds_up("0.03", "0.015", "0.0005")]
    #[case::zero_rate("250", "0", "0.0000")]
    fn test_commission_for(#[case] amount: &str, #[case] rate: &str, #[case] expected: &str) {
        let commission = commission_for(dec(amount), dec(rate)).unwrap();
        assert_eq!(commission.to_string(), expected);
    }

    #[rstest]
    #[case("1", true)]
    #[case("1.2345", true)]
    #[case("1.23450000", true)]
    #[case("1.23456", false)]
    fn test_fits_scale(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(fits_scale(dec(value)), expected);
    }

    #[test]
    fn test_to_scale_pins_display() {
        assert_eq!(to_scale(dec("898.5")).to_string(), "898.5000");
    }
}
