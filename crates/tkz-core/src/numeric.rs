//! Decimal arithmetic helpers for the calculation engine.
//!
//! Electrical quantities are carried as exact decimals end to end; floats
//! appear only inside the square root, which has no exact decimal form.
//! Results are rounded half-away-from-zero to the configured number of
//! places, padded with trailing zeros so the scale is always exact.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{TkzError, TkzResult};

/// Square root of a decimal via an f64 round trip.
///
/// The conversion back picks the shortest decimal representation of the
/// float, so catalog-scale magnitudes (five fractional digits) survive
/// unchanged.
pub fn decimal_sqrt(value: Decimal) -> TkzResult<Decimal> {
    if value.is_sign_negative() {
        return Err(TkzError::BadInput(format!(
            "square root of negative value {value}"
        )));
    }
    let root = value
        .to_f64()
        .map(f64::sqrt)
        .and_then(Decimal::from_f64)
        .ok_or_else(|| TkzError::BadInput(format!("value {value} is not representable")))?;
    Ok(root)
}

/// Round half-away-from-zero to `places` fractional digits, keeping the
/// scale at exactly `places`.
pub fn round_result(value: Decimal, places: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sqrt_of_perfect_square() {
        assert_eq!(decimal_sqrt(dec!(9)).unwrap(), dec!(3));
        assert_eq!(decimal_sqrt(dec!(0.0625)).unwrap(), dec!(0.25));
    }

    #[test]
    fn sqrt_of_negative_is_rejected() {
        assert!(decimal_sqrt(dec!(-1)).is_err());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_result(dec!(2.0005), 3), dec!(2.001));
        assert_eq!(round_result(dec!(-2.0005), 3), dec!(-2.001));
        assert_eq!(round_result(dec!(1.23449), 3), dec!(1.234));
    }

    #[test]
    fn rounding_pads_scale() {
        let rounded = round_result(dec!(12.3), 3);
        assert_eq!(rounded, dec!(12.300));
        assert_eq!(rounded.scale(), 3);
    }
}
