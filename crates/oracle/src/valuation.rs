//! Fixed-point conversion between collateral and the borrowed asset
//!
//! `value = collateral * price / 10^10` and `amount = value * 10^10 / price`.
//! Both round down and run in `u128`; inputs are bounded by the collateral
//! supply so the products never overflow.

use peerlend_core::units::{MAX_COLLATERAL_SUPPLY, MAX_PRICE, VALUE_SCALE};

use crate::OracleError;

/// USD value (6 decimals) of a collateral amount (8 decimals) at `price`
pub fn value_at(collateral: u128, price: u128) -> Result<u128, OracleError> {
    check_price(price)?;
    if collateral > MAX_COLLATERAL_SUPPLY {
        return Err(OracleError::AmountTooLarge(collateral));
    }
    collateral
        .checked_mul(price)
        .map(|v| v / VALUE_SCALE)
        .ok_or(OracleError::Overflow)
}

/// Collateral amount (8 decimals) worth `usd_value` (6 decimals) at `price`
pub fn amount_at(usd_value: u128, price: u128) -> Result<u128, OracleError> {
    check_price(price)?;
    let max_value = MAX_COLLATERAL_SUPPLY * MAX_PRICE / VALUE_SCALE;
    if usd_value > max_value {
        return Err(OracleError::AmountTooLarge(usd_value));
    }
    usd_value
        .checked_mul(VALUE_SCALE)
        .map(|v| v / price)
        .ok_or(OracleError::Overflow)
}

pub(crate) fn check_price(price: u128) -> Result<(), OracleError> {
    if price == 0 || price > MAX_PRICE {
        return Err(OracleError::InvalidPrice(price));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlend_core::units::{COLLATERAL_UNIT, PRICE_UNIT, USD_UNIT};

    #[test]
    fn test_whole_units_are_exact() {
        let price = 60_000 * PRICE_UNIT;
        assert_eq!(value_at(COLLATERAL_UNIT, price).unwrap(), 60_000 * USD_UNIT);
        assert_eq!(amount_at(60_000 * USD_UNIT, price).unwrap(), COLLATERAL_UNIT);
        assert_eq!(value_at(3 * COLLATERAL_UNIT, price).unwrap(), 180_000 * USD_UNIT);
    }

    #[test]
    fn test_fractional_collateral() {
        let price = 60_000 * PRICE_UNIT;
        // 0.025 units at 60k = 1,500 USD
        assert_eq!(value_at(2_500_000, price).unwrap(), 1_500 * USD_UNIT);
        assert_eq!(amount_at(1_500 * USD_UNIT, price).unwrap(), 2_500_000);
    }

    #[test]
    fn test_full_supply_at_max_price_does_not_overflow() {
        let value = value_at(MAX_COLLATERAL_SUPPLY, MAX_PRICE).unwrap();
        assert_eq!(amount_at(value, MAX_PRICE).unwrap(), MAX_COLLATERAL_SUPPLY);
    }

    #[test]
    fn test_rejects_amounts_beyond_supply() {
        assert_eq!(
            value_at(MAX_COLLATERAL_SUPPLY + 1, PRICE_UNIT),
            Err(OracleError::AmountTooLarge(MAX_COLLATERAL_SUPPLY + 1))
        );
        assert!(matches!(
            amount_at(u128::MAX / 2, PRICE_UNIT),
            Err(OracleError::AmountTooLarge(_))
        ));
    }

    #[test]
    fn test_rejects_zero_price() {
        assert_eq!(value_at(1, 0), Err(OracleError::InvalidPrice(0)));
        assert_eq!(amount_at(1, 0), Err(OracleError::InvalidPrice(0)));
    }
}
