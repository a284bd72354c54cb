//! Units and protocol-wide constants
//!
//! All monetary values are integers in the smallest unit of their asset:
//! - borrowed asset (USD stablecoin): 6 decimals
//! - collateral asset: 8 decimals
//! - oracle price: USD per whole collateral unit, 8 decimals
//!
//! Rates and ratios are basis points (10_000 = 100%).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Logical block counter supplied by the execution environment
pub type BlockNumber = u64;

pub const USD_DECIMALS: u32 = 6;
pub const COLLATERAL_DECIMALS: u32 = 8;
pub const PRICE_DECIMALS: u32 = 8;

/// One whole unit of the borrowed asset
pub const USD_UNIT: u128 = 1_000_000;
/// One whole unit of collateral
pub const COLLATERAL_UNIT: u128 = 100_000_000;
/// Price scale (1.0 USD)
pub const PRICE_UNIT: u128 = 100_000_000;

/// Divisor turning `collateral * price` into borrowed-asset units
pub const VALUE_SCALE: u128 = 10_000_000_000; // 10^(8 + 8 - 6)

pub const BPS_DENOMINATOR: u128 = 10_000;

pub const BLOCKS_PER_DAY: u64 = 144;
pub const BLOCKS_PER_YEAR: u64 = BLOCKS_PER_DAY * 365;

pub const MAX_APR_BPS: u32 = 10_000;
pub const MAX_DURATION_BLOCKS: u64 = BLOCKS_PER_YEAR;
pub const MIN_COLLATERAL_RATIO_BPS: u32 = 10_000;

/// Largest principal accepted for a single offer or request (1T USD)
pub const MAX_LOAN_AMOUNT: u128 = 1_000_000_000_000 * USD_UNIT;

/// Total supply of the collateral asset (21M whole units)
pub const MAX_COLLATERAL_SUPPLY: u128 = 21_000_000 * COLLATERAL_UNIT;
/// Upper bound on an accepted oracle price (10M USD per unit)
pub const MAX_PRICE: u128 = 10_000_000 * PRICE_UNIT;

/// Render a borrowed-asset amount as a decimal (e.g. 1_500_000 -> 1.5)
pub fn usd_to_decimal(units: u128) -> Decimal {
    to_decimal(units, USD_DECIMALS)
}

/// Render a collateral amount as a decimal
pub fn collateral_to_decimal(units: u128) -> Decimal {
    to_decimal(units, COLLATERAL_DECIMALS)
}

/// Render an oracle price as a decimal
pub fn price_to_decimal(units: u128) -> Decimal {
    to_decimal(units, PRICE_DECIMALS)
}

fn to_decimal(units: u128, scale: u32) -> Decimal {
    i128::try_from(units)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, scale).ok())
        .unwrap_or(Decimal::MAX)
}

/// Parse a borrowed-asset amount (e.g. 1.5 -> 1_500_000)
pub fn usd_from_decimal(value: Decimal) -> Option<u128> {
    from_decimal(value, USD_DECIMALS)
}

pub fn collateral_from_decimal(value: Decimal) -> Option<u128> {
    from_decimal(value, COLLATERAL_DECIMALS)
}

pub fn price_from_decimal(value: Decimal) -> Option<u128> {
    from_decimal(value, PRICE_DECIMALS)
}

/// `None` for negative values or more precision than `scale` allows
fn from_decimal(value: Decimal, scale: u32) -> Option<u128> {
    if value.is_sign_negative() {
        return None;
    }
    let scaled = value.checked_mul(Decimal::from(10u64.checked_pow(scale)?))?;
    if !scaled.fract().is_zero() {
        return None;
    }
    scaled.to_u128()
}

/// `amount * bps / 10_000`, rounding down
pub fn apply_bps(amount: u128, bps: u32) -> Option<u128> {
    amount
        .checked_mul(bps as u128)
        .map(|v| v / BPS_DENOMINATOR)
}

/// Relative change between two values in basis points, rounded up
///
/// For reporting. Bound checks go through [`exceeds_bps`].
pub fn change_bps(from: u128, to: u128) -> Option<u128> {
    if from == 0 {
        return None;
    }
    let scaled = from.abs_diff(to).checked_mul(BPS_DENOMINATOR)?;
    Some(scaled.div_ceil(from))
}

/// Whether moving from `from` to `to` changes by strictly more than `max_bps`
///
/// Exact: compares `|to - from| * 10_000` with `max_bps * from`. `None` when
/// `from` is zero or the products overflow.
pub fn exceeds_bps(from: u128, to: u128, max_bps: u32) -> Option<bool> {
    if from == 0 {
        return None;
    }
    let scaled = from.abs_diff(to).checked_mul(BPS_DENOMINATOR)?;
    let limit = (max_bps as u128).checked_mul(from)?;
    Some(scaled > limit)
}
