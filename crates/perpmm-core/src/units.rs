//! Base-unit fixed-point arithmetic and ladder level generation.
//!
//! Prices and contract quantities are non-negative integers scaled by
//! `10^trading_decimals`; margin and balance amounts by
//! `10^settlement_decimals`. Conversions truncate toward zero. The venue
//! bounds both exponents well below `Decimal`'s 28-digit scale limit, and
//! configuration validation rejects anything above 18.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{CoreError, Result};

/// Maximum supported decimal exponent.
pub const MAX_DECIMALS: u32 = 18;

fn pow10(exp: u32) -> Decimal {
    debug_assert!(exp <= MAX_DECIMALS);
    Decimal::from_i128_with_scale(10i128.pow(exp), 0)
}

/// Convert a decimal amount into base units: `⌊d · 10^exp⌋`.
///
/// Fails with `InvalidInput` for negative inputs; overflow past `u64` is a
/// programming error surfaced as `Overflow`.
pub fn to_base(d: Decimal, exp: u32) -> Result<u64> {
    if d.is_sign_negative() && !d.is_zero() {
        return Err(CoreError::InvalidInput(format!(
            "cannot convert negative value {d} to base units"
        )));
    }

    let scaled = d
        .checked_mul(pow10(exp))
        .ok_or_else(|| CoreError::Overflow(format!("{d} * 10^{exp}")))?;

    scaled
        .trunc()
        .to_u64()
        .ok_or_else(|| CoreError::Overflow(format!("{scaled} does not fit in u64")))
}

/// Convert base units back into a decimal amount. Exact.
pub fn from_base(b: u64, exp: u32) -> Decimal {
    debug_assert!(exp <= MAX_DECIMALS);
    Decimal::from_i128_with_scale(b as i128, exp)
}

/// Generate `n` bid prices walking down from the mid.
///
/// `bid[0] = mid - spread/2`, each subsequent level `spacing_usd` lower.
/// Strictly monotone decreasing for `spacing_usd > 0`.
pub fn bid_levels_usd(
    mid_base: u64,
    spread_usd: Decimal,
    spacing_usd: Decimal,
    n: u32,
    trading_decimals: u32,
) -> Result<Vec<u64>> {
    let mid = from_base(mid_base, trading_decimals);
    let best_bid = mid - spread_usd / Decimal::TWO;

    (0..n)
        .map(|i| to_base(best_bid - spacing_usd * Decimal::from(i), trading_decimals))
        .collect()
}

/// Generate `n` ask prices walking up from the mid.
///
/// `ask[0] = mid + spread/2`, each subsequent level `spacing_usd` higher.
/// Strictly monotone increasing for `spacing_usd > 0`.
pub fn ask_levels_usd(
    mid_base: u64,
    spread_usd: Decimal,
    spacing_usd: Decimal,
    n: u32,
    trading_decimals: u32,
) -> Result<Vec<u64>> {
    let mid = from_base(mid_base, trading_decimals);
    let best_ask = mid + spread_usd / Decimal::TWO;

    (0..n)
        .map(|i| to_base(best_ask + spacing_usd * Decimal::from(i), trading_decimals))
        .collect()
}

/// Initial margin for an order, in settlement base units.
///
/// `margin = price · qty · factor_ppm / 10^6`, truncated to
/// `settlement_decimals`. The factor is an integer in parts-per-million
/// (e.g. `200_000` = 20%).
pub fn margin(
    price_base: u64,
    qty_base: u64,
    margin_factor_ppm: u64,
    trading_decimals: u32,
    settlement_decimals: u32,
) -> Result<u64> {
    let price = from_base(price_base, trading_decimals);
    let qty = from_base(qty_base, trading_decimals);
    let factor = Decimal::from_i128_with_scale(margin_factor_ppm as i128, 6);

    let notional = price
        .checked_mul(qty)
        .ok_or_else(|| CoreError::Overflow(format!("{price} * {qty}")))?;

    to_base(
        notional
            .checked_mul(factor)
            .ok_or_else(|| CoreError::Overflow(format!("{notional} * {factor}")))?,
        settlement_decimals,
    )
}
