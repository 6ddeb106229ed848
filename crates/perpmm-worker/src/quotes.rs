//! Target ladder computation for one index observation.

use rust_decimal::Decimal;

use perpmm_core::{ask_levels_usd, bid_levels_usd, to_base, Result as CoreResult};

use crate::config::WorkerConfig;

/// Target prices and quantities for one price update, in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLadder {
    pub bid_prices: Vec<u64>,
    pub ask_prices: Vec<u64>,
    pub quantities: Vec<u64>,
}

/// Turn an index price into the ladder the worker wants resting.
pub fn compute_targets(config: &WorkerConfig, index_price: Decimal) -> CoreResult<TargetLadder> {
    let mid_base = to_base(index_price, config.trading_decimals)?;
    let shape = perpmm_core::LiquidityShape {
        size_level_0: to_base(config.level_0_quantity, config.trading_decimals)?,
        size_level_1_2: to_base(config.levels_1_to_2_quantity, config.trading_decimals)?,
        size_level_3_plus: to_base(config.levels_3_plus_quantity, config.trading_decimals)?,
    };

    Ok(TargetLadder {
        bid_prices: bid_levels_usd(
            mid_base,
            config.base_spread_usd,
            config.level_spacing_usd,
            config.num_levels,
            config.trading_decimals,
        )?,
        ask_prices: ask_levels_usd(
            mid_base,
            config.base_spread_usd,
            config.level_spacing_usd,
            config.num_levels,
            config.trading_decimals,
        )?,
        quantities: shape.quantities(config.num_levels),
    })
}
