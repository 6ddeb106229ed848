//! Self-trade crossing detection.
//!
//! Before an atomic replacement, the best new price on each side is
//! compared against the still-live orders on the opposite side. A side
//! that would cross forces the opposite side to be peeled sequentially
//! before the aggressor side is introduced.

use perpmm_core::{ContractSide, LadderReplacement};
use perpmm_ladder::LadderEngine;

/// Which sides of the plan would cross live opposite-side orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrossingReport {
    /// The best new bid would match a current ask.
    pub bids_cross: bool,
    /// The best new ask would match a current bid.
    pub asks_cross: bool,
}

impl CrossingReport {
    pub fn any(&self) -> bool {
        self.bids_cross || self.asks_cross
    }
}

/// Compare the plan's best new prices against the engine's live levels.
#[must_use]
pub fn detect_crossings(plan: &[LadderReplacement], engine: &LadderEngine) -> CrossingReport {
    let best_new_bid = plan
        .iter()
        .filter(|r| r.side == ContractSide::Bid && r.new_price > 0)
        .map(|r| r.new_price)
        .max();
    let best_new_ask = plan
        .iter()
        .filter(|r| r.side == ContractSide::Ask && r.new_price > 0)
        .map(|r| r.new_price)
        .min();

    let current_bids: Vec<u64> = engine
        .all_levels(ContractSide::Bid)
        .iter()
        .filter(|l| l.is_active())
        .map(|l| l.current_price)
        .collect();
    let current_asks: Vec<u64> = engine
        .all_levels(ContractSide::Ask)
        .iter()
        .filter(|l| l.is_active())
        .map(|l| l.current_price)
        .collect();

    CrossingReport {
        bids_cross: best_new_bid
            .map(|bid| current_asks.iter().any(|&ask| bid >= ask))
            .unwrap_or(false),
        asks_cross: best_new_ask
            .map(|ask| current_bids.iter().any(|&bid| ask <= bid))
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perpmm_core::OrderId;

    fn replacement(side: ContractSide, level: u32, price: u64) -> LadderReplacement {
        LadderReplacement {
            level_index: level,
            side,
            old_order_id: None,
            new_price: price,
            new_quantity: 10,
        }
    }

    fn engine_with(bids: &[u64], asks: &[u64]) -> LadderEngine {
        let engine = LadderEngine::new();
        engine.initialize(bids.len().max(asks.len()) as u32);
        for (i, &price) in bids.iter().enumerate() {
            engine.update_level(
                ContractSide::Bid,
                i as u32,
                OrderId::new(format!("b{i}")),
                price,
                10,
            );
        }
        for (i, &price) in asks.iter().enumerate() {
            engine.update_level(
                ContractSide::Ask,
                i as u32,
                OrderId::new(format!("a{i}")),
                price,
                10,
            );
        }
        engine
    }

    #[test]
    fn test_no_crossing_on_drift_within_spread() {
        let engine = engine_with(&[6499500, 6499000], &[6500500, 6501000]);
        let plan = vec![
            replacement(ContractSide::Bid, 0, 6499700),
            replacement(ContractSide::Ask, 0, 6500700),
        ];
        assert_eq!(detect_crossings(&plan, &engine), CrossingReport::default());
    }

    #[test]
    fn test_bids_cross_existing_ask() {
        let engine = engine_with(&[6499500, 6499000], &[6500500, 6501000]);
        let plan = vec![
            replacement(ContractSide::Bid, 0, 6500600),
            replacement(ContractSide::Bid, 1, 6500100),
        ];
        let report = detect_crossings(&plan, &engine);
        assert!(report.bids_cross);
        assert!(!report.asks_cross);
    }

    #[test]
    fn test_asks_cross_existing_bid() {
        let engine = engine_with(&[6499500], &[6500500]);
        let plan = vec![replacement(ContractSide::Ask, 0, 6499500)];
        let report = detect_crossings(&plan, &engine);
        assert!(!report.bids_cross);
        assert!(report.asks_cross);
    }

    #[test]
    fn test_empty_engine_never_crosses() {
        let engine = LadderEngine::new();
        engine.initialize(2);
        let plan = vec![
            replacement(ContractSide::Bid, 0, 6500600),
            replacement(ContractSide::Ask, 0, 6400000),
        ];
        assert!(!detect_crossings(&plan, &engine).any());
    }

    #[test]
    fn test_equal_price_counts_as_cross() {
        let engine = engine_with(&[], &[6500500]);
        let plan = vec![replacement(ContractSide::Bid, 0, 6500500)];
        assert!(detect_crossings(&plan, &engine).bids_cross);
    }
}
