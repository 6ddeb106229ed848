//! In-memory model of the order ladder and the replacement diff.
//!
//! The engine owns two fixed-length level arrays (bid and ask) behind one
//! mutex. All reads return snapshot copies; callers never hold references
//! into the engine's storage. Critical sections are O(n) at worst with n
//! typically at or below 10.

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};

use perpmm_core::{ContractSide, LadderLevel, LadderReplacement, OrderId};

#[derive(Debug, Default)]
struct LadderState {
    bids: Vec<LadderLevel>,
    asks: Vec<LadderLevel>,
    /// Out-of-range `update_level` is logged once per process, then ignored
    /// silently. Stale replacement plans arriving during shutdown must not
    /// take the worker down.
    oob_warned: bool,
}

impl LadderState {
    fn side_mut(&mut self, side: ContractSide) -> &mut Vec<LadderLevel> {
        match side {
            ContractSide::Bid => &mut self.bids,
            ContractSide::Ask => &mut self.asks,
        }
    }

    fn side(&self, side: ContractSide) -> &Vec<LadderLevel> {
        match side {
            ContractSide::Bid => &self.bids,
            ContractSide::Ask => &self.asks,
        }
    }
}

/// Thread-safe ladder state engine.
///
/// `num_levels` is fixed for the process lifetime after `initialize`.
#[derive(Debug, Default)]
pub struct LadderEngine {
    state: Mutex<LadderState>,
}

impl LadderEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `n` empty bid and `n` empty ask slots.
    ///
    /// Idempotent after a full `clear_all`.
    pub fn initialize(&self, n: u32) {
        let mut state = self.state.lock();
        state.bids = (0..n).map(LadderLevel::empty).collect();
        state.asks = (0..n).map(LadderLevel::empty).collect();
        debug!(num_levels = n, "Ladder initialized");
    }

    /// Number of levels per side.
    #[must_use]
    pub fn num_levels(&self) -> u32 {
        self.state.lock().bids.len() as u32
    }

    /// Record a live order at a slot.
    ///
    /// Out-of-range `level_index` is ignored (logged once).
    pub fn update_level(
        &self,
        side: ContractSide,
        level_index: u32,
        order_id: OrderId,
        price: u64,
        quantity: u64,
    ) {
        let mut state = self.state.lock();
        if level_index as usize >= state.side(side).len() {
            if !state.oob_warned {
                state.oob_warned = true;
                warn!(
                    side = %side,
                    level_index,
                    "update_level out of range; ignoring this and further stale updates"
                );
            }
            return;
        }

        let level = &mut state.side_mut(side)[level_index as usize];
        level.current_order_id = Some(order_id);
        level.current_price = price;
        level.current_quantity = quantity;
        level.last_updated = Utc::now();
    }

    /// Reset a slot to empty.
    pub fn clear_level(&self, side: ContractSide, level_index: u32) {
        let mut state = self.state.lock();
        if let Some(level) = state.side_mut(side).get_mut(level_index as usize) {
            *level = LadderLevel::empty(level_index);
        }
    }

    /// Snapshot copy of one slot.
    #[must_use]
    pub fn get_level(&self, side: ContractSide, level_index: u32) -> Option<LadderLevel> {
        self.state
            .lock()
            .side(side)
            .get(level_index as usize)
            .cloned()
    }

    /// Snapshot copy of one side.
    #[must_use]
    pub fn all_levels(&self, side: ContractSide) -> Vec<LadderLevel> {
        self.state.lock().side(side).clone()
    }

    /// Every live order ID across both sides.
    #[must_use]
    pub fn all_active_order_ids(&self) -> Vec<OrderId> {
        let state = self.state.lock();
        state
            .bids
            .iter()
            .chain(state.asks.iter())
            .filter_map(|l| l.current_order_id.clone())
            .collect()
    }

    /// Locate the slot holding an order ID. Linear scan across 2·n slots.
    #[must_use]
    pub fn find_order_level(&self, order_id: &OrderId) -> Option<(ContractSide, u32)> {
        let state = self.state.lock();
        for (side, levels) in [
            (ContractSide::Bid, &state.bids),
            (ContractSide::Ask, &state.asks),
        ] {
            if let Some(level) = levels
                .iter()
                .find(|l| l.current_order_id.as_ref() == Some(order_id))
            {
                return Some((side, level.level_index));
            }
        }
        None
    }

    /// Count of live orders per side: `(bid_count, ask_count)`.
    #[must_use]
    pub fn active_counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        (
            state.bids.iter().filter(|l| l.is_active()).count(),
            state.asks.iter().filter(|l| l.is_active()).count(),
        )
    }

    /// Reset every slot to empty. Level count is preserved.
    pub fn clear_all(&self) {
        let mut state = self.state.lock();
        let LadderState { bids, asks, .. } = &mut *state;
        for level in bids.iter_mut().chain(asks.iter_mut()) {
            *level = LadderLevel::empty(level.level_index);
        }
    }

    /// Compute the replacement plan against a target price/quantity set.
    ///
    /// Produces exactly 2·n entries (all bids, then all asks), one per slot,
    /// on every call; no price-tolerance gate is applied. `old_order_id` is
    /// copied from the current slot.
    #[must_use]
    pub fn calculate_replacements(
        &self,
        new_bid_prices: &[u64],
        new_ask_prices: &[u64],
        new_quantities: &[u64],
    ) -> Vec<LadderReplacement> {
        let state = self.state.lock();
        let mut plan = Vec::with_capacity(state.bids.len() + state.asks.len());

        for (side, levels, prices) in [
            (ContractSide::Bid, &state.bids, new_bid_prices),
            (ContractSide::Ask, &state.asks, new_ask_prices),
        ] {
            for level in levels.iter() {
                let i = level.level_index as usize;
                plan.push(LadderReplacement {
                    level_index: level.level_index,
                    side,
                    old_order_id: level.current_order_id.clone(),
                    new_price: prices.get(i).copied().unwrap_or(0),
                    new_quantity: new_quantities.get(i).copied().unwrap_or(0),
                });
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(s: &str) -> OrderId {
        OrderId::new(s)
    }

    fn engine(n: u32) -> LadderEngine {
        let engine = LadderEngine::new();
        engine.initialize(n);
        engine
    }

    #[test]
    fn test_initialize_all_empty() {
        let engine = engine(4);
        assert_eq!(engine.active_counts(), (0, 0));
        for side in [ContractSide::Bid, ContractSide::Ask] {
            let levels = engine.all_levels(side);
            assert_eq!(levels.len(), 4);
            assert!(levels.iter().all(|l| !l.is_active()));
        }
    }

    #[test]
    fn test_update_then_clear_restores_empty() {
        let engine = engine(2);
        engine.update_level(ContractSide::Bid, 1, oid("o1"), 100, 5);

        let level = engine.get_level(ContractSide::Bid, 1).unwrap();
        assert_eq!(level.current_order_id, Some(oid("o1")));
        assert_eq!(level.current_price, 100);
        assert_eq!(level.current_quantity, 5);
        assert_eq!(engine.active_counts(), (1, 0));

        engine.clear_level(ContractSide::Bid, 1);
        let level = engine.get_level(ContractSide::Bid, 1).unwrap();
        assert!(!level.is_active());
        assert_eq!(level.current_price, 0);
        assert_eq!(level.current_quantity, 0);
        assert_eq!(engine.active_counts(), (0, 0));
    }

    #[test]
    fn test_update_out_of_range_ignored() {
        let engine = engine(2);
        engine.update_level(ContractSide::Ask, 7, oid("stale"), 100, 5);
        assert_eq!(engine.active_counts(), (0, 0));
        assert!(engine.get_level(ContractSide::Ask, 7).is_none());
    }

    #[test]
    fn test_find_order_level_inverse_of_update() {
        let engine = engine(3);
        engine.update_level(ContractSide::Bid, 0, oid("b0"), 99, 1);
        engine.update_level(ContractSide::Ask, 2, oid("a2"), 101, 1);

        assert_eq!(
            engine.find_order_level(&oid("b0")),
            Some((ContractSide::Bid, 0))
        );
        assert_eq!(
            engine.find_order_level(&oid("a2")),
            Some((ContractSide::Ask, 2))
        );
        assert_eq!(engine.find_order_level(&oid("nope")), None);
    }

    #[test]
    fn test_all_active_order_ids_covers_both_sides() {
        let engine = engine(2);
        engine.update_level(ContractSide::Bid, 0, oid("b0"), 99, 1);
        engine.update_level(ContractSide::Bid, 1, oid("b1"), 98, 1);
        engine.update_level(ContractSide::Ask, 0, oid("a0"), 101, 1);

        let mut ids: Vec<String> = engine
            .all_active_order_ids()
            .into_iter()
            .map(|o| o.as_str().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a0", "b0", "b1"]);
    }

    #[test]
    fn test_clear_all_then_reinitialize() {
        let engine = engine(2);
        engine.update_level(ContractSide::Bid, 0, oid("b0"), 99, 1);
        engine.clear_all();
        assert_eq!(engine.active_counts(), (0, 0));
        assert_eq!(engine.num_levels(), 2);

        engine.initialize(2);
        assert_eq!(engine.active_counts(), (0, 0));
    }

    #[test]
    fn test_calculate_replacements_full_plan() {
        let engine = engine(2);
        engine.update_level(ContractSide::Bid, 0, oid("b0"), 6_499_500, 100);
        engine.update_level(ContractSide::Ask, 1, oid("a1"), 6_501_000, 50);

        let plan = engine.calculate_replacements(
            &[6_499_700, 6_499_200],
            &[6_500_700, 6_501_200],
            &[100, 50],
        );

        assert_eq!(plan.len(), 4);

        // Bids first, in level order.
        assert_eq!(plan[0].side, ContractSide::Bid);
        assert_eq!(plan[0].level_index, 0);
        assert_eq!(plan[0].old_order_id, Some(oid("b0")));
        assert_eq!(plan[0].new_price, 6_499_700);
        assert_eq!(plan[0].new_quantity, 100);

        assert_eq!(plan[1].old_order_id, None);
        assert_eq!(plan[1].new_price, 6_499_200);

        assert_eq!(plan[2].side, ContractSide::Ask);
        assert_eq!(plan[2].old_order_id, None);
        assert_eq!(plan[3].old_order_id, Some(oid("a1")));
        assert_eq!(plan[3].new_quantity, 50);
    }

    #[test]
    fn test_snapshots_are_copies() {
        let engine = engine(1);
        let snapshot = engine.all_levels(ContractSide::Bid);
        engine.update_level(ContractSide::Bid, 0, oid("b0"), 99, 1);
        // The earlier snapshot is unaffected by the mutation.
        assert!(!snapshot[0].is_active());
    }
}
