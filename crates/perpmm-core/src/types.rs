//! Ladder data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::{ContractSide, OrderId};

/// One (side, level) slot of the ladder.
///
/// Invariant: `current_order_id` is present iff `current_price > 0` and
/// `current_quantity > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderLevel {
    /// Level index; 0 is closest to the mid.
    pub level_index: u32,
    /// Live order believed to be resting at this slot.
    pub current_order_id: Option<OrderId>,
    /// Price in trading base units; 0 when empty.
    pub current_price: u64,
    /// Quantity in trading base units; 0 when empty.
    pub current_quantity: u64,
    /// Last mutation time.
    pub last_updated: DateTime<Utc>,
}

impl LadderLevel {
    /// Create an empty slot.
    pub fn empty(level_index: u32) -> Self {
        Self {
            level_index,
            current_order_id: None,
            current_price: 0,
            current_quantity: 0,
            last_updated: Utc::now(),
        }
    }

    /// Whether a live order is believed to occupy this slot.
    pub fn is_active(&self) -> bool {
        self.current_order_id.is_some()
    }
}

/// One slot's planned transition during a replacement cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderReplacement {
    pub level_index: u32,
    pub side: ContractSide,
    /// Order currently resting at the slot; `None` when the slot was empty.
    pub old_order_id: Option<OrderId>,
    /// Target price in trading base units.
    pub new_price: u64,
    /// Target quantity in trading base units.
    pub new_quantity: u64,
}

/// Per-level quantity shape of the ladder, in trading base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityShape {
    /// Quantity at level 0 (closest to the mid).
    pub size_level_0: u64,
    /// Quantity at levels 1 and 2.
    pub size_level_1_2: u64,
    /// Quantity at level 3 and beyond.
    pub size_level_3_plus: u64,
}

impl LiquidityShape {
    /// Quantity for a given level index.
    pub fn size_for_level(&self, level_index: u32) -> u64 {
        match level_index {
            0 => self.size_level_0,
            1 | 2 => self.size_level_1_2,
            _ => self.size_level_3_plus,
        }
    }

    /// Quantities for levels `[0, n)`.
    pub fn quantities(&self, n: u32) -> Vec<u64> {
        (0..n).map(|i| self.size_for_level(i)).collect()
    }
}
