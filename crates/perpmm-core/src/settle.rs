//! Settlement data model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Some(Self::Long),
            "short" => Some(Self::Short),
            _ => None,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// An open position as reported by the account endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub side: PositionSide,
    /// Open quantity in trading base units.
    pub quantity: u64,
    /// Entry price in trading base units.
    pub entry_price: u64,
}

/// One position's contribution to a settlement plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementEntry {
    pub position_id: String,
    pub quantity: u64,
}

/// A balanced, quantity-conserving pairing of long and short positions.
///
/// Invariant: the summed quantities of entries drawn from long positions
/// equal the summed quantities drawn from short positions. An empty plan
/// carries a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub entries: Vec<SettlementEntry>,
    /// Why the plan is empty; `None` for non-empty plans.
    pub skip_reason: Option<String>,
}

impl SettlementPlan {
    /// Empty plan with a reason.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            skip_reason: Some(reason.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total quantity across all entries (long side + short side).
    pub fn total_quantity(&self) -> u64 {
        self.entries.iter().map(|e| e.quantity).sum()
    }
}
