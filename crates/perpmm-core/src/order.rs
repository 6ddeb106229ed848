//! Order identity types.
//!
//! Provides the contract side enum, the venue-assigned order ID, and the
//! client-order-id factory used to tag every submission attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Side of a resting contract order: bid (long) or ask (short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractSide {
    Bid,
    Ask,
}

impl ContractSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }

    /// Wire string used by the venue ("long"/"short").
    pub fn wire_str(&self) -> &'static str {
        match self {
            Self::Bid => "long",
            Self::Ask => "short",
        }
    }

    /// Parse the venue's wire string.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "long" | "bid" | "buy" => Some(Self::Bid),
            "short" | "ask" | "sell" => Some(Self::Ask),
            _ => None,
        }
    }
}

impl fmt::Display for ContractSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "Bid"),
            Self::Ask => write!(f, "Ask"),
        }
    }
}

/// Venue-assigned order identifier. Opaque to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Factory for client order IDs.
///
/// CRITICAL: every submission attempt must carry a unique client order ID
/// so retries never alias an earlier attempt. The tag is a monotonically
/// increasing counter seeded from the wall clock at process start.
///
/// Format: `MM-<Side>-L<level>-<tag>`.
#[derive(Debug)]
pub struct ClientOrderIdFactory {
    tag: AtomicU64,
}

impl ClientOrderIdFactory {
    pub fn new() -> Self {
        let seed = chrono::Utc::now().timestamp_millis() as u64;
        Self {
            tag: AtomicU64::new(seed),
        }
    }

    /// Generate the next client order ID for a (side, level) slot.
    pub fn next(&self, side: ContractSide, level: u32) -> String {
        let tag = self.tag.fetch_add(1, Ordering::AcqRel);
        format!("MM-{side}-L{level}-{tag}")
    }
}

impl Default for ClientOrderIdFactory {
    fn default() -> Self {
        Self::new()
    }
}
