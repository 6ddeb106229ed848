//! Error types for perpmm-settlement.

use thiserror::Error;

/// Settlement error types.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The constructed plan failed its balance check. Fatal: this cannot
    /// happen by construction, so reaching it means corrupted state.
    #[error("Invariant violation: settlement plan unbalanced (long={long}, short={short})")]
    PlanUnbalanced { long: u64, short: u64 },

    #[error(transparent)]
    Venue(#[from] perpmm_venue::VenueError),
}

/// Result type alias for settlement operations.
pub type SettlementResult<T> = std::result::Result<T, SettlementError>;
