//! Error types for the worker binary.

use thiserror::Error;

/// Application error types. `Config` is fatal at startup; everything else
/// is handled (or at least logged) where it occurs.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] perpmm_core::CoreError),

    #[error(transparent)]
    Venue(#[from] perpmm_venue::VenueError),

    #[error(transparent)]
    Settlement(#[from] perpmm_settlement::SettlementError),

    #[error(transparent)]
    Feed(#[from] perpmm_feed::FeedError),
}

/// Result type alias for application operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
