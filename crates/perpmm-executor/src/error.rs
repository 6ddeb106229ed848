//! Error types for perpmm-executor.
//!
//! Per-task failures inside a parallel batch are collected into the apply
//! report, never raised. The only error a caller sees is cooperative
//! cancellation.

use thiserror::Error;

/// Executor error types.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Shutdown observed at a suspension point; logged at debug, never as
    /// an error.
    #[error("Replacement cycle cancelled")]
    Cancelled,
}

/// Result type alias for executor operations.
pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;
