//! Executor configuration.

use std::time::Duration;

/// How a replacement cycle sequences cancels against submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateBehavior {
    /// Cancel first, then submit. Leaves a transient liquidity gap.
    Sequential,
    /// Submit first, then cancel after a delay. Continuous liquidity at
    /// the risk of brief old/new overlap.
    Atomic,
}

impl UpdateBehavior {
    /// Parse the configuration string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "atomic" => Some(Self::Atomic),
            _ => None,
        }
    }
}

/// Configuration for the replacement executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Cancel/submit sequencing mode.
    pub behavior: UpdateBehavior,
    /// Self-trade prevention (effective in atomic mode only).
    pub enable_stp: bool,
    /// Wait between the submit and cancel phases in atomic mode.
    pub atomic_replacement_delay: Duration,
    /// Wait between steps of a sequential peel.
    pub sequential_peel_delay: Duration,
    /// Wait before the single cancel-batch retry.
    pub cancel_retry_delay: Duration,
    /// Initial margin factor attached to every submission, in ppm.
    pub margin_factor_ppm: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            behavior: UpdateBehavior::Sequential,
            enable_stp: false,
            atomic_replacement_delay: Duration::from_millis(250),
            sequential_peel_delay: Duration::from_millis(150),
            cancel_retry_delay: Duration::from_millis(50),
            margin_factor_ppm: 200_000,
        }
    }
}
