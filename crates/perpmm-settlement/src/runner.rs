//! Settlement runner: fetch positions, build a plan, submit it.
//!
//! Runs at startup, after each background token refresh when continuous
//! settlement is enabled, and once more at shutdown under a bounded
//! deadline. The runner issues its own API calls and never touches the
//! ladder engine, so it needs no coordination with replacement cycles.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use perpmm_telemetry::Metrics;
use perpmm_venue::{AccountApi, VenueError};

use crate::error::SettlementResult;
use crate::planner::build_plan;

/// Drives one settlement pass against the account API.
pub struct SettlementRunner {
    account: Arc<dyn AccountApi>,
}

impl SettlementRunner {
    pub fn new(account: Arc<dyn AccountApi>) -> Self {
        Self { account }
    }

    /// Run one settlement pass. Returns whether a settlement was submitted.
    ///
    /// An empty plan is success; a logical venue rejection ("already
    /// settled", "invalid") is a soft warning, not an error.
    pub async fn run(&self, token: &str) -> SettlementResult<bool> {
        let snapshot = self.account.get_account(token).await?;
        let plan = build_plan(&snapshot.positions)?;

        if plan.is_empty() {
            info!(
                reason = plan.skip_reason.as_deref().unwrap_or("empty"),
                "Settlement skipped"
            );
            Metrics::settlement("skipped");
            return Ok(false);
        }

        // Fresh key per attempt: a retry is a new settlement attempt.
        let idempotency_key = Uuid::new_v4().to_string();
        match self.account.settle(&plan, token, &idempotency_key).await {
            Ok(receipt) => {
                info!(
                    settlement_id = %receipt.settlement_id,
                    entries = plan.entries.len(),
                    quantity = plan.total_quantity(),
                    "Settlement complete"
                );
                Metrics::settlement("submitted");
                Ok(true)
            }
            Err(VenueError::Logical { kind, message }) => {
                warn!(?kind, %message, "Settlement rejected by venue; continuing");
                Metrics::settlement("soft_error");
                Ok(false)
            }
            Err(e) => {
                Metrics::settlement("error");
                Err(e.into())
            }
        }
    }

    /// Run one settlement pass under a deadline. Used at shutdown so a hung
    /// venue cannot prevent process exit.
    pub async fn run_with_deadline(&self, token: &str, deadline: Duration) -> SettlementResult<bool> {
        match tokio::time::timeout(deadline, self.run(token)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?deadline, "Settlement timed out");
                Metrics::settlement("error");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use perpmm_core::{Position, PositionSide, SettlementPlan};
    use perpmm_venue::{AccountSnapshot, LogicalErrorKind, SettlementReceipt, VenueResult};
    use std::sync::Mutex;

    struct FakeAccount {
        positions: Vec<Position>,
        settle_error: Option<LogicalErrorKind>,
        submitted: Mutex<Vec<SettlementPlan>>,
        keys: Mutex<Vec<String>>,
    }

    impl FakeAccount {
        fn new(positions: Vec<Position>) -> Self {
            Self {
                positions,
                settle_error: None,
                submitted: Mutex::new(Vec::new()),
                keys: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AccountApi for FakeAccount {
        async fn get_account(&self, _token: &str) -> VenueResult<AccountSnapshot> {
            Ok(AccountSnapshot {
                balance: 0,
                orders: Vec::new(),
                positions: self.positions.clone(),
            })
        }

        async fn settle(
            &self,
            plan: &SettlementPlan,
            _token: &str,
            idempotency_key: &str,
        ) -> VenueResult<SettlementReceipt> {
            self.submitted.lock().unwrap().push(plan.clone());
            self.keys.lock().unwrap().push(idempotency_key.to_string());
            if let Some(kind) = self.settle_error {
                return Err(VenueError::Logical {
                    kind,
                    message: "rejected".into(),
                });
            }
            Ok(SettlementReceipt {
                settlement_id: "st-1".into(),
            })
        }
    }

    fn pos(id: &str, side: PositionSide, qty: u64) -> Position {
        Position {
            id: id.into(),
            side,
            quantity: qty,
            entry_price: 0,
        }
    }

    #[tokio::test]
    async fn test_runner_submits_balanced_plan() {
        let account = Arc::new(FakeAccount::new(vec![
            pos("L1", PositionSide::Long, 100),
            pos("S1", PositionSide::Short, 60),
        ]));
        let runner = SettlementRunner::new(account.clone());

        assert!(runner.run("tok").await.unwrap());

        let submitted = account.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].total_quantity(), 120);
    }

    #[tokio::test]
    async fn test_runner_skips_one_sided_book_without_api_call() {
        let account = Arc::new(FakeAccount::new(vec![pos("L1", PositionSide::Long, 50)]));
        let runner = SettlementRunner::new(account.clone());

        assert!(!runner.run("tok").await.unwrap());
        assert!(account.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_runner_soft_warns_on_already_settled() {
        let mut fake = FakeAccount::new(vec![
            pos("L1", PositionSide::Long, 10),
            pos("S1", PositionSide::Short, 10),
        ]);
        fake.settle_error = Some(LogicalErrorKind::AlreadySettled);
        let runner = SettlementRunner::new(Arc::new(fake));

        // Logical rejection is not an error.
        assert!(!runner.run("tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_runner_uses_fresh_idempotency_keys() {
        let account = Arc::new(FakeAccount::new(vec![
            pos("L1", PositionSide::Long, 10),
            pos("S1", PositionSide::Short, 10),
        ]));
        let runner = SettlementRunner::new(account.clone());

        runner.run("tok").await.unwrap();
        runner.run("tok").await.unwrap();

        let keys = account.keys.lock().unwrap();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
    }
}
