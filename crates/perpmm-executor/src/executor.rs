//! Application of replacement plans against the venue.
//!
//! One `apply` call is one replacement cycle. The caller (the
//! orchestrator) holds the strategy lock across the whole cycle, so at
//! most one cycle is in flight; inside a cycle, cancels and submits fan
//! out as parallel batches whose failures are isolated per task.

use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use perpmm_core::{ClientOrderIdFactory, ContractSide, LadderReplacement, OrderId};
use perpmm_ladder::LadderEngine;
use perpmm_telemetry::Metrics;
use perpmm_venue::{OrderApi, SubmitRequest, VenueError};

use crate::config::{ExecutorConfig, UpdateBehavior};
use crate::error::{ExecutorError, ExecutorResult};
use crate::stp;

/// Outcome counts for one replacement cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub submits_ok: usize,
    pub submits_failed: usize,
    pub cancels_ok: usize,
    pub cancels_failed: usize,
}

/// Whether a successful cancel empties its ladder slot.
///
/// Sequential mode clears; in atomic mode the new order already occupies
/// the slot when the old one is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotPolicy {
    ClearOnSuccess,
    Keep,
}

#[derive(Debug, Clone)]
struct CancelTarget {
    order_id: OrderId,
    side: ContractSide,
    level_index: u32,
}

impl CancelTarget {
    fn from_replacement(r: &LadderReplacement) -> Option<Self> {
        r.old_order_id.clone().map(|order_id| Self {
            order_id,
            side: r.side,
            level_index: r.level_index,
        })
    }
}

/// Applies `LadderReplacement` plans to the venue under the configured
/// update mode, keeping the ladder engine in sync with every confirmed
/// submit and cancel.
pub struct ReplacementExecutor {
    api: Arc<dyn OrderApi>,
    engine: Arc<LadderEngine>,
    cloids: ClientOrderIdFactory,
    config: ExecutorConfig,
}

impl ReplacementExecutor {
    pub fn new(api: Arc<dyn OrderApi>, engine: Arc<LadderEngine>, config: ExecutorConfig) -> Self {
        Self {
            api,
            engine,
            cloids: ClientOrderIdFactory::new(),
            config,
        }
    }

    /// Apply one replacement plan.
    ///
    /// Transport failures are absorbed into the report (a partial ladder is
    /// an operating state, not an error); only cooperative cancellation
    /// surfaces as `Err`.
    pub async fn apply(
        &self,
        plan: &[LadderReplacement],
        token: &str,
        cancel: &CancellationToken,
    ) -> ExecutorResult<ApplyReport> {
        let mut report = ApplyReport::default();
        if plan.is_empty() {
            return Ok(report);
        }

        match self.config.behavior {
            UpdateBehavior::Sequential => {
                self.apply_sequential(plan, token, cancel, &mut report)
                    .await?
            }
            UpdateBehavior::Atomic => {
                if self.config.enable_stp {
                    self.apply_atomic_with_stp(plan, token, cancel, &mut report)
                        .await?
                } else {
                    self.apply_atomic(plan, token, cancel, &mut report).await?
                }
            }
        }

        let (bid_count, ask_count) = self.engine.active_counts();
        Metrics::active_levels(bid_count, ask_count);

        debug!(
            submits_ok = report.submits_ok,
            submits_failed = report.submits_failed,
            cancels_ok = report.cancels_ok,
            cancels_failed = report.cancels_failed,
            "Replacement cycle complete"
        );

        Ok(report)
    }

    /// Best-effort cancel of every order the engine still believes is live.
    /// Emergency-stop path; successful cancels empty their slots.
    pub async fn cancel_all(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> ExecutorResult<ApplyReport> {
        let mut targets = Vec::new();
        for side in [ContractSide::Bid, ContractSide::Ask] {
            for level in self.engine.all_levels(side) {
                if let Some(order_id) = level.current_order_id {
                    targets.push(CancelTarget {
                        order_id,
                        side,
                        level_index: level.level_index,
                    });
                }
            }
        }

        info!(count = targets.len(), "Cancelling all tracked orders");

        let mut report = ApplyReport::default();
        self.cancel_batch(
            &targets,
            token,
            cancel,
            SlotPolicy::ClearOnSuccess,
            &mut report,
        )
        .await?;
        Ok(report)
    }

    /// Cancel-then-submit. Replaced slots pass through the empty state
    /// between the phases.
    async fn apply_sequential(
        &self,
        plan: &[LadderReplacement],
        token: &str,
        cancel: &CancellationToken,
        report: &mut ApplyReport,
    ) -> ExecutorResult<()> {
        let targets: Vec<CancelTarget> = plan
            .iter()
            .filter_map(CancelTarget::from_replacement)
            .collect();

        self.cancel_batch(&targets, token, cancel, SlotPolicy::ClearOnSuccess, report)
            .await?;

        let all: Vec<&LadderReplacement> = plan.iter().collect();
        self.submit_batch(&all, token, cancel, report).await
    }

    /// Submit-then-cancel with the configured inter-phase delay. The old
    /// order IDs survive only in the plan held here; the engine's slots are
    /// overwritten at submit time.
    async fn apply_atomic(
        &self,
        plan: &[LadderReplacement],
        token: &str,
        cancel: &CancellationToken,
        report: &mut ApplyReport,
    ) -> ExecutorResult<()> {
        let all: Vec<&LadderReplacement> = plan.iter().collect();
        self.submit_batch(&all, token, cancel, report).await?;

        self.sleep(self.config.atomic_replacement_delay, cancel)
            .await?;

        let targets: Vec<CancelTarget> = plan
            .iter()
            .filter_map(CancelTarget::from_replacement)
            .collect();
        self.cancel_batch(&targets, token, cancel, SlotPolicy::Keep, report)
            .await
    }

    /// Atomic mode with self-trade prevention: a side whose best new price
    /// would match a still-live opposite order forces that opposite side to
    /// be peeled sequentially before the aggressor side goes in.
    async fn apply_atomic_with_stp(
        &self,
        plan: &[LadderReplacement],
        token: &str,
        cancel: &CancellationToken,
        report: &mut ApplyReport,
    ) -> ExecutorResult<()> {
        let crossing = stp::detect_crossings(plan, &self.engine);

        let bids: Vec<&LadderReplacement> = plan
            .iter()
            .filter(|r| r.side == ContractSide::Bid)
            .collect();
        let asks: Vec<&LadderReplacement> = plan
            .iter()
            .filter(|r| r.side == ContractSide::Ask)
            .collect();

        match (crossing.bids_cross, crossing.asks_cross) {
            (false, false) => self.apply_atomic(plan, token, cancel, report).await,
            (false, true) => {
                info!("STP: new asks cross live bids; peeling bid side");
                Metrics::stp_triggered("asks");
                self.peel_side(&bids, token, cancel, report).await?;
                self.apply_atomic_subset(&asks, token, cancel, report).await
            }
            (true, false) => {
                info!("STP: new bids cross live asks; peeling ask side");
                Metrics::stp_triggered("bids");
                self.peel_side(&asks, token, cancel, report).await?;
                self.apply_atomic_subset(&bids, token, cancel, report).await
            }
            (true, true) => {
                info!("STP: both sides cross; peeling both");
                Metrics::stp_triggered("both");
                self.peel_side(&asks, token, cancel, report).await?;
                self.peel_side(&bids, token, cancel, report).await
            }
        }
    }

    /// Atomic submit-then-cancel over a subset of the plan (one side).
    async fn apply_atomic_subset(
        &self,
        reps: &[&LadderReplacement],
        token: &str,
        cancel: &CancellationToken,
        report: &mut ApplyReport,
    ) -> ExecutorResult<()> {
        self.submit_batch(reps, token, cancel, report).await?;
        self.sleep(self.config.atomic_replacement_delay, cancel)
            .await?;

        let targets: Vec<CancelTarget> = reps
            .iter()
            .filter_map(|r| CancelTarget::from_replacement(r))
            .collect();
        self.cancel_batch(&targets, token, cancel, SlotPolicy::Keep, report)
            .await
    }

    /// Replace one side level-by-level, inside-out: cancel, wait, submit,
    /// wait, advance. Cancels here use sequential slot-clearing semantics.
    /// Outer levels stay live while inner levels turn over, preserving the
    /// overall shape.
    async fn peel_side(
        &self,
        reps: &[&LadderReplacement],
        token: &str,
        cancel: &CancellationToken,
        report: &mut ApplyReport,
    ) -> ExecutorResult<()> {
        let mut by_level: BTreeMap<u32, Vec<&LadderReplacement>> = BTreeMap::new();
        for &r in reps {
            by_level.entry(r.level_index).or_default().push(r);
        }

        for (level, group) in by_level {
            debug!(level, "Peeling level");

            let targets: Vec<CancelTarget> = group
                .iter()
                .filter_map(|r| CancelTarget::from_replacement(r))
                .collect();
            self.cancel_batch(&targets, token, cancel, SlotPolicy::ClearOnSuccess, report)
                .await?;

            self.sleep(self.config.sequential_peel_delay, cancel).await?;

            self.submit_batch(&group, token, cancel, report).await?;

            self.sleep(self.config.sequential_peel_delay, cancel).await?;
        }

        Ok(())
    }

    /// Fan out one cancel batch, retry the failures once, and apply the
    /// slot policy on success.
    ///
    /// An order that is already filled or unknown is no longer live: after
    /// the retry, such failures count as success for slot bookkeeping and
    /// are logged at debug. Remaining transport failures are warned and
    /// counted; the next price update is the natural retry.
    async fn cancel_batch(
        &self,
        targets: &[CancelTarget],
        token: &str,
        cancel: &CancellationToken,
        policy: SlotPolicy,
        report: &mut ApplyReport,
    ) -> ExecutorResult<()> {
        if targets.is_empty() {
            return Ok(());
        }

        let failed = self
            .run_cancels(targets.iter().collect(), token, cancel, policy, report, false)
            .await?;

        if failed.is_empty() {
            return Ok(());
        }

        self.sleep(self.config.cancel_retry_delay, cancel).await?;

        let still_failed = self
            .run_cancels(failed, token, cancel, policy, report, true)
            .await?;

        for target in still_failed {
            warn!(
                order_id = %target.order_id,
                side = %target.side,
                level = target.level_index,
                "Cancel failed after retry; order may still be resting"
            );
            report.cancels_failed += 1;
            Metrics::cancel("error");
        }

        Ok(())
    }

    /// One parallel pass over a set of cancels. Returns the targets that
    /// still need attention.
    async fn run_cancels<'a>(
        &self,
        targets: Vec<&'a CancelTarget>,
        token: &str,
        cancel: &CancellationToken,
        policy: SlotPolicy,
        report: &mut ApplyReport,
        is_retry: bool,
    ) -> ExecutorResult<Vec<&'a CancelTarget>> {
        let results = join_all(targets.into_iter().map(|target| async move {
            let result = self.api.cancel(&target.order_id, token, cancel).await;
            (target, result)
        }))
        .await;

        let mut failed = Vec::new();
        let mut observed_cancel = false;

        for (target, result) in results {
            match result {
                Ok(ack) => {
                    if policy == SlotPolicy::ClearOnSuccess {
                        self.engine.clear_level(target.side, target.level_index);
                    }
                    debug!(
                        order_id = %ack.order_id,
                        unfilled = ack.unfilled_quantity,
                        "Cancel confirmed"
                    );
                    report.cancels_ok += 1;
                    Metrics::cancel("ok");
                }
                Err(VenueError::Cancelled) => observed_cancel = true,
                Err(e) if is_retry && e.is_order_gone() => {
                    // Filled or closed between our last view and the cancel.
                    debug!(
                        order_id = %target.order_id,
                        error = %e,
                        "Order already gone; treating cancel as success"
                    );
                    if policy == SlotPolicy::ClearOnSuccess {
                        self.engine.clear_level(target.side, target.level_index);
                    }
                    report.cancels_ok += 1;
                    Metrics::cancel("gone");
                }
                Err(e) => {
                    if !is_retry {
                        if e.is_order_gone() {
                            debug!(
                                order_id = %target.order_id,
                                error = %e,
                                "Cancel rejected as gone; retrying once"
                            );
                        } else {
                            error!(order_id = %target.order_id, error = %e, "Cancel failed; will retry");
                        }
                    }
                    failed.push(target);
                }
            }
        }

        if observed_cancel {
            return Err(ExecutorError::Cancelled);
        }
        Ok(failed)
    }

    /// Fan out one submit batch. Successes land in the engine immediately;
    /// failures degrade the ladder until the next price update.
    async fn submit_batch(
        &self,
        reps: &[&LadderReplacement],
        token: &str,
        cancel: &CancellationToken,
        report: &mut ApplyReport,
    ) -> ExecutorResult<()> {
        if reps.is_empty() {
            return Ok(());
        }

        let results = join_all(reps.iter().map(|r| async move {
            let request = SubmitRequest {
                side: r.side,
                price_base: r.new_price,
                quantity_base: r.new_quantity,
                margin_factor_ppm: self.config.margin_factor_ppm,
                client_order_id: self.cloids.next(r.side, r.level_index),
            };
            let result = self.api.submit_limit(request, token, cancel).await;
            (*r, result)
        }))
        .await;

        let mut observed_cancel = false;

        for (r, result) in results {
            let side_label = match r.side {
                ContractSide::Bid => "bid",
                ContractSide::Ask => "ask",
            };
            match result {
                Ok(ack) => {
                    self.engine.update_level(
                        r.side,
                        r.level_index,
                        ack.order_id,
                        r.new_price,
                        r.new_quantity,
                    );
                    report.submits_ok += 1;
                    Metrics::submit(side_label, true);
                }
                Err(VenueError::Cancelled) => observed_cancel = true,
                Err(e) => {
                    warn!(
                        side = %r.side,
                        level = r.level_index,
                        price = r.new_price,
                        error = %e,
                        "Submit failed; ladder degraded until next update"
                    );
                    report.submits_failed += 1;
                    Metrics::submit(side_label, false);
                }
            }
        }

        if observed_cancel {
            return Err(ExecutorError::Cancelled);
        }
        Ok(())
    }

    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> ExecutorResult<()> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(ExecutorError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
