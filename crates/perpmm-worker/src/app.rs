//! Orchestrator: startup validation, the price-update pipeline, the token
//! refresh loop, and shutdown sequencing.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use perpmm_executor::{ExecutorError, ReplacementExecutor};
use perpmm_feed::RedisPriceSource;
use perpmm_ladder::LadderEngine;
use perpmm_settlement::SettlementRunner;
use perpmm_telemetry::{serve_metrics, Metrics};
use perpmm_venue::{AccountApi, AuthClient, OrderApi, PerpsRestClient, TokenManager};

use crate::config::WorkerConfig;
use crate::error::{AppError, AppResult};
use crate::quotes::compute_targets;

/// Grace period after leaving the price loop, covering a handler that was
/// mid-await when the shutdown signal fired.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Deadline for the final settlement pass; a hung venue must not prevent
/// process exit.
const SHUTDOWN_SETTLEMENT_DEADLINE: Duration = Duration::from_secs(30);

/// The single-writer replacement pipeline for one price update.
///
/// `strategy_lock` serializes whole cycles: a second price update blocks
/// until the first has released the venue. Two overlapping applications
/// would interleave cancels and submits across sides and leave the ladder
/// state inconsistent.
pub struct ReplacementPipeline {
    config: WorkerConfig,
    engine: Arc<LadderEngine>,
    executor: Arc<ReplacementExecutor>,
    tokens: Arc<TokenManager>,
    strategy_lock: Semaphore,
}

impl ReplacementPipeline {
    pub fn new(
        config: WorkerConfig,
        engine: Arc<LadderEngine>,
        executor: Arc<ReplacementExecutor>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            config,
            engine,
            executor,
            tokens,
            strategy_lock: Semaphore::new(1),
        }
    }

    /// Handle one index price observation end to end.
    pub async fn on_price(&self, price: Decimal, cancel: &CancellationToken) {
        let Ok(_permit) = self.strategy_lock.acquire().await else {
            return;
        };
        let started = Instant::now();

        let token = match self.tokens.current().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "No valid token; skipping price update");
                return;
            }
        };

        let targets = match compute_targets(&self.config, price) {
            Ok(targets) => targets,
            Err(e) => {
                warn!(price = %price, error = %e, "Target computation failed; skipping update");
                return;
            }
        };

        let plan = self.engine.calculate_replacements(
            &targets.bid_prices,
            &targets.ask_prices,
            &targets.quantities,
        );
        debug!(price = %price, plan_size = plan.len(), "Applying replacement plan");

        match self.executor.apply(&plan, &token, cancel).await {
            Ok(report) => debug!(
                price = %price,
                submits_ok = report.submits_ok,
                submits_failed = report.submits_failed,
                cancels_ok = report.cancels_ok,
                cancels_failed = report.cancels_failed,
                "Price update applied"
            ),
            Err(ExecutorError::Cancelled) => {
                debug!("Replacement cycle cancelled by shutdown");
            }
        }

        Metrics::cycle_duration(started.elapsed().as_secs_f64() * 1000.0);
    }
}

/// Long-running worker application.
pub struct Application {
    config: WorkerConfig,
    client: Arc<PerpsRestClient>,
    engine: Arc<LadderEngine>,
    executor: Arc<ReplacementExecutor>,
    tokens: Arc<TokenManager>,
    settlement: Arc<SettlementRunner>,
    pipeline: ReplacementPipeline,
    feed: RedisPriceSource,
    shutdown: CancellationToken,
}

impl Application {
    /// Wire up clients and subsystems. Fails fast on bad key material or
    /// endpoint configuration.
    pub fn new(config: WorkerConfig) -> AppResult<Self> {
        let client = Arc::new(PerpsRestClient::new(
            &config.api_base_url,
            &config.account_id,
        )?);
        let auth = Arc::new(AuthClient::new(
            &config.api_base_url,
            &config.account_id,
            &config.ledger_id,
            &config.key_type,
            &config.private_key_hex,
        )?);
        let tokens = Arc::new(TokenManager::new(auth));
        let engine = Arc::new(LadderEngine::new());
        let executor = Arc::new(ReplacementExecutor::new(
            client.clone() as Arc<dyn OrderApi>,
            engine.clone(),
            config.executor_config(),
        ));
        let settlement = Arc::new(SettlementRunner::new(client.clone() as Arc<dyn AccountApi>));
        let feed = RedisPriceSource::new(&config.redis_connection_string)?;
        let pipeline = ReplacementPipeline::new(
            config.clone(),
            engine.clone(),
            executor.clone(),
            tokens.clone(),
        );

        Ok(Self {
            config,
            client,
            engine,
            executor,
            tokens,
            settlement,
            pipeline,
            feed,
            shutdown: CancellationToken::new(),
        })
    }

    /// Run until shutdown. Returns `Err` only for fatal startup failures.
    pub async fn run(&self) -> AppResult<()> {
        self.config.log_summary();

        // The venue's decimals are load-bearing for every base-unit
        // conversion; a mismatch is fatal before any order goes out.
        let info = self.client.get_market_info().await?;
        if info.trading_decimals != self.config.trading_decimals
            || info.settlement_decimals != self.config.settlement_decimals
        {
            return Err(AppError::Config(format!(
                "venue decimals mismatch: venue ({}, {}), config ({}, {})",
                info.trading_decimals,
                info.settlement_decimals,
                self.config.trading_decimals,
                self.config.settlement_decimals,
            )));
        }
        info!(symbol = %info.symbol, "Market validated");

        self.engine.initialize(self.config.num_levels);

        // Startup settlement check. Requires a token; failing to
        // authenticate at startup is fatal, a failed settlement is not.
        let token = self.tokens.current().await?;
        if let Err(e) = self.settlement.run(&token).await {
            warn!(error = %e, "Startup settlement failed; continuing");
        }

        let metrics_port = self.config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(metrics_port).await {
                warn!(error = %e, "Metrics exporter stopped");
            }
        });

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received");
                shutdown.cancel();
            }
        });

        let refresh_task = self.spawn_token_refresh();

        let mut ticks = self.feed.subscribe(
            self.config.redis_index_key.clone(),
            Duration::from_millis(self.config.redis_poll_interval_ms),
            self.shutdown.child_token(),
        );

        info!("Entering price loop");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                tick = ticks.recv() => match tick {
                    Some(tick) => self.pipeline.on_price(tick.price, &self.shutdown).await,
                    None => break,
                }
            }
        }

        // The loop may have exited because the feed ended; make sure every
        // background task sees the shutdown either way.
        self.shutdown.cancel();
        drop(ticks);
        self.shutdown_sequence().await;
        let _ = refresh_task.await;
        info!("Shutdown complete");
        Ok(())
    }

    /// Refresh the bearer token on a fixed cadence (default 800 s against a
    /// 900 s TTL) and, when enabled, run a settlement pass after each
    /// successful refresh.
    fn spawn_token_refresh(&self) -> JoinHandle<()> {
        let tokens = self.tokens.clone();
        let settlement = self.settlement.clone();
        let continuous = self.config.continuous_settlement;
        let period = Duration::from_secs(self.config.token_refresh_interval_seconds);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            timer.tick().await; // the first tick fires immediately

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = timer.tick() => {}
                }

                match tokens.refresh().await {
                    Ok(token) => {
                        debug!("Token refreshed");
                        if continuous {
                            if let Err(e) = settlement.run(&token).await {
                                warn!(error = %e, "Continuous settlement failed");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed; retrying next interval");
                    }
                }
            }
        })
    }

    /// Unsubscribe happened when the price loop exited; wait out any
    /// in-flight handler, then best-effort cancel every tracked order and
    /// run a final bounded settlement pass.
    async fn shutdown_sequence(&self) {
        info!("Shutting down");
        tokio::time::sleep(SHUTDOWN_GRACE).await;

        // The shutdown token is already tripped; cleanup gets its own.
        let cleanup = CancellationToken::new();
        match self.tokens.current().await {
            Ok(token) => {
                match self.executor.cancel_all(&token, &cleanup).await {
                    Ok(report) => info!(
                        cancels_ok = report.cancels_ok,
                        cancels_failed = report.cancels_failed,
                        "Best-effort cancel-all finished"
                    ),
                    Err(_) => debug!("Cancel-all interrupted"),
                }

                match self
                    .settlement
                    .run_with_deadline(&token, SHUTDOWN_SETTLEMENT_DEADLINE)
                    .await
                {
                    Ok(submitted) => info!(submitted, "Final settlement pass finished"),
                    Err(e) => warn!(error = %e, "Final settlement failed"),
                }
            }
            Err(e) => {
                warn!(error = %e, "No token for shutdown cleanup; orders left to expire");
            }
        }
    }
}
