//! Venue capability traits.
//!
//! The worker core reasons about the venue only through these traits;
//! tests substitute recording mocks for them.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use perpmm_core::{ContractSide, OrderId, Position, SettlementPlan};

use crate::error::VenueResult;

/// Parameters of one limit order submission attempt.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub side: ContractSide,
    /// Price in trading base units.
    pub price_base: u64,
    /// Quantity in trading base units.
    pub quantity_base: u64,
    /// Initial margin factor in parts-per-million.
    pub margin_factor_ppm: u64,
    /// Unique per attempt: `MM-<Side>-L<index>-<tag>`.
    pub client_order_id: String,
}

/// Acknowledgement of a submitted order.
#[derive(Debug, Clone)]
pub struct SubmitAck {
    pub order_id: OrderId,
    pub status: String,
    pub filled_quantity: u64,
}

/// Acknowledgement of a cancelled order.
#[derive(Debug, Clone)]
pub struct CancelAck {
    pub order_id: OrderId,
    pub unfilled_quantity: u64,
}

/// One of the account's open orders.
#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub order_id: OrderId,
    pub side: ContractSide,
    pub price: u64,
    pub quantity: u64,
}

/// Account state as reported by the venue.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    /// Balance in settlement base units.
    pub balance: u64,
    pub orders: Vec<OpenOrder>,
    pub positions: Vec<Position>,
}

/// Receipt for a submitted settlement.
#[derive(Debug, Clone)]
pub struct SettlementReceipt {
    pub settlement_id: String,
}

/// Venue market metadata, validated against configuration at startup.
#[derive(Debug, Clone)]
pub struct MarketInfo {
    pub symbol: String,
    pub trading_decimals: u32,
    pub settlement_decimals: u32,
}

/// A fresh bearer credential.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub access_token: String,
    pub expires_in_seconds: u64,
}

/// Order placement and cancellation.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Submit a limit order. Carries a fresh idempotency key per call.
    async fn submit_limit(
        &self,
        request: SubmitRequest,
        token: &str,
        cancel: &CancellationToken,
    ) -> VenueResult<SubmitAck>;

    /// Cancel a resting order by venue ID.
    async fn cancel(
        &self,
        order_id: &OrderId,
        token: &str,
        cancel: &CancellationToken,
    ) -> VenueResult<CancelAck>;
}

/// Account state reads and position settlement.
#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn get_account(&self, token: &str) -> VenueResult<AccountSnapshot>;

    /// Submit a settlement plan under the given idempotency key.
    async fn settle(
        &self,
        plan: &SettlementPlan,
        token: &str,
        idempotency_key: &str,
    ) -> VenueResult<SettlementReceipt>;
}

/// Credential acquisition.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn authenticate(&self) -> VenueResult<AuthToken>;
}
