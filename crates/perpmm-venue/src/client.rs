//! REST client for the venue's order, account, and settlement endpoints.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use perpmm_core::{ContractSide, OrderId, Position, PositionSide, SettlementPlan};

use crate::api::{
    AccountApi, AccountSnapshot, CancelAck, MarketInfo, OpenOrder, OrderApi, SettlementReceipt,
    SubmitAck, SubmitRequest,
};
use crate::dto;
use crate::error::{VenueError, VenueResult};

/// Per-request timeout; the venue's slow path is settlement, well under this.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the perps venue REST API.
pub struct PerpsRestClient {
    client: Client,
    base_url: String,
    account_id: String,
}

impl PerpsRestClient {
    /// Create a new client.
    pub fn new(base_url: impl Into<String>, account_id: impl Into<String>) -> VenueResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| VenueError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
        })
    }

    /// Fetch market metadata for startup validation.
    pub async fn get_market_info(&self) -> VenueResult<MarketInfo> {
        let url = format!("{}/api/v1/markets/info", self.base_url);
        let response = self.client.get(&url).send().await?;
        let body: dto::MarketInfoResponse = Self::parse(response).await?;

        info!(
            symbol = %body.symbol,
            trading_decimals = body.trading_decimals,
            settlement_decimals = body.settlement_decimals,
            "Fetched market info"
        );

        Ok(MarketInfo {
            symbol: body.symbol,
            trading_decimals: body.trading_decimals,
            settlement_decimals: body.settlement_decimals,
        })
    }

    /// Check the status and deserialize the body, classifying failures.
    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> VenueResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VenueError::classify_http(status.as_u16(), &body));
        }
        if status == StatusCode::NO_CONTENT {
            return Err(VenueError::Transport("unexpected empty response".into()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| VenueError::Transport(format!("failed to parse response: {e}")))
    }

    /// Run a request future, abandoning the wait on cancellation.
    async fn with_cancel<T>(
        cancel: &CancellationToken,
        fut: impl std::future::Future<Output = VenueResult<T>>,
    ) -> VenueResult<T> {
        tokio::select! {
            _ = cancel.cancelled() => Err(VenueError::Cancelled),
            result = fut => result,
        }
    }
}

#[async_trait]
impl OrderApi for PerpsRestClient {
    async fn submit_limit(
        &self,
        request: SubmitRequest,
        token: &str,
        cancel: &CancellationToken,
    ) -> VenueResult<SubmitAck> {
        let url = format!("{}/api/v1/orders", self.base_url);
        let body = dto::SubmitOrderRequest {
            contract_side: request.side.wire_str(),
            price: request.price_base,
            quantity: request.quantity_base,
            initial_margin_factor_ppm: request.margin_factor_ppm,
            client_order_id: &request.client_order_id,
        };

        let fut = async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(token)
                .header("Idempotency-Key", Uuid::new_v4().to_string())
                .json(&body)
                .send()
                .await?;
            let ack: dto::SubmitOrderResponse = Self::parse(response).await?;

            debug!(
                order_id = %ack.order_id,
                client_order_id = %request.client_order_id,
                status = %ack.status,
                "Order submitted"
            );

            Ok(SubmitAck {
                order_id: OrderId::new(ack.order_id),
                status: ack.status,
                filled_quantity: ack.filled_quantity,
            })
        };

        Self::with_cancel(cancel, fut).await
    }

    async fn cancel(
        &self,
        order_id: &OrderId,
        token: &str,
        cancel: &CancellationToken,
    ) -> VenueResult<CancelAck> {
        let url = format!("{}/api/v1/orders/{}", self.base_url, order_id);

        let fut = async {
            let response = self
                .client
                .delete(&url)
                .bearer_auth(token)
                .header("Idempotency-Key", Uuid::new_v4().to_string())
                .send()
                .await?;
            let ack: dto::CancelOrderResponse = Self::parse(response).await?;

            debug!(order_id = %ack.order_id, "Order cancelled");

            Ok(CancelAck {
                order_id: OrderId::new(ack.order_id),
                unfilled_quantity: ack.unfilled_quantity,
            })
        };

        Self::with_cancel(cancel, fut).await
    }
}

#[async_trait]
impl AccountApi for PerpsRestClient {
    async fn get_account(&self, token: &str) -> VenueResult<AccountSnapshot> {
        let url = format!(
            "{}/api/v1/account?accountId={}&ownerType=Hapi",
            self.base_url, self.account_id
        );

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let body: dto::AccountResponse = Self::parse(response).await?;

        let orders = body
            .orders
            .into_iter()
            .filter_map(|o| {
                let side = ContractSide::from_wire(&o.contract_side)?;
                Some(OpenOrder {
                    order_id: OrderId::new(o.order_id),
                    side,
                    price: o.price,
                    quantity: o.quantity,
                })
            })
            .collect();

        let positions = body
            .positions
            .into_iter()
            .filter_map(|p| {
                let side = PositionSide::from_wire(&p.contract_side)?;
                Some(Position {
                    id: p.position_id,
                    side,
                    quantity: p.quantity,
                    entry_price: p.entry_price,
                })
            })
            .collect();

        Ok(AccountSnapshot {
            balance: body.balance,
            orders,
            positions,
        })
    }

    async fn settle(
        &self,
        plan: &SettlementPlan,
        token: &str,
        idempotency_key: &str,
    ) -> VenueResult<SettlementReceipt> {
        let url = format!("{}/api/v1/position/settle", self.base_url);
        let body = dto::SettleRequest {
            settlement_quantities: plan
                .entries
                .iter()
                .map(|e| dto::SettlementQuantityDto {
                    position_id: e.position_id.clone(),
                    quantity: e.quantity,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Idempotency-Key", idempotency_key)
            .json(&body)
            .send()
            .await?;
        let receipt: dto::SettleResponse = Self::parse(response).await?;

        info!(settlement_id = %receipt.settlement_id, "Settlement submitted");

        Ok(SettlementReceipt {
            settlement_id: receipt.settlement_id,
        })
    }
}
