//! Wire DTOs for the venue's REST API.
//!
//! Field names follow the venue verbatim, including the `postion_id`
//! misspelling its account endpoint actually returns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct SubmitOrderRequest<'a> {
    pub contract_side: &'a str,
    pub price: u64,
    pub quantity: u64,
    pub initial_margin_factor_ppm: u64,
    pub client_order_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SubmitOrderResponse {
    pub order_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub filled_quantity: u64,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderResponse {
    pub order_id: String,
    #[serde(default)]
    pub unfilled_quantity: u64,
}

#[derive(Debug, Deserialize)]
pub struct AccountResponse {
    #[serde(default)]
    pub balance: u64,
    #[serde(default)]
    pub orders: Vec<OpenOrderDto>,
    #[serde(default)]
    pub positions: Vec<PositionDto>,
}

#[derive(Debug, Deserialize)]
pub struct OpenOrderDto {
    pub order_id: String,
    pub contract_side: String,
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub quantity: u64,
}

#[derive(Debug, Deserialize)]
pub struct PositionDto {
    // The venue misspells this field; do not "fix" it.
    #[serde(rename = "postion_id")]
    pub position_id: String,
    pub contract_side: String,
    #[serde(default)]
    pub quantity: u64,
    #[serde(default)]
    pub entry_price: u64,
}

#[derive(Debug, Serialize)]
pub struct SettleRequest {
    pub settlement_quantities: Vec<SettlementQuantityDto>,
}

#[derive(Debug, Serialize)]
pub struct SettlementQuantityDto {
    pub position_id: String,
    pub quantity: u64,
}

#[derive(Debug, Deserialize)]
pub struct SettleResponse {
    pub settlement_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MarketInfoResponse {
    pub symbol: String,
    pub trading_decimals: u32,
    pub settlement_decimals: u32,
}

#[derive(Debug, Serialize)]
pub struct ChallengeRequest<'a> {
    pub account_id: &'a str,
    pub ledger_id: &'a str,
    pub method: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChallengeResponse {
    pub challenge_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyRequest<'a> {
    pub challenge_id: &'a str,
    pub account_id: &'a str,
    pub message_signed_plain_text: &'a str,
    pub signature_map_base64: String,
    pub sig_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct VerifyResponse {
    pub access_token: String,
    #[serde(default = "default_token_ttl")]
    pub expires_in_seconds: u64,
}

fn default_token_ttl() -> u64 {
    900
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_dto_accepts_venue_typo() {
        let json = r#"{
            "postion_id": "pos-1",
            "contract_side": "long",
            "quantity": 150,
            "entry_price": 6500000000000
        }"#;
        let dto: PositionDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.position_id, "pos-1");
        assert_eq!(dto.contract_side, "long");
        assert_eq!(dto.quantity, 150);
    }

    #[test]
    fn test_settle_request_shape() {
        let req = SettleRequest {
            settlement_quantities: vec![SettlementQuantityDto {
                position_id: "pos-1".into(),
                quantity: 170,
            }],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"settlement_quantities":[{"position_id":"pos-1","quantity":170}]}"#
        );
    }

    #[test]
    fn test_verify_response_default_ttl() {
        let json = r#"{"access_token": "tok"}"#;
        let resp: VerifyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.expires_in_seconds, 900);
    }
}
