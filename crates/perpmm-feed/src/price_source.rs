//! Polling price source over a Redis key.
//!
//! The oracle writes a JSON object with a numeric `IndexPrice` field to a
//! fixed key; the source polls it and emits a tick only when the value
//! changes. Reads are strictly read-only against the backing store.
//! Transient read or parse failures suppress the tick and keep the stream
//! alive; cancellation completes it cleanly.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FeedResult;

/// One index price observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTick {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Extract the `IndexPrice` field from the raw key value.
///
/// Accepts the price as a JSON number or a numeric string. Returns `None`
/// on any shape mismatch; the caller treats that as a suppressed tick.
pub fn parse_index_price(raw: &str) -> Option<Decimal> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    match value.get("IndexPrice")? {
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Redis-backed index price source.
pub struct RedisPriceSource {
    client: redis::Client,
}

impl RedisPriceSource {
    pub fn new(connection_string: &str) -> FeedResult<Self> {
        Ok(Self {
            client: redis::Client::open(connection_string)?,
        })
    }

    /// Start polling `key` every `poll_interval` and return the tick stream.
    ///
    /// Emits only on value change. The background task exits when the
    /// cancellation token fires or the receiver is dropped.
    pub fn subscribe(
        &self,
        key: String,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<IndexTick> {
        let (tx, rx) = mpsc::channel(16);
        let client = self.client.clone();

        tokio::spawn(async move {
            info!(key = %key, interval_ms = poll_interval.as_millis() as u64, "Price source started");
            let mut last_price: Option<Decimal> = None;
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let raw = match Self::read_key(&client, &key).await {
                    Ok(Some(raw)) => raw,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Price read failed; will retry");
                        continue;
                    }
                };

                let Some(price) = parse_index_price(&raw) else {
                    debug!(key = %key, "Unparseable index payload; tick suppressed");
                    continue;
                };

                if last_price == Some(price) {
                    continue;
                }
                last_price = Some(price);

                let tick = IndexTick {
                    price,
                    timestamp: Utc::now(),
                };
                if tx.send(tick).await.is_err() {
                    break;
                }
            }

            info!(key = %key, "Price source stopped");
        });

        rx
    }

    async fn read_key(client: &redis::Client, key: &str) -> FeedResult<Option<String>> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        Ok(conn.get(key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_numeric_field() {
        let raw = r#"{"IndexPrice": 65000.25, "Source": "oracle"}"#;
        assert_eq!(parse_index_price(raw), Some(dec!(65000.25)));
    }

    #[test]
    fn test_parse_string_field() {
        let raw = r#"{"IndexPrice": "64990.00"}"#;
        assert_eq!(parse_index_price(raw), Some(dec!(64990.00)));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        assert_eq!(parse_index_price(r#"{"MarkPrice": 1}"#), None);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert_eq!(parse_index_price("not json"), None);
        assert_eq!(parse_index_price(r#"{"IndexPrice": true}"#), None);
    }
}
