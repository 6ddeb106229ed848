//! Worker configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Every key accepts both SNAKE_CASE and PascalCase env
//! spellings; the hosted deployments of the original service injected
//! Pascal-cased keys.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use perpmm_core::{to_base, LiquidityShape, MAX_DECIMALS};
use perpmm_executor::{ExecutorConfig, UpdateBehavior};

use crate::error::{AppError, AppResult};

/// Complete worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    // Account and auth.
    pub account_id: String,
    pub private_key_hex: String,
    pub ledger_id: String,
    pub key_type: String,

    // Endpoints.
    pub api_base_url: String,
    pub redis_connection_string: String,
    pub redis_index_key: String,
    pub redis_poll_interval_ms: u64,

    // Ladder shape.
    pub num_levels: u32,
    pub level_0_quantity: Decimal,
    pub levels_1_to_2_quantity: Decimal,
    pub levels_3_plus_quantity: Decimal,
    pub base_spread_usd: Decimal,
    pub level_spacing_usd: Decimal,
    /// Decimal fraction (e.g. 0.2 = 20%); converted to ppm at the boundary.
    pub initial_margin_factor: Decimal,
    pub trading_decimals: u32,
    pub settlement_decimals: u32,

    // Replacement behavior.
    pub update_behavior: String,
    pub atomic_replacement_delay_ms: u64,
    pub enable_self_trade_prevention: bool,
    pub sequential_peel_delay_ms: u64,

    // Token and settlement cadence.
    pub token_refresh_interval_seconds: u64,
    pub continuous_settlement: bool,

    // Telemetry.
    pub metrics_port: u16,
    pub log_level: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            private_key_hex: String::new(),
            ledger_id: "testnet".into(),
            key_type: "ed25519".into(),
            api_base_url: String::new(),
            redis_connection_string: "redis://127.0.0.1:6379".into(),
            redis_index_key: "oracle:index".into(),
            redis_poll_interval_ms: 500,
            num_levels: 5,
            level_0_quantity: Decimal::ONE,
            levels_1_to_2_quantity: Decimal::ONE,
            levels_3_plus_quantity: Decimal::ONE,
            base_spread_usd: Decimal::TEN,
            level_spacing_usd: Decimal::new(5, 0),
            initial_margin_factor: Decimal::new(2, 1),
            trading_decimals: 8,
            settlement_decimals: 6,
            update_behavior: "atomic".into(),
            atomic_replacement_delay_ms: 250,
            enable_self_trade_prevention: true,
            sequential_peel_delay_ms: 150,
            token_refresh_interval_seconds: 800,
            continuous_settlement: true,
            metrics_port: 9090,
            log_level: "debug".into(),
        }
    }
}

/// Look up an env var by its snake_case key, tolerating a PascalCase
/// spelling of the same key.
fn env_lookup(snake: &str) -> Option<String> {
    if let Ok(v) = std::env::var(snake.to_ascii_uppercase()) {
        return Some(v);
    }
    let pascal: String = snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    std::env::var(pascal).ok()
}

fn override_parsed<T: FromStr>(target: &mut T, key: &str, errors: &mut Vec<String>) {
    if let Some(raw) = env_lookup(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => errors.push(format!("invalid value for {key}: {raw:?}")),
        }
    }
}

fn override_flag(target: &mut bool, key: &str, errors: &mut Vec<String>) {
    if let Some(raw) = env_lookup(key) {
        match raw.trim() {
            "1" | "true" | "True" => *target = true,
            "0" | "false" | "False" => *target = false,
            other => errors.push(format!("invalid value for {key}: {other:?} (expected 0/1)")),
        }
    }
}

impl WorkerConfig {
    /// Load configuration: optional TOML file, then env overrides, then
    /// validation. Any failure here is fatal at startup.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let path = path
            .map(str::to_string)
            .or_else(|| env_lookup("perpmm_config"));

        let mut config = match path {
            Some(p) if Path::new(&p).exists() => Self::from_file(&p)?,
            Some(p) => {
                return Err(AppError::Config(format!("config file not found: {p}")));
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config {path}: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config {path}: {e}")))
    }

    /// Apply environment overrides for every key.
    pub fn apply_env_overrides(&mut self) -> AppResult<()> {
        let mut errors = Vec::new();

        override_parsed(&mut self.account_id, "account_id", &mut errors);
        override_parsed(&mut self.private_key_hex, "private_key_hex", &mut errors);
        override_parsed(&mut self.ledger_id, "ledger_id", &mut errors);
        override_parsed(&mut self.key_type, "key_type", &mut errors);
        override_parsed(&mut self.api_base_url, "api_base_url", &mut errors);
        override_parsed(
            &mut self.redis_connection_string,
            "redis_connection_string",
            &mut errors,
        );
        override_parsed(&mut self.redis_index_key, "redis_index_key", &mut errors);
        override_parsed(
            &mut self.redis_poll_interval_ms,
            "redis_poll_interval_ms",
            &mut errors,
        );
        override_parsed(&mut self.num_levels, "num_levels", &mut errors);
        override_parsed(&mut self.level_0_quantity, "level_0_quantity", &mut errors);
        override_parsed(
            &mut self.levels_1_to_2_quantity,
            "levels_1_to_2_quantity",
            &mut errors,
        );
        override_parsed(
            &mut self.levels_3_plus_quantity,
            "levels_3_plus_quantity",
            &mut errors,
        );
        override_parsed(&mut self.base_spread_usd, "base_spread_usd", &mut errors);
        override_parsed(&mut self.level_spacing_usd, "level_spacing_usd", &mut errors);
        override_parsed(
            &mut self.initial_margin_factor,
            "initial_margin_factor",
            &mut errors,
        );
        override_parsed(&mut self.trading_decimals, "trading_decimals", &mut errors);
        override_parsed(
            &mut self.settlement_decimals,
            "settlement_decimals",
            &mut errors,
        );
        override_parsed(&mut self.update_behavior, "update_behavior", &mut errors);
        override_parsed(
            &mut self.atomic_replacement_delay_ms,
            "atomic_replacement_delay_ms",
            &mut errors,
        );
        override_flag(
            &mut self.enable_self_trade_prevention,
            "enable_self_trade_prevention",
            &mut errors,
        );
        override_parsed(
            &mut self.sequential_peel_delay_ms,
            "sequential_peel_delay_ms",
            &mut errors,
        );
        override_parsed(
            &mut self.token_refresh_interval_seconds,
            "token_refresh_interval_seconds",
            &mut errors,
        );
        override_flag(
            &mut self.continuous_settlement,
            "continuous_settlement",
            &mut errors,
        );
        override_parsed(&mut self.metrics_port, "metrics_port", &mut errors);
        override_parsed(&mut self.log_level, "log_level", &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(errors.join("; ")))
        }
    }

    /// Validate values that would otherwise fail deep inside a cycle.
    pub fn validate(&self) -> AppResult<()> {
        let mut problems = Vec::new();

        if self.account_id.is_empty() {
            problems.push("account_id is required".to_string());
        }
        if self.private_key_hex.is_empty() {
            problems.push("private_key_hex is required".to_string());
        }
        if self.api_base_url.is_empty() {
            problems.push("api_base_url is required".to_string());
        }
        if self.num_levels == 0 {
            problems.push("num_levels must be at least 1".to_string());
        }
        if self.base_spread_usd <= Decimal::ZERO {
            problems.push("base_spread_usd must be positive".to_string());
        }
        if self.level_spacing_usd <= Decimal::ZERO {
            problems.push("level_spacing_usd must be positive".to_string());
        }
        for (name, qty) in [
            ("level_0_quantity", self.level_0_quantity),
            ("levels_1_to_2_quantity", self.levels_1_to_2_quantity),
            ("levels_3_plus_quantity", self.levels_3_plus_quantity),
        ] {
            if qty <= Decimal::ZERO {
                problems.push(format!("{name} must be positive"));
            }
        }
        if self.initial_margin_factor <= Decimal::ZERO || self.initial_margin_factor > Decimal::ONE
        {
            problems.push("initial_margin_factor must be in (0, 1]".to_string());
        }
        if self.trading_decimals > MAX_DECIMALS || self.settlement_decimals > MAX_DECIMALS {
            problems.push(format!("decimals must be at most {MAX_DECIMALS}"));
        }
        if UpdateBehavior::parse(&self.update_behavior).is_none() {
            problems.push(format!(
                "update_behavior must be \"sequential\" or \"atomic\", got {:?}",
                self.update_behavior
            ));
        }
        if self.redis_poll_interval_ms == 0 {
            problems.push("redis_poll_interval_ms must be positive".to_string());
        }
        if self.token_refresh_interval_seconds == 0 {
            problems.push("token_refresh_interval_seconds must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(problems.join("; ")))
        }
    }

    /// Margin factor in parts-per-million.
    pub fn margin_factor_ppm(&self) -> u64 {
        (self.initial_margin_factor * Decimal::from(1_000_000u64))
            .trunc()
            .to_u64()
            .unwrap_or(0)
    }

    /// Per-level quantities converted into trading base units.
    pub fn shape_base(&self) -> AppResult<LiquidityShape> {
        Ok(LiquidityShape {
            size_level_0: to_base(self.level_0_quantity, self.trading_decimals)?,
            size_level_1_2: to_base(self.levels_1_to_2_quantity, self.trading_decimals)?,
            size_level_3_plus: to_base(self.levels_3_plus_quantity, self.trading_decimals)?,
        })
    }

    /// Executor configuration slice.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            // Validated at startup; unreachable default keeps this infallible.
            behavior: UpdateBehavior::parse(&self.update_behavior)
                .unwrap_or(UpdateBehavior::Sequential),
            enable_stp: self.enable_self_trade_prevention,
            atomic_replacement_delay: Duration::from_millis(self.atomic_replacement_delay_ms),
            sequential_peel_delay: Duration::from_millis(self.sequential_peel_delay_ms),
            cancel_retry_delay: Duration::from_millis(50),
            margin_factor_ppm: self.margin_factor_ppm(),
        }
    }

    /// Log the effective configuration with secrets redacted, plus the
    /// per-level intended quantities.
    pub fn log_summary(&self) {
        info!(
            account_id = %self.account_id,
            ledger_id = %self.ledger_id,
            api_base_url = %self.api_base_url,
            redis_index_key = %self.redis_index_key,
            redis_poll_interval_ms = self.redis_poll_interval_ms,
            num_levels = self.num_levels,
            base_spread_usd = %self.base_spread_usd,
            level_spacing_usd = %self.level_spacing_usd,
            initial_margin_factor = %self.initial_margin_factor,
            trading_decimals = self.trading_decimals,
            settlement_decimals = self.settlement_decimals,
            update_behavior = %self.update_behavior,
            atomic_replacement_delay_ms = self.atomic_replacement_delay_ms,
            enable_self_trade_prevention = self.enable_self_trade_prevention,
            sequential_peel_delay_ms = self.sequential_peel_delay_ms,
            token_refresh_interval_seconds = self.token_refresh_interval_seconds,
            continuous_settlement = self.continuous_settlement,
            private_key_hex = "***",
            "Worker configuration"
        );

        for i in 0..self.num_levels {
            let quantity = match i {
                0 => self.level_0_quantity,
                1 | 2 => self.levels_1_to_2_quantity,
                _ => self.levels_3_plus_quantity,
            };
            info!(level = i, quantity = %quantity, "Intended level quantity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid_config() -> WorkerConfig {
        WorkerConfig {
            account_id: "0.0.12345".into(),
            private_key_hex: "302e0201".into(),
            api_base_url: "https://venue.example".into(),
            ..WorkerConfig::default()
        }
    }

    #[test]
    fn test_default_config_fails_validation_without_identity() {
        assert!(WorkerConfig::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_margin_factor_to_ppm() {
        let mut config = valid_config();
        config.initial_margin_factor = dec!(0.2);
        assert_eq!(config.margin_factor_ppm(), 200_000);

        config.initial_margin_factor = dec!(0.015);
        assert_eq!(config.margin_factor_ppm(), 15_000);
    }

    #[test]
    fn test_shape_base_conversion() {
        let mut config = valid_config();
        config.trading_decimals = 4;
        config.level_0_quantity = dec!(100);
        config.levels_1_to_2_quantity = dec!(50);
        config.levels_3_plus_quantity = dec!(50);

        let shape = config.shape_base().unwrap();
        assert_eq!(shape.size_level_0, 1_000_000);
        assert_eq!(shape.size_level_1_2, 500_000);
        assert_eq!(shape.quantities(2), vec![1_000_000, 500_000]);
    }

    #[test]
    fn test_validate_rejects_bad_behavior_and_margin() {
        let mut config = valid_config();
        config.update_behavior = "both".into();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.initial_margin_factor = dec!(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override_snake_and_pascal() {
        // Env mutation: keep keys unique to this test.
        std::env::set_var("NUM_LEVELS", "7");
        std::env::set_var("EnableSelfTradePrevention", "0");

        let mut config = valid_config();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.num_levels, 7);
        assert!(!config.enable_self_trade_prevention);

        std::env::remove_var("NUM_LEVELS");
        std::env::remove_var("EnableSelfTradePrevention");
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        std::env::set_var("ATOMIC_REPLACEMENT_DELAY_MS", "soon");
        let mut config = valid_config();
        assert!(config.apply_env_overrides().is_err());
        std::env::remove_var("ATOMIC_REPLACEMENT_DELAY_MS");
    }
}
