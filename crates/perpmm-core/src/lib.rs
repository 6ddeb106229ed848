//! Core domain types for the market-making worker.
//!
//! This crate provides the fundamental types shared by every subsystem:
//! - `ContractSide`, `OrderId`, `ClientOrderId`: order identity
//! - base-unit fixed-point conversions and ladder level generation
//! - `LadderLevel`, `LadderReplacement`, `LiquidityShape`: ladder data model
//! - `Position`, `SettlementPlan`: settlement data model

pub mod error;
pub mod order;
pub mod settle;
pub mod types;
pub mod units;

pub use error::{CoreError, Result};
pub use order::{ClientOrderIdFactory, ContractSide, OrderId};
pub use settle::{Position, PositionSide, SettlementEntry, SettlementPlan};
pub use types::{LadderLevel, LadderReplacement, LiquidityShape};
pub use units::{ask_levels_usd, bid_levels_usd, from_base, margin, to_base, MAX_DECIMALS};
